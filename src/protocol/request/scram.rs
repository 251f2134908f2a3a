//! DescribeUserScramCredentials and AlterUserScramCredentials requests.

use nom::IResult;
use nombytes::NomBytes;

use crate::admin::{AlterationKind, UserScramCredentialAlteration};
use crate::encode::RequestBuffer;
use crate::error::Result;
use crate::protocol::response::{
    AlterUserScramCredentialsResponseData, DescribeUserScramCredentialsResponseData,
    parse_alter_user_scram_credentials_response, parse_describe_user_scram_credentials_response,
};
use crate::protocol::{ApiKey, ProtocolRequest};

#[derive(Debug, Clone)]
pub struct DescribeUserScramCredentialsRequest {
    /// Users to describe; empty describes every user.
    pub users: Vec<String>,
}

impl ProtocolRequest for DescribeUserScramCredentialsRequest {
    type Response = DescribeUserScramCredentialsResponseData;

    const API_KEY: ApiKey = ApiKey::DescribeUserScramCredentials;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        let users = (!self.users.is_empty()).then_some(self.users.as_slice());
        buf.write_compact_nullable_array(users, |buf, user| {
            buf.write_compact_string(user)?;
            buf.write_empty_tagged_fields();
            Ok(())
        })?;
        buf.write_empty_tagged_fields();
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_describe_user_scram_credentials_response(s, version)
    }
}

#[derive(Debug, Clone)]
pub struct AlterUserScramCredentialsRequest {
    pub alterations: Vec<UserScramCredentialAlteration>,
}

impl ProtocolRequest for AlterUserScramCredentialsRequest {
    type Response = AlterUserScramCredentialsResponseData;

    const API_KEY: ApiKey = ApiKey::AlterUserScramCredentials;

    fn encode_body(&self, buf: &mut RequestBuffer, _version: i16) -> Result<()> {
        let (upsertions, deletions): (Vec<_>, Vec<_>) = self
            .alterations
            .iter()
            .partition(|a| a.is_upsertion());

        buf.write_compact_array(&deletions, |buf, alteration| {
            buf.write_compact_string(alteration.user())?;
            buf.write_i8(alteration.mechanism() as i8);
            buf.write_empty_tagged_fields();
            Ok(())
        })?;
        buf.write_compact_array(&upsertions, |buf, alteration| {
            buf.write_compact_string(alteration.user())?;
            if let AlterationKind::Upsert {
                info,
                salt,
                salted_password,
            } = alteration.kind()
            {
                buf.write_i8(info.mechanism as i8);
                buf.write_i32(info.iterations);
                buf.write_compact_bytes(salt)?;
                buf.write_compact_bytes(salted_password)?;
            }
            buf.write_empty_tagged_fields();
            Ok(())
        })?;
        buf.write_empty_tagged_fields();
        Ok(())
    }

    fn parse_response(s: NomBytes, version: i16) -> IResult<NomBytes, Self::Response> {
        parse_alter_user_scram_credentials_response(s, version)
    }
}

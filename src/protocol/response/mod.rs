//! Response parsers for the admin APIs.
//!
//! Parsers read exactly the broker-declared element counts and keep broker
//! order; correlating results back to submitted items happens in the client.

mod acls;
mod configs;
mod groups;
mod offsets;
mod scram;
mod topics;
mod versions;

pub use acls::*;
pub use configs::*;
pub use groups::*;
pub use offsets::*;
pub use scram::*;
pub use topics::*;
pub use versions::*;

use nom::{IResult, number::complete::be_i16};
use nombytes::NomBytes;

use crate::admin::ItemError;
use crate::error::KafkaCode;

/// i16 error code; unknown values map to [`KafkaCode::Unknown`].
pub(crate) fn parse_error_code(s: NomBytes) -> IResult<NomBytes, KafkaCode> {
    let (s, code) = be_i16(s)?;
    Ok((s, KafkaCode::from_wire(code)))
}

/// Item error for a wire code, `None` when the code reports success.
pub(crate) fn error_of(code: KafkaCode, message: Option<String>) -> Option<ItemError> {
    code.is_error().then(|| ItemError::new(code, message))
}

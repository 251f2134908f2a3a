//! SCRAM credential administration types.
//!
//! Upsertions are built from a clear-text password: the salted password is
//! derived here with PBKDF2 (the `Hi()` function of RFC 5802) so the
//! password itself never leaves the client.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Sha256, Sha512};

use super::result::ItemError;
use crate::constants::SCRAM_DEFAULT_SALT_LEN;
use crate::error::{Error, Result};

/// SCRAM hash mechanism, with its wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum ScramMechanism {
    #[default]
    Unknown = 0,
    Sha256 = 1,
    Sha512 = 2,
}

impl ScramMechanism {
    /// Decode a wire value; anything unrecognized is `Unknown`.
    pub fn from_wire(value: i8) -> Self {
        match value {
            1 => ScramMechanism::Sha256,
            2 => ScramMechanism::Sha512,
            _ => ScramMechanism::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScramMechanism::Unknown => "UNKNOWN",
            ScramMechanism::Sha256 => "SCRAM-SHA-256",
            ScramMechanism::Sha512 => "SCRAM-SHA-512",
        }
    }

    /// Length of the derived key, i.e. the hash output size.
    fn key_len(&self) -> Option<usize> {
        match self {
            ScramMechanism::Unknown => None,
            ScramMechanism::Sha256 => Some(32),
            ScramMechanism::Sha512 => Some(64),
        }
    }
}

impl fmt::Display for ScramMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScramMechanism {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "SCRAM-SHA-256" => Ok(ScramMechanism::Sha256),
            "SCRAM-SHA-512" => Ok(ScramMechanism::Sha512),
            other => Err(Error::InvalidArgument(format!(
                "unknown SCRAM mechanism: {}",
                other
            ))),
        }
    }
}

/// One mechanism/iteration pair registered for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScramCredentialInfo {
    pub mechanism: ScramMechanism,
    pub iterations: i32,
}

/// Describe result for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScramCredentialsDescription {
    pub user: String,
    pub error: Option<ItemError>,
    pub credential_infos: Vec<ScramCredentialInfo>,
}

/// What an alteration does to the user's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterationKind {
    Upsert {
        info: ScramCredentialInfo,
        salt: Bytes,
        salted_password: Bytes,
    },
    Delete {
        mechanism: ScramMechanism,
    },
}

/// A single credential change for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScramCredentialAlteration {
    user: String,
    kind: AlterationKind,
}

impl UserScramCredentialAlteration {
    /// Create or replace the credential for `mechanism`.
    ///
    /// A random salt is generated when `salt` is `None` or empty.
    pub fn upsertion(
        user: impl Into<String>,
        mechanism: ScramMechanism,
        iterations: i32,
        password: &[u8],
        salt: Option<&[u8]>,
    ) -> Result<Self> {
        let user = validate_user(user.into())?;
        let key_len = mechanism.key_len().ok_or_else(|| {
            Error::InvalidArgument("SCRAM mechanism must be SHA-256 or SHA-512".to_string())
        })?;
        if iterations <= 0 {
            return Err(Error::InvalidArgument(format!(
                "SCRAM iterations must be positive, got {}",
                iterations
            )));
        }
        if password.is_empty() {
            return Err(Error::InvalidArgument(
                "SCRAM password must not be empty".to_string(),
            ));
        }

        let salt = match salt {
            Some(s) if !s.is_empty() => Bytes::copy_from_slice(s),
            _ => random_salt(),
        };
        let salted_password = salted_password(mechanism, key_len, password, &salt, iterations);

        Ok(Self {
            user,
            kind: AlterationKind::Upsert {
                info: ScramCredentialInfo {
                    mechanism,
                    iterations,
                },
                salt,
                salted_password,
            },
        })
    }

    /// Create or replace a credential from an already salted password.
    pub fn upsertion_salted(
        user: impl Into<String>,
        info: ScramCredentialInfo,
        salt: Bytes,
        salted_password: Bytes,
    ) -> Result<Self> {
        let user = validate_user(user.into())?;
        if info.mechanism.key_len().is_none() {
            return Err(Error::InvalidArgument(
                "SCRAM mechanism must be SHA-256 or SHA-512".to_string(),
            ));
        }
        if info.iterations <= 0 {
            return Err(Error::InvalidArgument(format!(
                "SCRAM iterations must be positive, got {}",
                info.iterations
            )));
        }
        if salt.is_empty() {
            return Err(Error::InvalidArgument("SCRAM salt must not be empty".to_string()));
        }
        if salted_password.is_empty() {
            return Err(Error::InvalidArgument(
                "SCRAM salted password must not be empty".to_string(),
            ));
        }
        Ok(Self {
            user,
            kind: AlterationKind::Upsert {
                info,
                salt,
                salted_password,
            },
        })
    }

    /// Remove the credential for `mechanism`.
    pub fn deletion(user: impl Into<String>, mechanism: ScramMechanism) -> Result<Self> {
        let user = validate_user(user.into())?;
        if mechanism == ScramMechanism::Unknown {
            return Err(Error::InvalidArgument(
                "SCRAM mechanism must be SHA-256 or SHA-512".to_string(),
            ));
        }
        Ok(Self {
            user,
            kind: AlterationKind::Delete { mechanism },
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn kind(&self) -> &AlterationKind {
        &self.kind
    }

    pub fn mechanism(&self) -> ScramMechanism {
        match &self.kind {
            AlterationKind::Upsert { info, .. } => info.mechanism,
            AlterationKind::Delete { mechanism } => *mechanism,
        }
    }

    pub fn is_upsertion(&self) -> bool {
        matches!(self.kind, AlterationKind::Upsert { .. })
    }
}

/// Alter result for one submitted alteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScramCredentialAlterationResult {
    pub user: String,
    pub error: Option<ItemError>,
}

fn validate_user(user: String) -> Result<String> {
    if user.is_empty() {
        return Err(Error::InvalidArgument(
            "SCRAM user name must not be empty".to_string(),
        ));
    }
    Ok(user)
}

fn random_salt() -> Bytes {
    let mut salt = vec![0u8; SCRAM_DEFAULT_SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    Bytes::from(salt)
}

fn salted_password(
    mechanism: ScramMechanism,
    key_len: usize,
    password: &[u8],
    salt: &[u8],
    iterations: i32,
) -> Bytes {
    let mut out = vec![0u8; key_len];
    let rounds = iterations as u32;
    match mechanism {
        ScramMechanism::Sha512 => pbkdf2_hmac::<Sha512>(password, salt, rounds, &mut out),
        _ => pbkdf2_hmac::<Sha256>(password, salt, rounds, &mut out),
    }
    Bytes::from(out)
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

pub const DID_SCHEME: &str = "did";
pub const DID_METHOD: &str = "icon";

/// Byte length of the hex-encoded id-plus-checksum segment.
pub const DID_ID_LENGTH: usize = 24;

fn strip_hex_prefix(segment: &str) -> &str {
    segment.strip_prefix("0x").unwrap_or(segment)
}

/// Validated `did:icon:<network-id>:<id-and-checksum>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    raw: String,
}

impl Did {
    pub fn parse(raw: &str) -> AuthResult<Self> {
        let tokens: Vec<&str> = raw.split(':').collect();
        if tokens.len() != 4 {
            return Err(AuthError::InvalidDid(format!("{}: expected 4 segments", raw)));
        }
        if tokens[0] != DID_SCHEME || tokens[1] != DID_METHOD {
            return Err(AuthError::InvalidDid(format!("{}: unsupported method", raw)));
        }
        let network = strip_hex_prefix(tokens[2]);
        if network.is_empty() || hex::decode(network).is_err() {
            return Err(AuthError::InvalidDid(format!("{}: network id is not hex", raw)));
        }
        match hex::decode(strip_hex_prefix(tokens[3])) {
            Ok(id) if id.len() == DID_ID_LENGTH => Ok(Self { raw: raw.to_string() }),
            _ => Err(AuthError::InvalidDid(format!(
                "{}: id must be {} hex-encoded bytes",
                raw, DID_ID_LENGTH
            ))),
        }
    }

    pub fn network_id(&self) -> &str {
        self.raw.split(':').nth(2).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for Did {
    type Error = AuthError;

    fn try_from(value: String) -> AuthResult<Self> {
        Did::parse(&value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.raw
    }
}

/// A DID optionally qualified by a verification key id: `did` or `did#kid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DidRef {
    pub did: Did,
    pub kid: Option<String>,
}

impl DidRef {
    pub fn parse(raw: &str) -> AuthResult<Self> {
        match raw.split_once('#') {
            None => Ok(Self {
                did: Did::parse(raw)?,
                kid: None,
            }),
            Some((did, kid)) => {
                if kid.is_empty() || kid.contains('#') {
                    return Err(AuthError::InvalidDid(format!("{}: malformed key id", raw)));
                }
                Ok(Self {
                    did: Did::parse(did)?,
                    kid: Some(kid.to_string()),
                })
            }
        }
    }
}

impl fmt::Display for DidRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kid {
            Some(kid) => write!(f, "{}#{}", self.did, kid),
            None => write!(f, "{}", self.did),
        }
    }
}

/// Returns the input unchanged when it is a well-formed bare DID.
pub fn validate_did(raw: &str) -> AuthResult<String> {
    Did::parse(raw).map(String::from)
}

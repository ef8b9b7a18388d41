use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid DID: {0}")]
    InvalidDid(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unknown signer key: {did}#{kid}")]
    UnknownKey { did: String, kid: String },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Failed to verify signature")]
    SignatureRejected,

    #[error("Failed to validate payload: {0}")]
    PayloadMismatch(String),

    #[error("Signing failure: {0}")]
    Signing(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

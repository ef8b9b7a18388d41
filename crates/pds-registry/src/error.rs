use pds_auth::AuthError;
use pds_store::StoreError;
use thiserror::Error;

/// Coarse classification of a rejected invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Temporal,
    Economic,
    NotFound,
    Storage,
    External,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0} is empty")]
    EmptyId(&'static str),

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Threshold {given} does not match system threshold {required}")]
    ThresholdMismatch { given: u64, required: u64 },

    #[error("Policy id {given} does not match derived id {derived}")]
    PolicyIdMismatch { given: String, derived: String },

    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Insufficient stake: needs at least {required}, got {provided}")]
    InsufficientStake { required: u128, provided: u128 },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Pin service failure: {0}")]
    Pin(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::EmptyId(_)
            | RegistryError::AlreadyExists { .. }
            | RegistryError::InvalidArgument(_)
            | RegistryError::ThresholdMismatch { .. }
            | RegistryError::PolicyIdMismatch { .. }
            | RegistryError::Config(_) => ErrorKind::Validation,
            RegistryError::Auth(_) | RegistryError::PermissionDenied(_) => ErrorKind::Authorization,
            RegistryError::Expired(_) | RegistryError::InvalidExpiry(_) => ErrorKind::Temporal,
            RegistryError::InsufficientStake { .. } => ErrorKind::Economic,
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::Storage(_) => ErrorKind::Storage,
            RegistryError::Pin(_) => ErrorKind::External,
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        RegistryError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(RegistryError::EmptyId("label_id").kind(), ErrorKind::Validation);
        assert_eq!(
            RegistryError::Auth(AuthError::SignatureRejected).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            RegistryError::InsufficientStake { required: 2, provided: 1 }.kind(),
            ErrorKind::Economic
        );
        assert_eq!(RegistryError::not_found("label", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            RegistryError::not_found("label", "x").to_string(),
            "label not found: x"
        );
    }
}

pub mod checker;
pub mod crypto;
pub mod did;
pub mod envelope;
pub mod error;
pub mod oracle;
pub mod payload;

pub use checker::{SignatureChecker, VerifiedCaller};
pub use crypto::{compress_public_key, derive_policy_id, keccak256, sha256};
pub use did::{validate_did, Did, DidRef};
pub use envelope::{Envelope, EnvelopeHeader, SignerRef, ALGORITHM_ES256K};
pub use error::{AuthError, AuthResult};
pub use oracle::{IdentityOracle, MemoryIdentityOracle};
pub use payload::{Method, ParamName, ParamValue, Payload, PayloadBuilder};

pub use k256::ecdsa::SigningKey;

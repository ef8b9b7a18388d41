use log::{debug, warn};

use crate::envelope::Envelope;
use crate::error::{AuthError, AuthResult};
use crate::oracle::IdentityOracle;
use crate::payload::Payload;

/// A caller whose envelope signature checked out against the identity oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCaller {
    /// DID of the signer
    pub did: String,
    /// Key id within the DID document
    pub kid: String,
    /// Payload as signed
    pub payload: Payload,
}

impl VerifiedCaller {
    /// Check the signed payload against the payload the call expects.
    pub fn validate(&self, expected: &Payload, current_height: u64) -> AuthResult<()> {
        expected.validate(&self.payload, current_height).map_err(|e| {
            warn!("Payload rejected for {}: {}", self.did, e);
            e
        })
    }
}

/// Verifies envelopes using keys resolved through an [`IdentityOracle`].
pub struct SignatureChecker<'a, O: IdentityOracle + ?Sized> {
    oracle: &'a O,
}

impl<'a, O: IdentityOracle + ?Sized> SignatureChecker<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Decode the token, resolve the signer's key and verify the signature.
    pub fn verify(&self, token: &str) -> AuthResult<VerifiedCaller> {
        let envelope = Envelope::parse(token)?;
        let signer = envelope.signer()?;

        let public_key = self
            .oracle
            .resolve_public_key(&signer.did, &signer.kid)
            .ok_or_else(|| AuthError::UnknownKey {
                did: signer.did.clone(),
                kid: signer.kid.clone(),
            })?;

        if let Err(e) = envelope.verify(&public_key) {
            warn!("Signature rejected for {}#{}", signer.did, signer.kid);
            return Err(e);
        }
        let payload = envelope.payload()?;
        debug!("Verified {} envelope from {}#{}", payload.method, signer.did, signer.kid);

        Ok(VerifiedCaller {
            did: signer.did,
            kid: signer.kid,
            payload,
        })
    }

    /// [`verify`](Self::verify) followed by payload validation.
    pub fn authorize(&self, token: &str, expected: &Payload, current_height: u64) -> AuthResult<VerifiedCaller> {
        let caller = self.verify(token)?;
        caller.validate(expected, current_height)?;
        Ok(caller)
    }
}

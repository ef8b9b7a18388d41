// ES256K ENVELOPE
// Compact `header.payload.signature` token, each segment base64url encoded.
//
// INVARIANTS:
// 1. The header carries exactly `alg` and `kid`, and alg is ES256K
// 2. The signing input is the encoded header and payload as received
// 3. Verification hashes the signing input with SHA-256

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{sha256, sign_prehash, verify_prehash};
use crate::error::{AuthError, AuthResult};
use crate::payload::Payload;

pub const ALGORITHM_ES256K: &str = "ES256K";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeHeader {
    pub alg: String,
    /// `<did>#<key-id>`
    pub kid: String,
}

/// Key reference named in an envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerRef {
    pub did: String,
    pub kid: String,
}

impl SignerRef {
    pub fn parse(kid: &str) -> AuthResult<Self> {
        let mut tokens = kid.split('#');
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(did), Some(key), None) if !did.is_empty() && !key.is_empty() => Ok(Self {
                did: did.to_string(),
                kid: key.to_string(),
            }),
            _ => Err(AuthError::MalformedEnvelope(format!("invalid kid: {}", kid))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    header: String,
    payload: String,
    signature: String,
}

fn decode_segment(segment: &str, what: &str) -> AuthResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedEnvelope(format!("{}: {}", what, e)))
}

impl Envelope {
    pub fn parse(token: &str) -> AuthResult<Self> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::MalformedEnvelope(format!(
                "expected 3 segments, got {}",
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(AuthError::MalformedEnvelope("empty segment".to_string()));
        }
        Ok(Self {
            header: parts[0].to_string(),
            payload: parts[1].to_string(),
            signature: parts[2].to_string(),
        })
    }

    /// Build and sign a token for `payload` under the key `kid` (`did#key-id`).
    pub fn sign(kid: &str, payload: &Payload, key: &SigningKey) -> AuthResult<String> {
        let header = EnvelopeHeader {
            alg: ALGORITHM_ES256K.to_string(),
            kid: kid.to_string(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| AuthError::Signing(e.to_string()))?;
        let header = URL_SAFE_NO_PAD.encode(header_json);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_json()?);

        let digest = sha256(format!("{}.{}", header, payload).as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(sign_prehash(key, &digest)?);
        Ok(format!("{}.{}.{}", header, payload, signature))
    }

    pub fn header(&self) -> AuthResult<EnvelopeHeader> {
        let bytes = decode_segment(&self.header, "header")?;
        let header: EnvelopeHeader = serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::MalformedEnvelope(format!("header: {}", e)))?;
        if header.alg != ALGORITHM_ES256K {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        Ok(header)
    }

    pub fn signer(&self) -> AuthResult<SignerRef> {
        SignerRef::parse(&self.header()?.kid)
    }

    pub fn payload(&self) -> AuthResult<Payload> {
        Payload::from_json(&decode_segment(&self.payload, "payload")?)
    }

    pub fn signature(&self) -> AuthResult<Vec<u8>> {
        decode_segment(&self.signature, "signature")
    }

    pub fn digest(&self) -> [u8; 32] {
        sha256(format!("{}.{}", self.header, self.payload).as_bytes())
    }

    pub fn verify(&self, public_key: &[u8]) -> AuthResult<()> {
        verify_prehash(public_key, &self.digest(), &self.signature()?)
    }
}

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::{AuthError, AuthResult};

/// Length of a compact `r || s` signature; a trailing recovery byte is tolerated.
pub const SIGNATURE_LENGTH: usize = 64;

/// Bytes of the Keccak digest kept for a derived policy id.
pub const POLICY_ID_BYTES: usize = 16;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Re-encode any SEC1 secp256k1 public key in its 33-byte compressed form.
pub fn compress_public_key(sec1: &[u8]) -> AuthResult<Vec<u8>> {
    let key = PublicKey::from_sec1_bytes(sec1)
        .map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;
    Ok(key.to_encoded_point(true).as_bytes().to_vec())
}

/// Verify an ES256K signature over an already-hashed message.
pub fn verify_prehash(public_key: &[u8], digest: &[u8; 32], signature: &[u8]) -> AuthResult<()> {
    let key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;

    if signature.len() < SIGNATURE_LENGTH {
        return Err(AuthError::SignatureRejected);
    }
    let sig = Signature::from_slice(&signature[..SIGNATURE_LENGTH])
        .map_err(|_| AuthError::SignatureRejected)?;
    let sig = sig.normalize_s().unwrap_or(sig);

    key.verify_prehash(digest, &sig)
        .map_err(|_| AuthError::SignatureRejected)
}

/// Produce a 65-byte `r || s || v` signature over an already-hashed message.
pub fn sign_prehash(key: &SigningKey, digest: &[u8; 32]) -> AuthResult<Vec<u8>> {
    let (sig, recovery) = key
        .sign_prehash_recoverable(digest)
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    let mut out = sig.to_bytes().to_vec();
    out.push(recovery.to_byte());
    Ok(out)
}

/// Hex of the first 16 bytes of `keccak256(label_id || compressed consumer key)`.
pub fn derive_policy_id(label_id: &str, consumer_public_key: &[u8]) -> AuthResult<String> {
    let compressed = compress_public_key(consumer_public_key)?;
    let mut seed = Vec::with_capacity(label_id.len() + compressed.len());
    seed.extend_from_slice(label_id.as_bytes());
    seed.extend_from_slice(&compressed);
    let digest = keccak256(&seed);
    Ok(hex::encode(&digest[..POLICY_ID_BYTES]))
}

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

/// Resolves a DID verification key to SEC1-encoded public key bytes.
pub trait IdentityOracle {
    fn resolve_public_key(&self, did: &str, kid: &str) -> Option<Vec<u8>>;
}

impl<T: IdentityOracle + ?Sized> IdentityOracle for Arc<T> {
    fn resolve_public_key(&self, did: &str, kid: &str) -> Option<Vec<u8>> {
        (**self).resolve_public_key(did, kid)
    }
}

impl<T: IdentityOracle + ?Sized> IdentityOracle for &T {
    fn resolve_public_key(&self, did: &str, kid: &str) -> Option<Vec<u8>> {
        (**self).resolve_public_key(did, kid)
    }
}

/// In-process key directory, shareable behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryIdentityOracle {
    keys: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryIdentityOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, did: &str, kid: &str, public_key: Vec<u8>) {
        info!("Registered key {}#{}", did, kid);
        self.keys
            .write()
            .insert((did.to_string(), kid.to_string()), public_key);
    }

    pub fn revoke(&self, did: &str, kid: &str) -> bool {
        self.keys
            .write()
            .remove(&(did.to_string(), kid.to_string()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl IdentityOracle for MemoryIdentityOracle {
    fn resolve_public_key(&self, did: &str, kid: &str) -> Option<Vec<u8>> {
        self.keys
            .read()
            .get(&(did.to_string(), kid.to_string()))
            .cloned()
    }
}

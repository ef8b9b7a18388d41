#![allow(dead_code)]

use std::sync::Arc;

use pds_auth::{Envelope, MemoryIdentityOracle, Method, Payload, SigningKey};
use pds_registry::{
    Address, InvocationContext, MemoryEventLog, MemoryPinService, NewLabel, NewPolicy, Registry,
    RegistryConfig,
};
use pds_store::MemoryStore;

pub const OWNER: &str = "hx00000000000000000000000000000000000000aa";
pub const START_TIME: u64 = 1_700_000_000;
pub const DAY: u64 = 86_400;

/// A DID holder with one registered signing key.
pub struct Actor {
    pub did: String,
    pub kid: String,
    key: SigningKey,
}

impl Actor {
    pub fn key_ref(&self) -> String {
        format!("{}#{}", self.did, self.kid)
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn sign(&self, payload: &Payload) -> String {
        Envelope::sign(&self.key_ref(), payload, &self.key).unwrap()
    }

    pub fn sign_add_label(&self, label_id: &str) -> String {
        self.sign(&Payload::builder(Method::AddLabel).label_id(label_id).build())
    }

    pub fn sign_update_label(&self, label_id: &str, base_height: u64) -> String {
        self.sign(
            &Payload::builder(Method::UpdateLabel)
                .label_id(label_id)
                .base_height(base_height)
                .build(),
        )
    }

    pub fn sign_remove_label(&self, label_id: &str, base_height: u64) -> String {
        self.sign(
            &Payload::builder(Method::RemoveLabel)
                .label_id(label_id)
                .base_height(base_height)
                .build(),
        )
    }

    pub fn sign_add_data(&self, label_id: &str, data_id: &str) -> String {
        self.sign(
            &Payload::builder(Method::AddData)
                .label_id(label_id)
                .data_id(data_id)
                .build(),
        )
    }

    pub fn sign_add_policy(&self, label_id: &str, policy_id: &str) -> String {
        self.sign(
            &Payload::builder(Method::AddPolicy)
                .label_id(label_id)
                .policy_id(policy_id)
                .build(),
        )
    }

    pub fn sign_update_policy(&self, policy_id: &str, base_height: u64) -> String {
        self.sign(
            &Payload::builder(Method::UpdatePolicy)
                .policy_id(policy_id)
                .base_height(base_height)
                .build(),
        )
    }
}

pub struct Harness {
    pub registry: Registry<MemoryStore>,
    pub oracle: Arc<MemoryIdentityOracle>,
    pub pins: Arc<MemoryPinService>,
    pub events: Arc<MemoryEventLog>,
    pub height: u64,
    pub now: u64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let oracle = Arc::new(MemoryIdentityOracle::new());
        let pins = Arc::new(MemoryPinService::new());
        let events = Arc::new(MemoryEventLog::new());
        let registry = Registry::new(
            MemoryStore::new(),
            config.with_owner(Address::new(OWNER)),
            oracle.clone(),
            pins.clone(),
            events.clone(),
        )
        .unwrap();
        Self {
            registry,
            oracle,
            pins,
            events,
            height: 1,
            now: START_TIME,
        }
    }

    /// Register a fresh actor whose DID and key are derived from `seed`.
    pub fn actor(&self, seed: u8) -> Actor {
        let key = SigningKey::from_slice(&[seed; 32]).unwrap();
        let actor = Actor {
            did: format!("did:icon:03:{}", format!("{:02x}", seed).repeat(24)),
            kid: "key1".to_string(),
            key,
        };
        self.oracle.register(&actor.did, &actor.kid, actor.public_key());
        actor
    }

    /// Context for the next block, sent by the system owner.
    pub fn ctx(&mut self) -> InvocationContext {
        self.ctx_from(OWNER)
    }

    pub fn ctx_from(&mut self, caller: &str) -> InvocationContext {
        self.height += 1;
        InvocationContext::new(self.height, self.now, Address::new(caller))
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.now += seconds;
    }

    pub fn label_request(&self, label_id: &str) -> NewLabel {
        NewLabel {
            label_id: label_id.to_string(),
            name: format!("{} name", label_id),
            public_key: "04abcdef".to_string(),
            expire_at: self.now + 30 * DAY,
            ..Default::default()
        }
    }

    pub fn add_label(&mut self, owner: &Actor, label_id: &str) {
        let req = self.label_request(label_id);
        let ctx = self.ctx();
        self.registry
            .add_label(&ctx, &req, &owner.sign_add_label(label_id))
            .unwrap();
    }

    pub fn policy_request(&self, label_id: &str, policy_id: &str, consumer: &Actor) -> NewPolicy {
        NewPolicy {
            policy_id: policy_id.to_string(),
            label_id: label_id.to_string(),
            name: format!("{} grant", policy_id),
            consumer: consumer.did.clone(),
            threshold: 1,
            expire_at: 0,
        }
    }

    pub fn add_policy(&mut self, owner: &Actor, label_id: &str, policy_id: &str, consumer: &Actor) {
        let req = self.policy_request(label_id, policy_id, consumer);
        let ctx = self.ctx();
        self.registry
            .add_policy(&ctx, &req, &owner.sign_add_policy(label_id, policy_id))
            .unwrap();
    }

    pub fn last_updated(&self, label_id: &str) -> u64 {
        self.registry
            .get_label(label_id)
            .unwrap()
            .unwrap()
            .last_updated
    }
}

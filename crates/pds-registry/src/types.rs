use std::fmt;

use serde::{Deserialize, Serialize};

/// Account address of a transaction sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ambient values for one registry invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    /// Current block height
    pub height: u64,
    /// Current block timestamp
    pub timestamp: u64,
    /// Transaction sender
    pub caller: Address,
    /// Value attached to a payable call
    pub value: u128,
}

impl InvocationContext {
    pub fn new(height: u64, timestamp: u64, caller: Address) -> Self {
        Self {
            height,
            timestamp,
            caller,
            value: 0,
        }
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub label_id: String,
    /// DID of the signer that created the label
    pub owner: String,
    pub name: String,
    pub public_key: String,
    pub expire_at: u64,
    pub category: Option<String>,
    /// DID allowed to attach data
    pub producer: String,
    pub producer_expire_at: u64,
    pub created: u64,
    pub last_updated: u64,
    /// Block height of revocation, 0 while live
    pub revoked: u64,
}

impl LabelInfo {
    pub fn is_live(&self) -> bool {
        self.revoked == 0
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expire_at <= now
    }

    pub fn check_owner(&self, did: &str) -> bool {
        self.owner == did
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub data_id: String,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
    pub policy_id: String,
    pub label_id: String,
    pub name: String,
    /// `did` or `did#kid`
    pub consumer: String,
    pub threshold: u64,
    pub expire_at: u64,
    pub created: u64,
    pub last_updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub peer_id: String,
    pub name: String,
    pub endpoint: String,
    pub owner: Address,
    pub created: u64,
    pub stake: u128,
    pub reward: u128,
}

impl NodeInfo {
    pub fn check_owner(&self, caller: &Address) -> bool {
        &self.owner == caller
    }
}

/// Result of `check_policy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheck {
    pub policy_id: String,
    pub label_id: String,
    pub consumer: String,
    pub checked: bool,
    pub expire_at: u64,
    pub label_expire_at: u64,
}

/// Arguments of `add_label`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLabel {
    pub label_id: String,
    pub name: String,
    pub public_key: String,
    pub expire_at: u64,
    pub category: Option<String>,
    /// Defaults to the signer
    pub producer: Option<String>,
    /// 0 means "same as expire_at"
    pub producer_expire_at: u64,
    /// Initial content attached with the label
    pub data: Option<String>,
    pub size: u64,
}

/// Arguments of `update_label`. `None` and 0 leave a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub producer: Option<String>,
    pub producer_expire_at: u64,
    pub expire_at: u64,
}

/// Arguments of `add_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewData {
    pub label_id: String,
    pub data_id: String,
    pub name: String,
    pub size: u64,
}

/// Arguments of `add_policy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPolicy {
    pub policy_id: String,
    pub label_id: String,
    pub name: String,
    pub consumer: String,
    pub threshold: u64,
    /// 0 means "same as the label's expire_at"
    pub expire_at: u64,
}

/// Arguments of `add_node`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub peer_id: String,
    pub name: String,
    pub endpoint: String,
    /// Defaults to the caller
    pub owner: Option<Address>,
}

/// Arguments of `update_node`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdate {
    /// Defaults to the caller
    pub owner: Option<Address>,
    pub name: Option<String>,
    pub endpoint: Option<String>,
}

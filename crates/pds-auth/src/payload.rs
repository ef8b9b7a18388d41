// SIGNED PAYLOAD SCHEMA
// The structure a caller signs to authorize exactly one registry mutation.
//
// INVARIANTS:
// 1. Only the four known parameter names can appear in a payload
// 2. validate() fails closed on any structural difference
// 3. base_height must satisfy expected <= actual < current_height

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Registry mutation a payload authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    AddLabel,
    UpdateLabel,
    RemoveLabel,
    AddData,
    AddPolicy,
    UpdatePolicy,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::AddLabel => "add_label",
            Method::UpdateLabel => "update_label",
            Method::RemoveLabel => "remove_label",
            Method::AddData => "add_data",
            Method::AddPolicy => "add_policy",
            Method::UpdatePolicy => "update_policy",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "add_label" => Some(Method::AddLabel),
            "update_label" => Some(Method::UpdateLabel),
            "remove_label" => Some(Method::RemoveLabel),
            "add_data" => Some(Method::AddData),
            "add_policy" => Some(Method::AddPolicy),
            "update_policy" => Some(Method::UpdatePolicy),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    LabelId,
    DataId,
    PolicyId,
    BaseHeight,
}

impl ParamName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::LabelId => "label_id",
            ParamName::DataId => "data_id",
            ParamName::PolicyId => "policy_id",
            ParamName::BaseHeight => "base_height",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Payload {
    pub method: Method,
    #[serde(default)]
    pub params: BTreeMap<ParamName, ParamValue>,
}

impl Payload {
    pub fn builder(method: Method) -> PayloadBuilder {
        PayloadBuilder::new(method)
    }

    pub fn to_json(&self) -> AuthResult<String> {
        serde_json::to_string(self).map_err(|e| AuthError::MalformedEnvelope(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> AuthResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| AuthError::MalformedEnvelope(format!("payload: {}", e)))
    }

    /// Check a caller-supplied payload against the one this call expects.
    pub fn validate(&self, actual: &Payload, current_height: u64) -> AuthResult<()> {
        if self.method != actual.method {
            return Err(AuthError::PayloadMismatch(format!(
                "method {} does not match {}",
                actual.method, self.method
            )));
        }
        if self.params.len() != actual.params.len() {
            return Err(AuthError::PayloadMismatch(format!(
                "expected {} params, got {}",
                self.params.len(),
                actual.params.len()
            )));
        }

        for (name, expected) in &self.params {
            let got = actual.params.get(name).ok_or_else(|| {
                AuthError::PayloadMismatch(format!("missing param {}", name.as_str()))
            })?;

            match (expected, got) {
                (ParamValue::Text(e), ParamValue::Text(a)) if e == a => {}
                (ParamValue::Number(e), ParamValue::Number(a)) if *name == ParamName::BaseHeight => {
                    if a < e || *a >= current_height {
                        return Err(AuthError::PayloadMismatch(format!(
                            "base_height {} outside [{}, {})",
                            a, e, current_height
                        )));
                    }
                }
                _ => {
                    return Err(AuthError::PayloadMismatch(format!(
                        "param {} does not match",
                        name.as_str()
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Builds the payload a registry call expects.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    method: Method,
    label_id: Option<String>,
    data_id: Option<String>,
    policy_id: Option<String>,
    base_height: u64,
}

impl PayloadBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            label_id: None,
            data_id: None,
            policy_id: None,
            base_height: 0,
        }
    }

    pub fn label_id(mut self, label_id: impl Into<String>) -> Self {
        self.label_id = Some(label_id.into());
        self
    }

    pub fn data_id(mut self, data_id: impl Into<String>) -> Self {
        self.data_id = Some(data_id.into());
        self
    }

    pub fn policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    /// Omitted from the payload when zero.
    pub fn base_height(mut self, height: u64) -> Self {
        self.base_height = height;
        self
    }

    pub fn build(self) -> Payload {
        let mut params = BTreeMap::new();
        if let Some(v) = self.label_id {
            params.insert(ParamName::LabelId, ParamValue::Text(v));
        }
        if let Some(v) = self.data_id {
            params.insert(ParamName::DataId, ParamValue::Text(v));
        }
        if let Some(v) = self.policy_id {
            params.insert(ParamName::PolicyId, ParamValue::Text(v));
        }
        if self.base_height > 0 {
            params.insert(ParamName::BaseHeight, ParamValue::Number(self.base_height));
        }
        Payload {
            method: self.method,
            params,
        }
    }
}

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::types::Address;

/// Smallest stake denomination per whole token.
pub const DEFAULT_STAKE_UNIT: u64 = 1_000_000_000_000_000_000;

/// Genesis settings for a registry instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Account allowed to run configuration calls and register nodes
    pub system_owner: Address,
    /// Initial minimum stake in whole tokens
    pub min_stake_for_serve: u64,
    /// Base units per whole token
    pub stake_unit: u64,
    /// Initial threshold every policy must carry
    pub system_threshold: u64,
    /// Page size used for non-positive limits
    pub default_page_limit: u64,
    /// Require policy ids derived from the label and consumer key
    pub strict_policy_id: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            system_owner: Address::new("hx0000000000000000000000000000000000000000"),
            min_stake_for_serve: 0,
            stake_unit: DEFAULT_STAKE_UNIT,
            system_threshold: 1,
            default_page_limit: pds_store::DEFAULT_PAGE_LIMIT,
            strict_policy_id: false,
        }
    }
}

impl RegistryConfig {
    /// Load from an optional TOML file, then apply `PDS_*` environment
    /// overrides (e.g. `PDS_SYSTEM_OWNER=hx...`).
    pub fn load(path: Option<&str>) -> RegistryResult<Self> {
        let builder = config::Config::builder();
        let builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("pds").required(false)),
        };
        let builder = builder.add_source(
            config::Environment::with_prefix("PDS")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let cfg: RegistryConfig = builder
            .build()
            .map_err(|e| RegistryError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RegistryError::Config(e.to_string()))?;
        cfg.validate()?;
        info!(
            "Loaded registry config (owner={}, threshold={}, strict_policy_id={})",
            cfg.system_owner, cfg.system_threshold, cfg.strict_policy_id
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.system_owner.as_str().is_empty() {
            return Err(RegistryError::Config("system_owner is empty".into()));
        }
        if self.stake_unit == 0 {
            return Err(RegistryError::Config("stake_unit must be positive".into()));
        }
        if self.system_threshold == 0 {
            return Err(RegistryError::Config("system_threshold must be positive".into()));
        }
        if self.default_page_limit == 0 {
            return Err(RegistryError::Config("default_page_limit must be positive".into()));
        }
        Ok(())
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.system_owner = owner;
        self
    }
}

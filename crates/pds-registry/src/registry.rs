// PDS REGISTRY
// Owns the label, policy and node stores and runs every mutation as one
// all-or-nothing invocation.
//
// SAFETY INVARIANTS:
// 1. Every mutation runs inside a StoreTransaction
// 2. A rejected invocation leaves store, pins and events untouched
// 3. Pin requests are applied before the store commits; events are emitted after
// 4. label_count and policy_count equal the number of live entities
// 5. Only the system owner changes configuration values

use std::sync::Arc;

use log::{info, warn};

use pds_auth::{IdentityOracle, Payload, SignatureChecker, VerifiedCaller};
use pds_store::{
    paginate_with_default, DictDb, EnumerableMap, EnumerableSet, KeyValueStore, Namespace,
    PageWindow, StoreTransaction, VarDb,
};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::events::{EventSink, RegistryEvent};
use crate::pin::{PinRequest, PinService};
use crate::types::{InvocationContext, LabelInfo, NodeInfo, PolicyInfo};

/// Storage layout of the registry.
pub(crate) struct Schema {
    pub(crate) labels: DictDb<str, LabelInfo>,
    pub(crate) policies: DictDb<str, PolicyInfo>,
    pub(crate) nodes: EnumerableMap<String, NodeInfo>,
    label_data: Namespace,
    label_policies: Namespace,
    pub(crate) label_count: VarDb<u64>,
    pub(crate) policy_count: VarDb<u64>,
    pub(crate) min_stake: VarDb<u64>,
    pub(crate) system_threshold: VarDb<u64>,
}

impl Schema {
    fn new() -> Self {
        Self {
            labels: DictDb::new(Namespace::new("labels")),
            policies: DictDb::new(Namespace::new("policies")),
            nodes: EnumerableMap::new(Namespace::new("nodes")),
            label_data: Namespace::new("label_data"),
            label_policies: Namespace::new("label_policies"),
            label_count: VarDb::new(Namespace::new("label_count")),
            policy_count: VarDb::new(Namespace::new("policy_count")),
            min_stake: VarDb::new(Namespace::new("min_stake")),
            system_threshold: VarDb::new(Namespace::new("system_threshold")),
        }
    }

    /// Data attached to one label, keyed by data id.
    pub(crate) fn data_of(&self, label_id: &str) -> EnumerableMap<String, crate::types::DataInfo> {
        EnumerableMap::new(self.label_data.child(label_id))
    }

    /// Policy ids granted against one label.
    pub(crate) fn policies_of(&self, label_id: &str) -> EnumerableSet<String> {
        EnumerableSet::new(self.label_policies.child(label_id))
    }

    pub(crate) fn live_label<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        label_id: &str,
    ) -> RegistryResult<LabelInfo> {
        match self.labels.get(store, label_id)? {
            Some(label) if label.is_live() => Ok(label),
            _ => Err(RegistryError::not_found("label", label_id)),
        }
    }
}

pub type SharedOracle = Arc<dyn IdentityOracle + Send + Sync>;
pub type SharedPinService = Arc<dyn PinService + Send + Sync>;
pub type SharedEventSink = Arc<dyn EventSink + Send + Sync>;

/// Label, policy and node registry over a key-value store.
pub struct Registry<S: KeyValueStore> {
    store: S,
    pub(crate) schema: Schema,
    pub(crate) config: RegistryConfig,
    oracle: SharedOracle,
    pins: SharedPinService,
    events: SharedEventSink,
}

/// Global live-entity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    Labels,
    Policies,
}

/// State of a single in-flight mutation.
pub(crate) struct Invocation<'r, S: KeyValueStore> {
    pub(crate) schema: &'r Schema,
    pub(crate) config: &'r RegistryConfig,
    pub(crate) oracle: &'r (dyn IdentityOracle + Send + Sync),
    pub(crate) store: StoreTransaction<'r, S>,
    pub(crate) ctx: InvocationContext,
    events: Vec<RegistryEvent>,
    pins: Vec<PinRequest>,
}

impl<'r, S: KeyValueStore> Invocation<'r, S> {
    /// Verify the envelope and match its payload against `expected`.
    pub(crate) fn authorize(&self, token: &str, expected: Payload) -> RegistryResult<VerifiedCaller> {
        Ok(SignatureChecker::new(self.oracle).authorize(token, &expected, self.ctx.height)?)
    }

    pub(crate) fn live_label(&self, label_id: &str) -> RegistryResult<LabelInfo> {
        self.schema.live_label(&self.store, label_id)
    }

    pub(crate) fn require_system_owner(&self) -> RegistryResult<()> {
        if self.ctx.caller != self.config.system_owner {
            return Err(RegistryError::PermissionDenied(format!(
                "{} is not the system owner",
                self.ctx.caller
            )));
        }
        Ok(())
    }

    pub(crate) fn adjust_counter(&mut self, counter: Counter, delta: i64) -> RegistryResult<()> {
        let schema = self.schema;
        let counter = match counter {
            Counter::Labels => &schema.label_count,
            Counter::Policies => &schema.policy_count,
        };
        let current = counter.get_or(&self.store, 0)?;
        let next = if delta >= 0 {
            current.saturating_add(delta as u64)
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };
        counter.set(&mut self.store, &next)?;
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: RegistryEvent) {
        self.events.push(event);
    }

    pub(crate) fn request_pin(&mut self, request: PinRequest) {
        self.pins.push(request);
    }
}

impl<S: KeyValueStore> Registry<S> {
    /// Build a registry, seeding genesis configuration into an empty store.
    pub fn new(
        mut store: S,
        config: RegistryConfig,
        oracle: SharedOracle,
        pins: SharedPinService,
        events: SharedEventSink,
    ) -> RegistryResult<Self> {
        config.validate()?;
        let schema = Schema::new();

        if schema.min_stake.get(&store)?.is_none() {
            schema.min_stake.set(&mut store, &config.min_stake_for_serve)?;
        }
        if schema.system_threshold.get(&store)?.is_none() {
            schema.system_threshold.set(&mut store, &config.system_threshold)?;
        }
        info!("Registry initialized (system owner {})", config.system_owner);

        Ok(Self {
            store,
            schema,
            config,
            oracle,
            pins,
            events,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Identity oracle used to resolve signer keys.
    pub fn oracle(&self) -> &SharedOracle {
        &self.oracle
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run `op` atomically: on error nothing it staged is kept.
    pub(crate) fn execute<T>(
        &mut self,
        ctx: &InvocationContext,
        op: &'static str,
        f: impl FnOnce(&mut Invocation<'_, S>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let mut invocation = Invocation {
            schema: &self.schema,
            config: &self.config,
            oracle: self.oracle.as_ref(),
            store: StoreTransaction::begin(&mut self.store),
            ctx: ctx.clone(),
            events: Vec::new(),
            pins: Vec::new(),
        };

        let value = match f(&mut invocation) {
            Ok(value) => value,
            Err(e) => {
                warn!("{} rejected: {}", op, e);
                return Err(e);
            }
        };

        let Invocation {
            store, events, pins, ..
        } = invocation;
        for request in &pins {
            if let Err(e) = request.apply(self.pins.as_ref()) {
                warn!("{} rolled back, pin service failed: {}", op, e);
                return Err(RegistryError::Pin(e.to_string()));
            }
        }
        store.commit()?;

        for event in &events {
            self.events.emit(event);
        }
        info!("{} committed at height {}", op, ctx.height);
        Ok(value)
    }

    pub(crate) fn window(&self, offset: i64, limit: i64, total: u64) -> PageWindow {
        paginate_with_default(offset, limit, total, self.config.default_page_limit)
    }

    pub fn set_min_stake_value(&mut self, ctx: &InvocationContext, min_stake_for_serve: u64) -> RegistryResult<()> {
        self.execute(ctx, "set_min_stake_value", |inv| {
            inv.require_system_owner()?;
            inv.schema.min_stake.set(&mut inv.store, &min_stake_for_serve)?;
            Ok(())
        })
    }

    /// Minimum stake in whole tokens.
    pub fn get_min_stake_value(&self) -> RegistryResult<u64> {
        Ok(self.schema.min_stake.get_or(&self.store, self.config.min_stake_for_serve)?)
    }

    pub fn set_system_threshold(&mut self, ctx: &InvocationContext, threshold: u64) -> RegistryResult<()> {
        self.execute(ctx, "set_system_threshold", |inv| {
            inv.require_system_owner()?;
            if threshold == 0 {
                return Err(RegistryError::InvalidArgument("threshold must be positive".into()));
            }
            inv.schema.system_threshold.set(&mut inv.store, &threshold)?;
            Ok(())
        })
    }

    pub fn get_system_threshold(&self) -> RegistryResult<u64> {
        Ok(self
            .schema
            .system_threshold
            .get_or(&self.store, self.config.system_threshold)?)
    }

    pub fn get_label_count(&self) -> RegistryResult<u64> {
        Ok(self.schema.label_count.get_or(&self.store, 0)?)
    }

    pub fn get_policy_count(&self) -> RegistryResult<u64> {
        Ok(self.schema.policy_count.get_or(&self.store, 0)?)
    }
}

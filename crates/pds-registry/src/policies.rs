// POLICY LIFECYCLE
// Consumer access grants bounded by their label's expiry. A policy only
// disappears through its label's revocation.

use log::info;

use pds_auth::{derive_policy_id, AuthError, DidRef, Method, Payload};
use pds_store::{KeyValueStore, Page};

use crate::error::{RegistryError, RegistryResult};
use crate::events::RegistryEvent;
use crate::registry::{Counter, Invocation, Registry};
use crate::types::{InvocationContext, NewPolicy, PolicyCheck, PolicyInfo};

impl<'r, S: KeyValueStore> Invocation<'r, S> {
    fn add_policy(&mut self, req: &NewPolicy, owner_sign: &str) -> RegistryResult<()> {
        if req.policy_id.is_empty() {
            return Err(RegistryError::EmptyId("policy_id"));
        }
        if self.schema.policies.contains(&self.store, req.policy_id.as_str())? {
            return Err(RegistryError::AlreadyExists {
                kind: "policy",
                id: req.policy_id.clone(),
            });
        }
        let label = self.live_label(&req.label_id)?;

        let caller = self.authorize(
            owner_sign,
            Payload::builder(Method::AddPolicy)
                .label_id(&req.label_id)
                .policy_id(&req.policy_id)
                .build(),
        )?;
        if !label.check_owner(&caller.did) {
            return Err(RegistryError::PermissionDenied(format!(
                "{} does not own label {}",
                caller.did, req.label_id
            )));
        }

        let now = self.ctx.timestamp;
        if label.is_expired(now) {
            return Err(RegistryError::Expired(format!("label {} has expired", req.label_id)));
        }

        let required = self
            .schema
            .system_threshold
            .get_or(&self.store, self.config.system_threshold)?;
        if req.threshold != required {
            return Err(RegistryError::ThresholdMismatch {
                given: req.threshold,
                required,
            });
        }

        let expire_at = if req.expire_at == 0 {
            label.expire_at
        } else {
            req.expire_at
        };
        if expire_at <= now {
            return Err(RegistryError::InvalidExpiry(
                "expire_at must be greater than block timestamp".into(),
            ));
        }
        if expire_at > label.expire_at {
            return Err(RegistryError::InvalidExpiry(
                "expire_at must be less than or equal to the label's expire_at".into(),
            ));
        }

        let consumer = DidRef::parse(&req.consumer)
            .map_err(|e| RegistryError::InvalidArgument(e.to_string()))?;
        if self.config.strict_policy_id {
            self.check_derived_id(&req.policy_id, &req.label_id, &consumer)?;
        }

        let policy = PolicyInfo {
            policy_id: req.policy_id.clone(),
            label_id: req.label_id.clone(),
            name: req.name.clone(),
            consumer: req.consumer.clone(),
            threshold: req.threshold,
            expire_at,
            created: self.ctx.height,
            last_updated: self.ctx.height,
        };
        self.schema
            .policies
            .set(&mut self.store, policy.policy_id.as_str(), &policy)?;
        self.schema
            .policies_of(&req.label_id)
            .add(&mut self.store, &policy.policy_id)?;
        self.emit(RegistryEvent::PolicyAdded {
            policy_id: policy.policy_id.clone(),
            label_id: policy.label_id.clone(),
            consumer: policy.consumer.clone(),
        });
        self.adjust_counter(Counter::Policies, 1)?;

        info!("Policy {} granted on {} to {}", policy.policy_id, policy.label_id, policy.consumer);
        Ok(())
    }

    fn check_derived_id(&self, policy_id: &str, label_id: &str, consumer: &DidRef) -> RegistryResult<()> {
        let kid = consumer.kid.as_deref().ok_or_else(|| {
            RegistryError::InvalidArgument(format!("consumer {} has no key id", consumer))
        })?;
        let did = consumer.did.as_str();
        let public_key = self
            .oracle
            .resolve_public_key(did, kid)
            .ok_or_else(|| AuthError::UnknownKey {
                did: did.to_string(),
                kid: kid.to_string(),
            })?;

        let derived = derive_policy_id(label_id, &public_key)?;
        if derived != policy_id {
            return Err(RegistryError::PolicyIdMismatch {
                given: policy_id.to_string(),
                derived,
            });
        }
        Ok(())
    }

    fn update_policy(&mut self, policy_id: &str, expire_at: u64, owner_sign: &str) -> RegistryResult<()> {
        let mut policy = self
            .schema
            .policies
            .get(&self.store, policy_id)?
            .ok_or_else(|| RegistryError::not_found("policy", policy_id))?;
        let label = self.live_label(&policy.label_id)?;

        let caller = self.authorize(
            owner_sign,
            Payload::builder(Method::UpdatePolicy)
                .policy_id(policy_id)
                .base_height(policy.last_updated)
                .build(),
        )?;
        if !label.check_owner(&caller.did) {
            return Err(RegistryError::PermissionDenied(format!(
                "{} does not own label {}",
                caller.did, label.label_id
            )));
        }

        // 0 expires the policy immediately.
        if expire_at > label.expire_at {
            return Err(RegistryError::InvalidExpiry(
                "expire_at must be less than or equal to the label's expire_at".into(),
            ));
        }

        policy.expire_at = expire_at;
        policy.last_updated = self.ctx.height;
        self.schema.policies.set(&mut self.store, policy_id, &policy)?;
        self.emit(RegistryEvent::PolicyUpdated {
            policy_id: policy_id.to_string(),
        });
        Ok(())
    }
}

impl<S: KeyValueStore> Registry<S> {
    /// Grant `req.consumer` access to a label owned by the signer.
    pub fn add_policy(&mut self, ctx: &InvocationContext, req: &NewPolicy, owner_sign: &str) -> RegistryResult<()> {
        self.execute(ctx, "add_policy", |inv| inv.add_policy(req, owner_sign))
    }

    /// Change a policy's expiry.
    pub fn update_policy(
        &mut self,
        ctx: &InvocationContext,
        policy_id: &str,
        expire_at: u64,
        owner_sign: &str,
    ) -> RegistryResult<()> {
        self.execute(ctx, "update_policy", |inv| inv.update_policy(policy_id, expire_at, owner_sign))
    }

    pub fn get_policy(&self, policy_id: &str) -> RegistryResult<Option<PolicyInfo>> {
        Ok(self.schema.policies.get(self.store(), policy_id)?)
    }

    /// Page of policies granted on a live label.
    pub fn get_policy_list(&self, label_id: &str, offset: i64, limit: i64) -> RegistryResult<Page<PolicyInfo>> {
        self.schema.live_label(self.store(), label_id)?;
        let ids = self.schema.policies_of(label_id);
        let window = self.window(offset, limit, ids.length(self.store())?);

        let mut items = Vec::with_capacity(window.size as usize);
        for policy_id in ids.range(self.store(), window.offset, window.size)? {
            let policy = self
                .schema
                .policies
                .get(self.store(), policy_id.as_str())?
                .ok_or_else(|| RegistryError::not_found("policy", &policy_id))?;
            items.push(policy);
        }
        Ok(Page::from_window(window, items))
    }

    /// Whether a policy grants access at timestamp `now`; `None` for unknown ids.
    pub fn check_policy(&self, policy_id: &str, now: u64) -> RegistryResult<Option<PolicyCheck>> {
        let policy = match self.get_policy(policy_id)? {
            Some(policy) => policy,
            None => return Ok(None),
        };
        let label = self.schema.live_label(self.store(), &policy.label_id)?;

        Ok(Some(PolicyCheck {
            checked: now < policy.expire_at && now < label.expire_at,
            policy_id: policy.policy_id,
            label_id: policy.label_id,
            consumer: policy.consumer,
            expire_at: policy.expire_at,
            label_expire_at: label.expire_at,
        }))
    }
}

// LABEL LIFECYCLE
// absent -> live (add_label) -> live (update_label, add_data) -> revoked (remove_label)
//
// INVARIANTS:
// 1. label ids are never reused, including after revocation
// 2. producer_expire_at <= expire_at at all times
// 3. lowering expire_at clamps producer_expire_at and every attached policy
// 4. revocation drops all data and policies of the label

use log::info;

use pds_auth::{validate_did, Method, Payload};
use pds_store::{KeyValueStore, Page};

use crate::error::{RegistryError, RegistryResult};
use crate::events::RegistryEvent;
use crate::pin::{PinRequest, GROUP_REVOKED};
use crate::registry::{Counter, Invocation, Registry};
use crate::types::{DataInfo, InvocationContext, LabelInfo, LabelUpdate, NewData, NewLabel};

fn producer_did(raw: &str) -> RegistryResult<String> {
    validate_did(raw).map_err(|e| RegistryError::InvalidArgument(e.to_string()))
}

impl<'r, S: KeyValueStore> Invocation<'r, S> {
    fn add_label(&mut self, req: &NewLabel, owner_sign: &str) -> RegistryResult<()> {
        if req.label_id.is_empty() {
            return Err(RegistryError::EmptyId("label_id"));
        }
        if self.schema.labels.contains(&self.store, req.label_id.as_str())? {
            return Err(RegistryError::AlreadyExists {
                kind: "label",
                id: req.label_id.clone(),
            });
        }

        let caller = self.authorize(
            owner_sign,
            Payload::builder(Method::AddLabel).label_id(&req.label_id).build(),
        )?;

        let now = self.ctx.timestamp;
        if req.expire_at <= now {
            return Err(RegistryError::InvalidExpiry(
                "expire_at must be greater than block timestamp".into(),
            ));
        }

        let producer = match &req.producer {
            Some(p) => producer_did(p)?,
            None => caller.did.clone(),
        };
        let producer_expire_at = if req.producer_expire_at == 0 {
            req.expire_at
        } else {
            req.producer_expire_at
        };
        if producer_expire_at <= now {
            return Err(RegistryError::InvalidExpiry(
                "producer_expire_at must be greater than block timestamp".into(),
            ));
        }
        if producer_expire_at > req.expire_at {
            return Err(RegistryError::InvalidExpiry(
                "producer_expire_at must be less than or equal to expire_at".into(),
            ));
        }

        let label = LabelInfo {
            label_id: req.label_id.clone(),
            owner: caller.did.clone(),
            name: req.name.clone(),
            public_key: req.public_key.clone(),
            expire_at: req.expire_at,
            category: req.category.clone(),
            producer: producer.clone(),
            producer_expire_at,
            created: self.ctx.height,
            last_updated: self.ctx.height,
            revoked: 0,
        };
        self.schema
            .labels
            .set(&mut self.store, label.label_id.as_str(), &label)?;
        self.emit(RegistryEvent::LabelAdded {
            label_id: label.label_id.clone(),
            owner: caller.did,
            producer,
        });
        self.adjust_counter(Counter::Labels, 1)?;

        if let Some(data_id) = &req.data {
            if req.size > 0 {
                self.attach_data(&label, data_id, &label.name, req.size)?;
            }
        }
        info!("Label {} added by {}", label.label_id, label.owner);
        Ok(())
    }

    fn attach_data(&mut self, label: &LabelInfo, data_id: &str, name: &str, size: u64) -> RegistryResult<()> {
        if data_id.is_empty() {
            return Err(RegistryError::EmptyId("data_id"));
        }
        if size == 0 {
            return Err(RegistryError::InvalidArgument("size must be positive".into()));
        }

        let data = self.schema.data_of(&label.label_id);
        let key = data_id.to_string();
        if data.contains(&self.store, &key)? {
            return Err(RegistryError::AlreadyExists {
                kind: "data",
                id: key,
            });
        }
        data.set(
            &mut self.store,
            &key,
            &DataInfo {
                data_id: key.clone(),
                name: name.to_string(),
                size,
            },
        )?;

        self.emit(RegistryEvent::LabelData {
            label_id: label.label_id.clone(),
            data_id: key.clone(),
        });
        self.request_pin(PinRequest::Pin {
            cid: key,
            size,
            expire_at: label.expire_at,
            group: label.label_id.clone(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn remove_label(&mut self, label_id: &str, owner_sign: &str) -> RegistryResult<()> {
        let mut label = self.live_label(label_id)?;
        let caller = self.authorize(
            owner_sign,
            Payload::builder(Method::RemoveLabel)
                .label_id(label_id)
                .base_height(label.last_updated)
                .build(),
        )?;
        if !label.check_owner(&caller.did) {
            return Err(RegistryError::PermissionDenied(format!(
                "{} does not own label {}",
                caller.did, label_id
            )));
        }

        let had_data = self.schema.data_of(label_id).remove_all(&mut self.store)? > 0;

        let policy_ids = self.schema.policies_of(label_id);
        let removed = policy_ids.length(&self.store)?;
        for index in (0..removed).rev() {
            let policy_id = policy_ids.at(&self.store, index)?;
            policy_ids.remove(&mut self.store, &policy_id)?;
            self.schema.policies.remove(&mut self.store, policy_id.as_str())?;
        }
        self.adjust_counter(Counter::Policies, -(removed as i64))?;

        label.revoked = self.ctx.height;
        self.schema.labels.set(&mut self.store, label_id, &label)?;
        self.emit(RegistryEvent::LabelRemoved {
            label_id: label_id.to_string(),
        });
        self.adjust_counter(Counter::Labels, -1)?;

        if had_data {
            self.request_pin(PinRequest::UpdateGroup {
                group: label_id.to_string(),
                expire_at: GROUP_REVOKED,
            });
        }
        info!("Label {} revoked with {} policies", label_id, removed);
        Ok(())
    }

    fn update_label(&mut self, label_id: &str, update: &LabelUpdate, owner_sign: &str) -> RegistryResult<()> {
        let mut label = self.live_label(label_id)?;
        let caller = self.authorize(
            owner_sign,
            Payload::builder(Method::UpdateLabel)
                .label_id(label_id)
                .base_height(label.last_updated)
                .build(),
        )?;
        if !label.check_owner(&caller.did) {
            return Err(RegistryError::PermissionDenied(format!(
                "{} does not own label {}",
                caller.did, label_id
            )));
        }

        let now = self.ctx.timestamp;
        if label.is_expired(now) {
            return Err(RegistryError::Expired(format!("label {} has expired", label_id)));
        }

        if let Some(name) = &update.name {
            label.name = name.clone();
        }
        if let Some(category) = &update.category {
            label.category = Some(category.clone());
        }
        if let Some(producer) = &update.producer {
            label.producer = producer_did(producer)?;
        }

        let previous_expiry = label.expire_at;
        if update.expire_at > 0 {
            if update.expire_at <= now {
                return Err(RegistryError::InvalidExpiry(
                    "expire_at must be greater than block timestamp".into(),
                ));
            }
            label.expire_at = update.expire_at;
        }
        if update.producer_expire_at > 0 {
            if update.producer_expire_at <= now {
                return Err(RegistryError::InvalidExpiry(
                    "producer_expire_at must be greater than block timestamp".into(),
                ));
            }
            if update.producer_expire_at > label.expire_at {
                return Err(RegistryError::InvalidExpiry(
                    "producer_expire_at must be less than or equal to expire_at".into(),
                ));
            }
            label.producer_expire_at = update.producer_expire_at;
        }
        label.producer_expire_at = label.producer_expire_at.min(label.expire_at);

        let expiry_changed = label.expire_at != previous_expiry;
        if label.expire_at < previous_expiry {
            self.clamp_policies(label_id, label.expire_at)?;
        }

        label.last_updated = self.ctx.height;
        self.schema.labels.set(&mut self.store, label_id, &label)?;
        self.emit(RegistryEvent::LabelUpdated {
            label_id: label_id.to_string(),
        });

        if expiry_changed {
            self.request_pin(PinRequest::UpdateGroup {
                group: label_id.to_string(),
                expire_at: label.expire_at,
            });
        }
        Ok(())
    }

    fn clamp_policies(&mut self, label_id: &str, expire_at: u64) -> RegistryResult<()> {
        for policy_id in self.schema.policies_of(label_id).values(&self.store)? {
            if let Some(mut policy) = self.schema.policies.get(&self.store, policy_id.as_str())? {
                if policy.expire_at > expire_at {
                    policy.expire_at = expire_at;
                    self.schema
                        .policies
                        .set(&mut self.store, policy_id.as_str(), &policy)?;
                }
            }
        }
        Ok(())
    }

    fn add_data(&mut self, req: &NewData, producer_sign: &str) -> RegistryResult<()> {
        let label = self.live_label(&req.label_id)?;
        let caller = self.authorize(
            producer_sign,
            Payload::builder(Method::AddData)
                .label_id(&req.label_id)
                .data_id(&req.data_id)
                .build(),
        )?;
        if label.producer != caller.did {
            return Err(RegistryError::PermissionDenied(format!(
                "{} is not the producer of label {}",
                caller.did, req.label_id
            )));
        }
        if label.producer_expire_at <= self.ctx.timestamp {
            return Err(RegistryError::Expired(format!(
                "producer window of label {} has closed",
                req.label_id
            )));
        }
        self.attach_data(&label, &req.data_id, &req.name, req.size)
    }
}

impl<S: KeyValueStore> Registry<S> {
    /// Create a label owned by the signer of `owner_sign`.
    pub fn add_label(&mut self, ctx: &InvocationContext, req: &NewLabel, owner_sign: &str) -> RegistryResult<()> {
        self.execute(ctx, "add_label", |inv| inv.add_label(req, owner_sign))
    }

    pub fn update_label(
        &mut self,
        ctx: &InvocationContext,
        label_id: &str,
        update: &LabelUpdate,
        owner_sign: &str,
    ) -> RegistryResult<()> {
        self.execute(ctx, "update_label", |inv| inv.update_label(label_id, update, owner_sign))
    }

    /// Revoke a label, dropping its data and policies.
    pub fn remove_label(&mut self, ctx: &InvocationContext, label_id: &str, owner_sign: &str) -> RegistryResult<()> {
        self.execute(ctx, "remove_label", |inv| inv.remove_label(label_id, owner_sign))
    }

    pub fn add_data(&mut self, ctx: &InvocationContext, req: &NewData, producer_sign: &str) -> RegistryResult<()> {
        self.execute(ctx, "add_data", |inv| inv.add_data(req, producer_sign))
    }

    /// Label record, including revoked ones.
    pub fn get_label(&self, label_id: &str) -> RegistryResult<Option<LabelInfo>> {
        Ok(self.schema.labels.get(self.store(), label_id)?)
    }

    pub fn get_data(&self, label_id: &str, data_id: &str) -> RegistryResult<Option<DataInfo>> {
        Ok(self
            .schema
            .data_of(label_id)
            .get(self.store(), &data_id.to_string())?)
    }

    /// Page of data attached to a live label.
    pub fn get_data_list(&self, label_id: &str, offset: i64, limit: i64) -> RegistryResult<Page<DataInfo>> {
        self.schema.live_label(self.store(), label_id)?;
        let data = self.schema.data_of(label_id);
        let window = self.window(offset, limit, data.length(self.store())?);
        let items = data
            .range(self.store(), window.offset, window.size)?
            .into_iter()
            .map(|(_, info)| info)
            .collect();
        Ok(Page::from_window(window, items))
    }
}

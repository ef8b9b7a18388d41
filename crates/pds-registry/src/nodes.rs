use log::info;

use pds_store::KeyValueStore;

use crate::error::{RegistryError, RegistryResult};
use crate::events::RegistryEvent;
use crate::registry::{Invocation, Registry};
use crate::types::{InvocationContext, NewNode, NodeInfo, NodeUpdate};

impl<'r, S: KeyValueStore> Invocation<'r, S> {
    /// Minimum stake in base units.
    fn required_stake(&self) -> RegistryResult<u128> {
        let whole = self
            .schema
            .min_stake
            .get_or(&self.store, self.config.min_stake_for_serve)?;
        Ok(u128::from(whole) * u128::from(self.config.stake_unit))
    }

    fn check_stake(&self, stake: u128) -> RegistryResult<()> {
        let required = self.required_stake()?;
        if stake < required {
            return Err(RegistryError::InsufficientStake {
                required,
                provided: stake,
            });
        }
        Ok(())
    }

    fn owned_node(&self, peer_id: &str) -> RegistryResult<NodeInfo> {
        let node = self
            .schema
            .nodes
            .get(&self.store, &peer_id.to_string())?
            .ok_or_else(|| RegistryError::not_found("node", peer_id))?;
        if !node.check_owner(&self.ctx.caller) {
            return Err(RegistryError::PermissionDenied(format!(
                "{} does not own node {}",
                self.ctx.caller, peer_id
            )));
        }
        Ok(node)
    }

    fn add_node(&mut self, req: &NewNode) -> RegistryResult<()> {
        self.require_system_owner()?;
        if req.peer_id.is_empty() {
            return Err(RegistryError::EmptyId("peer_id"));
        }
        if self.schema.nodes.contains(&self.store, &req.peer_id)? {
            return Err(RegistryError::AlreadyExists {
                kind: "node",
                id: req.peer_id.clone(),
            });
        }
        self.check_stake(self.ctx.value)?;

        let node = NodeInfo {
            peer_id: req.peer_id.clone(),
            name: req.name.clone(),
            endpoint: req.endpoint.clone(),
            owner: req.owner.clone().unwrap_or_else(|| self.ctx.caller.clone()),
            created: self.ctx.height,
            stake: self.ctx.value,
            reward: 0,
        };
        self.schema.nodes.set(&mut self.store, &node.peer_id, &node)?;
        self.emit(RegistryEvent::NodeAdded {
            peer_id: node.peer_id.clone(),
            owner: node.owner.clone(),
            endpoint: node.endpoint.clone(),
        });
        info!("Node {} registered with stake {}", node.peer_id, node.stake);
        Ok(())
    }

    fn update_node(&mut self, peer_id: &str, update: &NodeUpdate) -> RegistryResult<()> {
        let mut node = self.owned_node(peer_id)?;

        let stake = node
            .stake
            .checked_add(self.ctx.value)
            .ok_or_else(|| RegistryError::InvalidArgument("stake overflow".into()))?;
        self.check_stake(stake)?;

        node.stake = stake;
        node.owner = update.owner.clone().unwrap_or_else(|| self.ctx.caller.clone());
        if let Some(name) = &update.name {
            node.name = name.clone();
        }
        if let Some(endpoint) = &update.endpoint {
            node.endpoint = endpoint.clone();
        }
        self.schema.nodes.set(&mut self.store, &node.peer_id, &node)?;
        self.emit(RegistryEvent::NodeUpdated {
            peer_id: node.peer_id.clone(),
            owner: node.owner.clone(),
            endpoint: node.endpoint.clone(),
        });
        Ok(())
    }

    fn remove_node(&mut self, peer_id: &str) -> RegistryResult<()> {
        let node = self.owned_node(peer_id)?;
        self.schema.nodes.remove(&mut self.store, &node.peer_id)?;
        self.emit(RegistryEvent::NodeRemoved {
            peer_id: node.peer_id,
        });
        Ok(())
    }
}

impl<S: KeyValueStore> Registry<S> {
    /// Register a serving node, staking the attached value.
    pub fn add_node(&mut self, ctx: &InvocationContext, req: &NewNode) -> RegistryResult<()> {
        self.execute(ctx, "add_node", |inv| inv.add_node(req))
    }

    /// Top up stake and change node details; only the node owner may call.
    pub fn update_node(&mut self, ctx: &InvocationContext, peer_id: &str, update: &NodeUpdate) -> RegistryResult<()> {
        self.execute(ctx, "update_node", |inv| inv.update_node(peer_id, update))
    }

    pub fn remove_node(&mut self, ctx: &InvocationContext, peer_id: &str) -> RegistryResult<()> {
        self.execute(ctx, "remove_node", |inv| inv.remove_node(peer_id))
    }

    pub fn get_node(&self, peer_id: &str) -> RegistryResult<Option<NodeInfo>> {
        Ok(self.schema.nodes.get(self.store(), &peer_id.to_string())?)
    }

    pub fn all_nodes(&self) -> RegistryResult<Vec<NodeInfo>> {
        let total = self.schema.nodes.length(self.store())?;
        Ok(self
            .schema
            .nodes
            .range(self.store(), 0, total)?
            .into_iter()
            .map(|(_, node)| node)
            .collect())
    }
}

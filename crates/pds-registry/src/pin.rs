// PIN SERVICE SEAM
// Content pinning with per-group expiry.
//
// A group expiry of 0 means "unset"; otherwise the effective expiry of a
// pinned item is the earlier of its own and its group's.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Group expiry meaning "expire immediately".
pub const GROUP_REVOKED: u64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinError {
    #[error("Already pinned: {0}")]
    AlreadyPinned(String),

    #[error("Invalid size: {0}")]
    InvalidSize(u64),

    #[error("Pin service unavailable: {0}")]
    Unavailable(String),
}

pub trait PinService {
    fn pin(&self, cid: &str, size: u64, expire_at: u64, group: &str, name: &str) -> Result<(), PinError>;
    fn update_group(&self, group: &str, expire_at: u64) -> Result<(), PinError>;
}

impl<T: PinService + ?Sized> PinService for Arc<T> {
    fn pin(&self, cid: &str, size: u64, expire_at: u64, group: &str, name: &str) -> Result<(), PinError> {
        (**self).pin(cid, size, expire_at, group, name)
    }

    fn update_group(&self, group: &str, expire_at: u64) -> Result<(), PinError> {
        (**self).update_group(group, expire_at)
    }
}

/// Pin-service call staged during an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinRequest {
    Pin {
        cid: String,
        size: u64,
        expire_at: u64,
        group: String,
        name: String,
    },
    UpdateGroup {
        group: String,
        expire_at: u64,
    },
}

impl PinRequest {
    pub fn apply(&self, service: &dyn PinService) -> Result<(), PinError> {
        match self {
            PinRequest::Pin {
                cid,
                size,
                expire_at,
                group,
                name,
            } => service.pin(cid, *size, *expire_at, group, name),
            PinRequest::UpdateGroup { group, expire_at } => service.update_group(group, *expire_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    pub cid: String,
    pub size: u64,
    pub expire_at: u64,
    pub group: String,
    pub name: String,
}

/// In-process pin service.
#[derive(Debug, Default)]
pub struct MemoryPinService {
    pins: Mutex<HashMap<String, PinRecord>>,
    groups: Mutex<HashMap<String, u64>>,
}

impl MemoryPinService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin record with its group expiry applied.
    pub fn get_pin(&self, cid: &str) -> Option<PinRecord> {
        let mut record = self.pins.lock().get(cid).cloned()?;
        let group_expire = self.get_group(&record.group);
        if group_expire > 0 && group_expire < record.expire_at {
            record.expire_at = group_expire;
        }
        Some(record)
    }

    pub fn get_group(&self, group: &str) -> u64 {
        self.groups.lock().get(group).copied().unwrap_or(0)
    }

    pub fn pin_count(&self) -> usize {
        self.pins.lock().len()
    }
}

impl PinService for MemoryPinService {
    fn pin(&self, cid: &str, size: u64, expire_at: u64, group: &str, name: &str) -> Result<(), PinError> {
        if size == 0 {
            return Err(PinError::InvalidSize(size));
        }
        let mut pins = self.pins.lock();
        if pins.contains_key(cid) {
            return Err(PinError::AlreadyPinned(cid.to_string()));
        }
        pins.insert(
            cid.to_string(),
            PinRecord {
                cid: cid.to_string(),
                size,
                expire_at,
                group: group.to_string(),
                name: name.to_string(),
            },
        );
        debug!("Pinned {} ({} bytes) in group {}", cid, size, group);
        Ok(())
    }

    fn update_group(&self, group: &str, expire_at: u64) -> Result<(), PinError> {
        self.groups.lock().insert(group.to_string(), expire_at);
        info!("Group {} now expires at {}", group, expire_at);
        Ok(())
    }
}

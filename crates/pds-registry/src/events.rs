use std::sync::Arc;

use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Domain events emitted after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    LabelAdded {
        label_id: String,
        owner: String,
        producer: String,
    },
    LabelUpdated {
        label_id: String,
    },
    LabelRemoved {
        label_id: String,
    },
    LabelData {
        label_id: String,
        data_id: String,
    },
    PolicyAdded {
        policy_id: String,
        label_id: String,
        consumer: String,
    },
    PolicyUpdated {
        policy_id: String,
    },
    NodeAdded {
        peer_id: String,
        owner: Address,
        endpoint: String,
    },
    NodeUpdated {
        peer_id: String,
        owner: Address,
        endpoint: String,
    },
    NodeRemoved {
        peer_id: String,
    },
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::LabelAdded { .. } => "LabelAdded",
            RegistryEvent::LabelUpdated { .. } => "LabelUpdated",
            RegistryEvent::LabelRemoved { .. } => "LabelRemoved",
            RegistryEvent::LabelData { .. } => "LabelData",
            RegistryEvent::PolicyAdded { .. } => "PolicyAdded",
            RegistryEvent::PolicyUpdated { .. } => "PolicyUpdated",
            RegistryEvent::NodeAdded { .. } => "NodeAdded",
            RegistryEvent::NodeUpdated { .. } => "NodeUpdated",
            RegistryEvent::NodeRemoved { .. } => "NodeRemoved",
        }
    }
}

pub trait EventSink {
    fn emit(&self, event: &RegistryEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &RegistryEvent) {
        (**self).emit(event)
    }
}

/// Writes each event to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: &RegistryEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!("event {}", json),
            Err(_) => info!("event {:?}", event),
        }
    }
}

/// Retains every emitted event in order.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<RegistryEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    pub fn last(&self) -> Option<RegistryEvent> {
        self.events.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn drain(&self) -> Vec<RegistryEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: &RegistryEvent) {
        self.events.lock().push(event.clone());
    }
}

//! Host-runtime collaborator contracts
//!
//! The engine's only outward boundary. The runtime container implements
//! these traits; the core never renders, persists or routes events itself.
//! User-facing callbacks are always dispatched on the runtime's external
//! domain so they cannot block monitoring.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::Event;

/// Opaque identifier assigned by the host runtime to a registered entity.
/// The empty id means "not registered".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId(value.to_string())
    }
}

/// Kinds of entities the engine registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Host,
    NetworkInterface,
}

/// Handle returned by event-receiver registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverHandle(pub u64);

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("unknown source entity {0}")]
    UnknownSource(EntityId),
    #[error("registration rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("external domain unavailable: {0}")]
    Unavailable(String),
}

/// An event as seen by receivers: payload plus its source entity
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub source: EntityId,
    pub event: Event,
}

pub type EventPredicate = Box<dyn Fn(&EventInfo) -> bool + Send + Sync>;
pub type EventHandler = Box<dyn Fn(&EventInfo) -> anyhow::Result<()> + Send + Sync>;

/// Closure scheduled onto the runtime's external domain
pub type Job = Box<dyn FnOnce() + Send>;

/// Delivers tagged event records to the runtime's broadcast bus.
pub trait EventSink: Send + Sync {
    /// Fails when the source entity is unknown to the runtime.
    fn broadcast(&self, source: &EntityId, event: &Event) -> Result<(), RegistrationError>;
}

/// Entity lifecycle registration.
pub trait EntityRegistrar: Send + Sync {
    fn register_entity(
        &self,
        local_id: &str,
        kind: EntityKind,
        display_name: &str,
    ) -> Result<EntityId, RegistrationError>;

    fn deregister_entity(&self, entity_id: &EntityId) -> Result<(), RegistrationError>;
}

/// Predicate-routed event subscription.
pub trait EventReceiverRegistry: Send + Sync {
    fn register_event_receiver(
        &self,
        predicate: EventPredicate,
        handler: EventHandler,
    ) -> Result<ReceiverHandle, RegistrationError>;

    fn deregister_event_receiver(&self, handle: ReceiverHandle) -> Result<(), RegistrationError>;
}

/// Scheduling onto the runtime's external domain (user-listener dispatch).
pub trait ExternalScheduler: Send + Sync {
    fn enqueue_external(&self, jobs: Vec<Job>) -> Result<(), ScheduleError>;
}

/// The full collaborator surface the engine consumes.
pub trait Runtime: EventSink + EntityRegistrar + EventReceiverRegistry + ExternalScheduler {}

impl<T> Runtime for T where T: EventSink + EntityRegistrar + EventReceiverRegistry + ExternalScheduler {}

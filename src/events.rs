//! Change events published to the host runtime
//!
//! Every event carries the emitting host's entity id and display name;
//! interface-scoped events add the interface's entity id. Events are
//! collected during a single `HostState::apply` and flushed to the sink as
//! one batch, in emission order.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::models::Reachability;
use crate::runtime::EntityId;

/// Identity of the host an event batch belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEventContext {
    pub host_entity_id: EntityId,
    pub host_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostUptimeChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub old_seconds: u64,
    pub new_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPingPacketLossChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    /// Percent
    pub old_value: f64,
    pub new_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostReachabilityChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub old_value: Reachability,
    pub new_value: Reachability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceStatusChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub interface_entity_id: EntityId,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceAddressChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub interface_entity_id: EntityId,
    pub old_value: Vec<IpAddr>,
    pub new_value: Vec<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceTrafficStatsChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub interface_entity_id: EntityId,
    pub old_bytes_in: u64,
    pub new_bytes_in: u64,
    pub old_bytes_out: u64,
    pub new_bytes_out: u64,
    pub old_packets_in: u64,
    pub new_packets_in: u64,
    pub old_packets_out: u64,
    pub new_packets_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceErrorStatsChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub interface_entity_id: EntityId,
    pub old_errors_in: u64,
    pub new_errors_in: u64,
    pub old_errors_out: u64,
    pub new_errors_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDiscardStatsChange {
    pub host_entity_id: EntityId,
    pub host_name: String,
    pub interface_entity_id: EntityId,
    pub old_discards_in: u64,
    pub new_discards_in: u64,
    pub old_discards_out: u64,
    pub new_discards_out: u64,
}

/// Tagged sum of every event the engine emits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    HostUptimeChange(HostUptimeChange),
    HostPingPacketLossChange(HostPingPacketLossChange),
    HostReachabilityChange(HostReachabilityChange),
    InterfaceStatusChange(InterfaceStatusChange),
    InterfaceAddressChange(InterfaceAddressChange),
    InterfaceTrafficStatsChange(InterfaceTrafficStatsChange),
    InterfaceErrorStatsChange(InterfaceErrorStatsChange),
    InterfaceDiscardStatsChange(InterfaceDiscardStatsChange),
}

impl Event {
    /// Interface entity the event is scoped to, if any.
    pub fn interface_entity_id(&self) -> Option<&EntityId> {
        match self {
            Event::InterfaceStatusChange(e) => Some(&e.interface_entity_id),
            Event::InterfaceAddressChange(e) => Some(&e.interface_entity_id),
            Event::InterfaceTrafficStatsChange(e) => Some(&e.interface_entity_id),
            Event::InterfaceErrorStatsChange(e) => Some(&e.interface_entity_id),
            Event::InterfaceDiscardStatsChange(e) => Some(&e.interface_entity_id),
            _ => None,
        }
    }
}

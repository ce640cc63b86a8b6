//! NETMON Core Engine — per-host network monitoring
//!
//! For each configured host the engine periodically probes reachability
//! (ICMP echo) and walks the standard SNMP interface tables, derives
//! per-interface byte-rate history, detects state changes and publishes
//! typed change events to a host runtime:
//! - ICMP echo probing with loss/RTT statistics
//! - SNMP table walks (ifTable, ifXTable, ipAddressTable, ipAddrTable)
//!   with GET-BULK → GET-NEXT fallback
//! - Counter-rollover and device-reboot aware rate derivation
//! - Per-host/per-interface change detection with ordered event batches
//! - One scan task per host, all state mutation on one serialization domain
//!
//! The host runtime (event bus, entity registry, external dispatch) is an
//! external collaborator reached through the [`runtime`] traits.

pub mod config;
pub mod domain;
pub mod events;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod runtime;
pub mod scanner;
pub mod snmp;
pub mod state;

pub use config::{
    AddressChangeListener, HostConfig, InterfaceConfig, InterfaceKey, MonitorConfig,
};
pub use events::{
    Event, HostEventContext, HostPingPacketLossChange, HostReachabilityChange, HostUptimeChange,
    InterfaceAddressChange, InterfaceDiscardStatsChange, InterfaceErrorStatsChange,
    InterfaceStatusChange, InterfaceTrafficStatsChange,
};
pub use models::{HostSample, IfRow, IpMapEntry, PingSample, Reachability, SnmpSample};
pub use monitor::Monitor;
pub use runtime::{
    EntityId, EntityKind, EntityRegistrar, EventInfo, EventReceiverRegistry, EventSink,
    ExternalScheduler, ReceiverHandle, RegistrationError, Runtime, ScheduleError,
};
pub use scanner::{PingError, PingStats};
pub use state::{HostState, InterfaceState, InternalViolation, RATE_HISTORY_SIZE};

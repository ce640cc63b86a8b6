//! Configuration for the monitoring engine
//!
//! Constants plus the immutable per-host configuration model. A `HostConfig`
//! names a target, its probe channels (ping/SNMP) and the set of interfaces
//! to track, each identified by name, ifIndex or physical address.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::events::InterfaceAddressChange;

/// Default scan interval in seconds
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

/// Fixed floor of the initial per-task scan jitter (seconds)
pub const SCAN_JITTER_FLOOR_SECS: u64 = 10;

/// Default number of echo requests per ping probe
pub const DEFAULT_PING_COUNT: usize = 3;

/// Default per-echo ping timeout in seconds
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 10;

// ====== SNMP Configuration ======

/// SNMP community string for v2c
pub const SNMP_COMMUNITY: &str = "public";

/// SNMP request timeout
pub const SNMP_TIMEOUT: Duration = Duration::from_secs(2);

/// Retries per SNMP request (no exponential backoff)
pub const SNMP_RETRIES: u32 = 3;

/// SNMP port
pub const SNMP_PORT: u16 = 161;

/// Max repetitions per GET-BULK request
pub const SNMP_BULK_MAX_REPETITIONS: u32 = 20;

/// Upper bound on accepted ifIndex values; anything above is protocol noise
pub const MAX_INTERFACE_INDEX: u32 = 1000;

/// Callback invoked on the external domain when an interface's address list changes
pub type AddressChangeListener = Arc<dyn Fn(&InterfaceAddressChange) + Send + Sync>;

/// Identity of a tracked interface. Lookups are exact; the display form is
/// `name:<s>`, `index:<n>` or `phys:<mac>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterfaceKey {
    Name(String),
    Index(u32),
    PhysAddress(String),
}

impl InterfaceKey {
    /// Human-readable identity value, used in tracking/display names.
    pub fn tracking_name(&self) -> String {
        match self {
            InterfaceKey::Name(name) => name.clone(),
            InterfaceKey::Index(index) => index.to_string(),
            InterfaceKey::PhysAddress(phys) => phys.clone(),
        }
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKey::Name(name) => write!(f, "name:{}", name),
            InterfaceKey::Index(index) => write!(f, "index:{}", index),
            InterfaceKey::PhysAddress(phys) => write!(f, "phys:{}", phys),
        }
    }
}

/// Configuration of a single tracked interface
#[derive(Clone)]
pub struct InterfaceConfig {
    pub key: InterfaceKey,
    on_address_change: Vec<AddressChangeListener>,
}

impl InterfaceConfig {
    pub fn new(key: InterfaceKey) -> Self {
        Self {
            key,
            on_address_change: Vec::new(),
        }
    }

    /// Register a callback for address-list changes on this interface.
    /// Listeners run on the runtime's external domain, never on the
    /// serialization domain.
    pub fn add_address_change_listener(&mut self, listener: AddressChangeListener) {
        self.on_address_change.push(listener);
    }

    pub fn address_change_listeners(&self) -> &[AddressChangeListener] {
        &self.on_address_change
    }
}

impl fmt::Debug for InterfaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceConfig")
            .field("key", &self.key)
            .field("listeners", &self.on_address_change.len())
            .finish()
    }
}

/// Immutable per-host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub name: String,
    pub ip_address: String,
    pub ping_enabled: bool,
    pub ping_use_icmp: bool,
    pub ping_count: usize,
    pub ping_timeout_secs: u64,
    pub snmp_enabled: bool,
    pub interfaces: BTreeMap<InterfaceKey, InterfaceConfig>,
}

impl HostConfig {
    pub fn new(name: impl Into<String>, ip_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            ping_enabled: true,
            ping_use_icmp: false,
            ping_count: DEFAULT_PING_COUNT,
            ping_timeout_secs: DEFAULT_PING_TIMEOUT_SECS,
            snmp_enabled: true,
            interfaces: BTreeMap::new(),
        }
    }

    pub fn add_interface_by_name(&mut self, name: impl Into<String>) -> &mut InterfaceConfig {
        self.add_interface(InterfaceKey::Name(name.into()))
    }

    pub fn add_interface_by_index(&mut self, index: u32) -> &mut InterfaceConfig {
        self.add_interface(InterfaceKey::Index(index))
    }

    pub fn add_interface_by_phys_address(
        &mut self,
        phys_address: impl Into<String>,
    ) -> &mut InterfaceConfig {
        self.add_interface(InterfaceKey::PhysAddress(phys_address.into()))
    }

    fn add_interface(&mut self, key: InterfaceKey) -> &mut InterfaceConfig {
        self.interfaces
            .entry(key.clone())
            .or_insert_with(|| InterfaceConfig::new(key))
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    pub hosts: Vec<HostConfig>,
    pub scan_interval_secs: Option<u64>,
}

impl MonitorConfig {
    pub fn add_host(
        &mut self,
        name: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> &mut HostConfig {
        self.hosts.push(HostConfig::new(name, ip_address));
        self.hosts.last_mut().expect("just pushed")
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs.unwrap_or(DEFAULT_SCAN_INTERVAL_SECS))
    }
}

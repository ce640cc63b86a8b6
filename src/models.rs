//! Data models for the monitoring pipeline
//!
//! Ephemeral per-scan sample types. A `HostSample` is produced by a scan
//! task, handed to the serialization domain and consumed by
//! `HostState::apply`; it is never retained across scans.

use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fused reachability across the ping and SNMP channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reachability {
    #[default]
    Unknown,
    Reachable,
    Unreachable,
}

/// One address row gathered from ipAddressTable or the deprecated ipAddrTable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpMapEntry {
    /// 4 or 6 once the address has been resolved, 0 otherwise
    pub ip_version: u8,
    pub address: Option<IpAddr>,
    pub if_index: i32,
    pub status: i32,
    pub origin: i32,
    pub addr_type: i32,
    pub prefix_table_index: String,
    /// ipAddrTable only
    pub net_mask: String,
    /// ipAddrTable only
    pub bcast_address: i32,
    /// ipAddrTable only
    pub reasm_max_size: i32,
}

/// One interface row assembled from ifTable/ifXTable columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfRow {
    pub index: u32,
    pub name: String,
    pub in_octets: u32,
    pub hc_in_octets: u64,
    pub in_ucast_pkts: u32,
    pub hc_in_ucast_pkts: u64,
    pub hc_in_multicast_pkts: u64,
    pub hc_in_broadcast_pkts: u64,
    pub out_octets: u32,
    pub hc_out_octets: u64,
    pub out_ucast_pkts: u32,
    pub hc_out_ucast_pkts: u64,
    pub hc_out_multicast_pkts: u64,
    pub hc_out_broadcast_pkts: u64,
    pub in_errors: u32,
    pub out_errors: u32,
    pub in_discards: u32,
    pub out_discards: u32,
    pub mtu: i32,
    pub speed: u32,
    pub phys_address: String,
    pub admin_status: i32,
    pub oper_status: i32,
    pub last_change_secs: u32,
    pub ip_addresses: Vec<IpMapEntry>,
}

impl IfRow {
    /// Effective inbound byte counter: the 64-bit column when populated,
    /// the 32-bit one otherwise.
    pub fn bytes_in(&self) -> u64 {
        if self.hc_in_octets != 0 {
            self.hc_in_octets
        } else {
            u64::from(self.in_octets)
        }
    }

    /// Rollover cap matching the counter width `bytes_in` reports.
    pub fn bytes_in_cap(&self) -> u64 {
        if self.hc_in_octets != 0 {
            u64::MAX
        } else {
            u64::from(u32::MAX)
        }
    }

    pub fn bytes_out(&self) -> u64 {
        if self.hc_out_octets != 0 {
            self.hc_out_octets
        } else {
            u64::from(self.out_octets)
        }
    }

    pub fn bytes_out_cap(&self) -> u64 {
        if self.hc_out_octets != 0 {
            u64::MAX
        } else {
            u64::from(u32::MAX)
        }
    }

    /// Total inbound packets: sum of the HC unicast/multicast/broadcast
    /// columns when any is populated, else the 32-bit unicast column.
    pub fn packets_in(&self) -> u64 {
        if self.hc_in_ucast_pkts != 0
            || self.hc_in_multicast_pkts != 0
            || self.hc_in_broadcast_pkts != 0
        {
            self.hc_in_ucast_pkts + self.hc_in_multicast_pkts + self.hc_in_broadcast_pkts
        } else {
            u64::from(self.in_ucast_pkts)
        }
    }

    pub fn packets_out(&self) -> u64 {
        if self.hc_out_ucast_pkts != 0
            || self.hc_out_multicast_pkts != 0
            || self.hc_out_broadcast_pkts != 0
        {
            self.hc_out_ucast_pkts + self.hc_out_multicast_pkts + self.hc_out_broadcast_pkts
        } else {
            u64::from(self.out_ucast_pkts)
        }
    }

    pub fn errors_in(&self) -> u64 {
        u64::from(self.in_errors)
    }

    pub fn errors_out(&self) -> u64 {
        u64::from(self.out_errors)
    }

    pub fn discards_in(&self) -> u64 {
        u64::from(self.in_discards)
    }

    pub fn discards_out(&self) -> u64 {
        u64::from(self.out_discards)
    }
}

/// Ping results for one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingSample {
    pub status: String,
    pub packets_sent: usize,
    /// Percent, 0.0..=100.0
    pub packet_loss: f64,
    pub rtt_min: Duration,
    pub rtt_avg: Duration,
    pub rtt_max: Duration,
    pub rtt_std_dev: Duration,
}

/// SNMP results for one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnmpSample {
    pub success: bool,
    pub status: String,
    pub uptime_seconds: u64,
    pub if_rows: Vec<IfRow>,
}

/// Everything one scan of one host produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSample {
    /// Scan-start timestamp; becomes the host's `last_update_time`
    pub timestamp: DateTime<Utc>,
    pub ping: PingSample,
    pub snmp: SnmpSample,
}

impl HostSample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ping: PingSample::default(),
            snmp: SnmpSample::default(),
        }
    }
}

//! Active probing
//!
//! ICMP echo probing of monitored hosts. SNMP acquisition lives in
//! [`crate::snmp`]; this module only covers the reachability channel.

pub mod ping;

pub use ping::{PingError, PingStats, probe};

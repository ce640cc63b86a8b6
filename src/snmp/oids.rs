//! OID registry
//!
//! Subtree roots are carried both as numeric component slices (for request
//! construction) and as dotted prefixes (for matching response OIDs).
//! Column prefixes end with `.`; the remainder of a matching OID is the
//! table index suffix.
//!
//! MIB references: <https://mibs.observium.org/mib/IF-MIB/> and
//! <https://mibs.observium.org/mib/IP-MIB/>

/// DISMAN-EVENT-MIB::sysUpTimeInstance
pub const SYS_UPTIME: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];

/// A walkable table subtree
#[derive(Debug, Clone, Copy)]
pub struct Subtree {
    pub name: &'static str,
    pub root: &'static [u64],
}

pub const IF_TABLE: Subtree = Subtree {
    name: "ifTable",
    root: &[1, 3, 6, 1, 2, 1, 2, 2],
};

pub const IF_X_TABLE: Subtree = Subtree {
    name: "ifXTable",
    root: &[1, 3, 6, 1, 2, 1, 31, 1, 1],
};

/// IP-MIB::ipAddressTable — not universally supported; some vendors only
/// carry the deprecated ipAddrTable below.
pub const IP_ADDRESS_TABLE: Subtree = Subtree {
    name: "ipAddressTable",
    root: &[1, 3, 6, 1, 2, 1, 4, 34],
};

/// Deprecated IPv4-only RFC1213-MIB::ipAddrTable
pub const IP_ADDR_TABLE: Subtree = Subtree {
    name: "ipAddrTable",
    root: &[1, 3, 6, 1, 2, 1, 4, 20],
};

// ifTable columns
pub const IF_INDEX: &str = "1.3.6.1.2.1.2.2.1.1.";
pub const IF_DESCR: &str = "1.3.6.1.2.1.2.2.1.2.";
pub const IF_MTU: &str = "1.3.6.1.2.1.2.2.1.4.";
pub const IF_SPEED: &str = "1.3.6.1.2.1.2.2.1.5.";
pub const IF_PHYS_ADDRESS: &str = "1.3.6.1.2.1.2.2.1.6.";
pub const IF_ADMIN_STATUS: &str = "1.3.6.1.2.1.2.2.1.7.";
pub const IF_OPER_STATUS: &str = "1.3.6.1.2.1.2.2.1.8.";
pub const IF_LAST_CHANGE: &str = "1.3.6.1.2.1.2.2.1.9.";
pub const IF_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10.";
pub const IF_IN_UCAST_PKTS: &str = "1.3.6.1.2.1.2.2.1.11.";
pub const IF_IN_ERRORS: &str = "1.3.6.1.2.1.2.2.1.14.";
pub const IF_IN_DISCARDS: &str = "1.3.6.1.2.1.2.2.1.15.";
pub const IF_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16.";
pub const IF_OUT_UCAST_PKTS: &str = "1.3.6.1.2.1.2.2.1.17.";
pub const IF_OUT_ERRORS: &str = "1.3.6.1.2.1.2.2.1.20.";
pub const IF_OUT_DISCARDS: &str = "1.3.6.1.2.1.2.2.1.21.";

// ifXTable high-capacity counter columns
pub const IF_HC_IN_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.6.";
pub const IF_HC_IN_UCAST_PKTS: &str = "1.3.6.1.2.1.31.1.1.1.7.";
pub const IF_HC_IN_MULTICAST_PKTS: &str = "1.3.6.1.2.1.31.1.1.1.8.";
pub const IF_HC_IN_BROADCAST_PKTS: &str = "1.3.6.1.2.1.31.1.1.1.9.";
pub const IF_HC_OUT_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.10.";
pub const IF_HC_OUT_UCAST_PKTS: &str = "1.3.6.1.2.1.31.1.1.1.11.";
pub const IF_HC_OUT_MULTICAST_PKTS: &str = "1.3.6.1.2.1.31.1.1.1.12.";
pub const IF_HC_OUT_BROADCAST_PKTS: &str = "1.3.6.1.2.1.31.1.1.1.13.";

// ipAddressTable columns; the suffix encodes <version>.<length>.<octets...>
pub const IP_ADDRESS_IF_INDEX: &str = "1.3.6.1.2.1.4.34.1.3.";
pub const IP_ADDRESS_TYPE: &str = "1.3.6.1.2.1.4.34.1.4.";
pub const IP_ADDRESS_PREFIX: &str = "1.3.6.1.2.1.4.34.1.5.";
pub const IP_ADDRESS_ORIGIN: &str = "1.3.6.1.2.1.4.34.1.6.";
pub const IP_ADDRESS_STATUS: &str = "1.3.6.1.2.1.4.34.1.7.";

// ipAddrTable columns; the suffix is a dotted IPv4 address
pub const IP_AD_ENT_ADDR: &str = "1.3.6.1.2.1.4.20.1.1.";
pub const IP_AD_ENT_IF_INDEX: &str = "1.3.6.1.2.1.4.20.1.2.";
pub const IP_AD_ENT_NET_MASK: &str = "1.3.6.1.2.1.4.20.1.3.";
pub const IP_AD_ENT_BCAST_ADDR: &str = "1.3.6.1.2.1.4.20.1.4.";
pub const IP_AD_ENT_REASM_MAX_SIZE: &str = "1.3.6.1.2.1.4.20.1.5.";

// IP-MIB IpAddressType enumeration
pub const IP_ADDRESS_TYPE_UNICAST: i32 = 1;
pub const IP_ADDRESS_TYPE_ANYCAST: i32 = 2;
pub const IP_ADDRESS_TYPE_BROADCAST: i32 = 3;

// IP-MIB IpAddressOrigin enumeration
pub const IP_ADDRESS_ORIGIN_OTHER: i32 = 1;
pub const IP_ADDRESS_ORIGIN_MANUAL: i32 = 2;
pub const IP_ADDRESS_ORIGIN_DHCP: i32 = 4;
pub const IP_ADDRESS_ORIGIN_LINKLAYER: i32 = 5;
pub const IP_ADDRESS_ORIGIN_RANDOM: i32 = 6;

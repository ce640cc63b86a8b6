//! SNMP table assembly
//!
//! Reassembles the columnar varbind stream of a table walk into
//! per-interface rows. ifTable/ifXTable columns are keyed by the 1-based
//! ifIndex suffix; address tables group by their composite suffix first and
//! attach to rows afterwards. Rows come back sorted by ifIndex (array
//! position); a column repeated for the same row overwrites the earlier
//! value.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tracing::{debug, warn};

use crate::config::MAX_INTERFACE_INDEX;
use crate::models::{IfRow, IpMapEntry};
use crate::snmp::oids::{self, Subtree};
use crate::snmp::transport::{Pdu, SnmpError, SnmpTransport};
use crate::snmp::{PduValue, decode};

struct IfColumn {
    prefix: &'static str,
    set: fn(&mut IfRow, &PduValue) -> anyhow::Result<()>,
}

const IF_TABLE_COLUMNS: &[IfColumn] = &[
    IfColumn {
        prefix: oids::IF_DESCR,
        set: |row, v| {
            row.name = decode::string_bytes(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_IN_OCTETS,
        set: |row, v| {
            row.in_octets = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_OUT_OCTETS,
        set: |row, v| {
            row.out_octets = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_IN_UCAST_PKTS,
        set: |row, v| {
            row.in_ucast_pkts = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_OUT_UCAST_PKTS,
        set: |row, v| {
            row.out_ucast_pkts = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_IN_ERRORS,
        set: |row, v| {
            row.in_errors = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_OUT_ERRORS,
        set: |row, v| {
            row.out_errors = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_IN_DISCARDS,
        set: |row, v| {
            row.in_discards = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_OUT_DISCARDS,
        set: |row, v| {
            row.out_discards = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_MTU,
        set: |row, v| {
            row.mtu = decode::int32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_SPEED,
        set: |row, v| {
            row.speed = decode::uint32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_PHYS_ADDRESS,
        set: |row, v| {
            row.phys_address = decode::phys_address(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_ADMIN_STATUS,
        set: |row, v| {
            row.admin_status = decode::int32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_OPER_STATUS,
        set: |row, v| {
            row.oper_status = decode::int32(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_LAST_CHANGE,
        set: |row, v| {
            row.last_change_secs = decode::time_ticks_secs(v)?;
            Ok(())
        },
    },
];

const IF_X_TABLE_COLUMNS: &[IfColumn] = &[
    IfColumn {
        prefix: oids::IF_HC_IN_OCTETS,
        set: |row, v| {
            row.hc_in_octets = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_IN_UCAST_PKTS,
        set: |row, v| {
            row.hc_in_ucast_pkts = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_IN_MULTICAST_PKTS,
        set: |row, v| {
            row.hc_in_multicast_pkts = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_IN_BROADCAST_PKTS,
        set: |row, v| {
            row.hc_in_broadcast_pkts = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_OUT_OCTETS,
        set: |row, v| {
            row.hc_out_octets = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_OUT_UCAST_PKTS,
        set: |row, v| {
            row.hc_out_ucast_pkts = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_OUT_MULTICAST_PKTS,
        set: |row, v| {
            row.hc_out_multicast_pkts = decode::uint64(v)?;
            Ok(())
        },
    },
    IfColumn {
        prefix: oids::IF_HC_OUT_BROADCAST_PKTS,
        set: |row, v| {
            row.hc_out_broadcast_pkts = decode::uint64(v)?;
            Ok(())
        },
    },
];

struct IpColumn {
    prefix: &'static str,
    set: fn(&mut IpMapEntry, &PduValue) -> anyhow::Result<()>,
}

const IP_ADDRESS_TABLE_COLUMNS: &[IpColumn] = &[
    IpColumn {
        prefix: oids::IP_ADDRESS_IF_INDEX,
        set: |entry, v| {
            entry.if_index = decode::int32(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_ADDRESS_TYPE,
        set: |entry, v| {
            entry.addr_type = decode::int32(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_ADDRESS_PREFIX,
        set: |entry, v| {
            entry.prefix_table_index = decode::string(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_ADDRESS_ORIGIN,
        set: |entry, v| {
            entry.origin = decode::int32(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_ADDRESS_STATUS,
        set: |entry, v| {
            entry.status = decode::int32(v)?;
            Ok(())
        },
    },
];

const IP_ADDR_TABLE_COLUMNS: &[IpColumn] = &[
    IpColumn {
        prefix: oids::IP_AD_ENT_ADDR,
        set: |entry, v| {
            let text = decode::string(v)?;
            let address: Ipv4Addr = text
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid IPv4 address {text}"))?;
            entry.ip_version = 4;
            entry.address = Some(IpAddr::V4(address));
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_AD_ENT_IF_INDEX,
        set: |entry, v| {
            entry.if_index = decode::int32(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_AD_ENT_NET_MASK,
        set: |entry, v| {
            entry.net_mask = decode::string(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_AD_ENT_BCAST_ADDR,
        set: |entry, v| {
            entry.bcast_address = decode::int32(v)?;
            Ok(())
        },
    },
    IpColumn {
        prefix: oids::IP_AD_ENT_REASM_MAX_SIZE,
        set: |entry, v| {
            entry.reasm_max_size = decode::int32(v)?;
            Ok(())
        },
    },
];

/// Walks table subtrees and assembles rows. Retains two pieces of
/// per-target memory across scans: whether the agent handles GET-BULK and
/// the last row count (presize hint for the next walk).
pub struct TableAssembler {
    target: String,
    use_bulk: bool,
    last_row_count: usize,
}

impl TableAssembler {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            use_bulk: true,
            last_row_count: 0,
        }
    }

    /// Walk ifTable and return the assembled rows, sorted by ifIndex.
    pub async fn walk_if_table<T: SnmpTransport>(
        &mut self,
        transport: &mut T,
    ) -> Result<Vec<IfRow>, SnmpError> {
        let pdus = self.fetch_subtree(transport, &oids::IF_TABLE).await?;
        let rows = self.assemble_if_rows(&pdus);
        self.last_row_count = rows.len();
        Ok(rows)
    }

    /// Overlay ifXTable high-capacity columns onto already-assembled rows.
    pub async fn walk_if_x_table<T: SnmpTransport>(
        &mut self,
        transport: &mut T,
        rows: &mut [IfRow],
    ) -> Result<(), SnmpError> {
        let pdus = self.fetch_subtree(transport, &oids::IF_X_TABLE).await?;
        for pdu in &pdus {
            self.apply_if_column("ifXTable", IF_X_TABLE_COLUMNS, pdu, rows);
        }
        Ok(())
    }

    /// Walk IP-MIB::ipAddressTable and attach addresses to their rows.
    /// Returns the number of table entries seen (zero means the host does
    /// not populate this table and the deprecated one should be tried).
    pub async fn walk_ip_address_table<T: SnmpTransport>(
        &mut self,
        transport: &mut T,
        rows: &mut [IfRow],
    ) -> Result<usize, SnmpError> {
        let pdus = self.fetch_subtree(transport, &oids::IP_ADDRESS_TABLE).await?;
        let entries = self.group_entries(IP_ADDRESS_TABLE_COLUMNS, &pdus);
        let count = entries.len();

        for (suffix, mut entry) in entries {
            if entry.if_index < 1 || entry.if_index as usize > rows.len() {
                warn!(
                    target = %self.target,
                    if_index = entry.if_index,
                    rows = rows.len(),
                    "ipAddressTable ifIndex out of range"
                );
                continue;
            }

            match parse_address_suffix(&suffix) {
                Ok((version, address)) => {
                    entry.ip_version = version;
                    entry.address = Some(address);
                }
                Err(e) => {
                    warn!(target = %self.target, suffix = %suffix, error = %e, "invalid ipAddressTable entry");
                    continue;
                }
            }

            if entry.addr_type == oids::IP_ADDRESS_TYPE_BROADCAST {
                continue;
            }

            let offset = (entry.if_index - 1) as usize;
            rows[offset].ip_addresses.push(entry);
        }

        Ok(count)
    }

    /// Walk the deprecated ipAddrTable (IPv4 only). Entries attach to their
    /// rows unconditionally; this path predates the address-type column, so
    /// there is nothing to filter on.
    pub async fn walk_ip_addr_table<T: SnmpTransport>(
        &mut self,
        transport: &mut T,
        rows: &mut [IfRow],
    ) -> Result<(), SnmpError> {
        let pdus = self.fetch_subtree(transport, &oids::IP_ADDR_TABLE).await?;
        let entries = self.group_entries(IP_ADDR_TABLE_COLUMNS, &pdus);

        for (_, entry) in entries {
            if entry.if_index < 1 || entry.if_index as usize > rows.len() {
                warn!(
                    target = %self.target,
                    if_index = entry.if_index,
                    rows = rows.len(),
                    "ipAddrTable ifIndex out of range"
                );
                continue;
            }

            let offset = (entry.if_index - 1) as usize;
            rows[offset].ip_addresses.push(entry);
        }

        Ok(())
    }

    /// Collect a subtree's varbinds, preferring GET-BULK. The first bulk
    /// transport error downgrades this target to GET-NEXT walks for the rest
    /// of the assembler's lifetime; partial bulk output is discarded before
    /// the retry.
    async fn fetch_subtree<T: SnmpTransport>(
        &mut self,
        transport: &mut T,
        subtree: &Subtree,
    ) -> Result<Vec<Pdu>, SnmpError> {
        let mut pdus = Vec::new();

        if self.use_bulk {
            match transport.bulk_walk(subtree, &mut pdus).await {
                Ok(()) => return Ok(pdus),
                Err(SnmpError::Cancelled) => return Err(SnmpError::Cancelled),
                Err(e) => {
                    warn!(
                        target = %self.target,
                        table = subtree.name,
                        error = %e,
                        "bulk walk failed, falling back to single walk"
                    );
                    self.use_bulk = false;
                    pdus.clear();
                }
            }
        }

        transport.walk(subtree, &mut pdus).await?;
        Ok(pdus)
    }

    fn assemble_if_rows(&self, pdus: &[Pdu]) -> Vec<IfRow> {
        let mut rows: Vec<IfRow> = Vec::with_capacity(self.last_row_count.max(1));

        for pdu in pdus {
            if let Some(suffix) = pdu.oid.strip_prefix(oids::IF_INDEX) {
                let Ok(index) = suffix.parse::<u32>() else {
                    debug!(target = %self.target, oid = %pdu.oid, "unparsable ifIndex suffix");
                    continue;
                };
                if index == 0 || index > MAX_INTERFACE_INDEX {
                    warn!(target = %self.target, index, "interface index out of range");
                    continue;
                }
                let offset = (index - 1) as usize;
                if rows.len() <= offset {
                    rows.resize_with(offset + 1, IfRow::default);
                }
                rows[offset].index = index;
                continue;
            }

            self.apply_if_column("ifTable", IF_TABLE_COLUMNS, pdu, &mut rows);
        }

        rows
    }

    fn apply_if_column(&self, table: &str, columns: &[IfColumn], pdu: &Pdu, rows: &mut [IfRow]) {
        for column in columns {
            let Some(suffix) = pdu.oid.strip_prefix(column.prefix) else {
                continue;
            };
            let Ok(index) = suffix.parse::<u32>() else {
                debug!(target = %self.target, oid = %pdu.oid, "unparsable ifIndex suffix");
                return;
            };
            let Some(row) = index
                .checked_sub(1)
                .and_then(|offset| rows.get_mut(offset as usize))
            else {
                debug!(
                    target = %self.target,
                    table,
                    index,
                    rows = rows.len(),
                    "interface index out of range"
                );
                return;
            };
            if let Err(e) = (column.set)(row, &pdu.value) {
                debug!(target = %self.target, oid = %pdu.oid, error = %e, "skipping undecodable column value");
            }
            return;
        }
    }

    /// Group address-table varbinds by their index suffix.
    fn group_entries(&self, columns: &[IpColumn], pdus: &[Pdu]) -> BTreeMap<String, IpMapEntry> {
        let mut entries: BTreeMap<String, IpMapEntry> = BTreeMap::new();

        for pdu in pdus {
            for column in columns {
                let Some(suffix) = pdu.oid.strip_prefix(column.prefix) else {
                    continue;
                };
                let entry = entries.entry(suffix.to_string()).or_default();
                if let Err(e) = (column.set)(entry, &pdu.value) {
                    debug!(target = %self.target, oid = %pdu.oid, error = %e, "skipping undecodable column value");
                }
                break;
            }
        }

        entries
    }
}

/// Parse an ipAddressTable index suffix into (version, address). Valid
/// forms are `1.4.<4 octets>` (IPv4) and `2.16.<16 octets>` (IPv6).
pub(super) fn parse_address_suffix(suffix: &str) -> anyhow::Result<(u8, IpAddr)> {
    let parts: Vec<&str> = suffix.split('.').collect();

    if parts.len() == 6 && parts[0] == "1" && parts[1] == "4" {
        let octets = parse_octets::<4>(&parts[2..])?;
        return Ok((4, IpAddr::V4(Ipv4Addr::from(octets))));
    }

    if parts.len() == 18 && parts[0] == "2" && parts[1] == "16" {
        let octets = parse_octets::<16>(&parts[2..])?;
        return Ok((6, IpAddr::V6(Ipv6Addr::from(octets))));
    }

    anyhow::bail!("invalid ipAddressTable index {suffix}")
}

fn parse_octets<const N: usize>(parts: &[&str]) -> anyhow::Result<[u8; N]> {
    let mut octets = [0u8; N];
    for (slot, part) in octets.iter_mut().zip(parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|_| anyhow::anyhow!("invalid octet {part} in IP address index"))?;
    }
    Ok(octets)
}

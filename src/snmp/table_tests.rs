//! Tests for SNMP table assembly

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::snmp::PduValue;
use crate::snmp::oids::{self, Subtree};
use crate::snmp::table::{TableAssembler, parse_address_suffix};
use crate::snmp::transport::{Pdu, SnmpError, SnmpTransport};

/// Canned per-table varbind sets standing in for a live session.
#[derive(Default)]
struct FakeTransport {
    tables: HashMap<&'static str, Vec<Pdu>>,
    fail_bulk: bool,
    bulk_calls: usize,
    walk_calls: usize,
}

impl FakeTransport {
    fn with_table(mut self, name: &'static str, pdus: Vec<Pdu>) -> Self {
        self.tables.insert(name, pdus);
        self
    }
}

impl SnmpTransport for FakeTransport {
    async fn get(&mut self, _oid: &[u64]) -> Result<Pdu, SnmpError> {
        Err(SnmpError::Transport("no scalar values configured".to_string()))
    }

    async fn walk(&mut self, subtree: &Subtree, out: &mut Vec<Pdu>) -> Result<(), SnmpError> {
        self.walk_calls += 1;
        out.extend(self.tables.get(subtree.name).cloned().unwrap_or_default());
        Ok(())
    }

    async fn bulk_walk(&mut self, subtree: &Subtree, out: &mut Vec<Pdu>) -> Result<(), SnmpError> {
        self.bulk_calls += 1;
        if self.fail_bulk {
            // Half-finished bulk response followed by a transport error.
            if let Some(pdus) = self.tables.get(subtree.name) {
                out.extend(pdus.iter().take(1).cloned());
            }
            return Err(SnmpError::Transport("bulk walks unsupported".to_string()));
        }
        out.extend(self.tables.get(subtree.name).cloned().unwrap_or_default());
        Ok(())
    }
}

fn pdu(oid: &str, value: PduValue) -> Pdu {
    Pdu::new(oid, value)
}

fn two_interface_if_table() -> Vec<Pdu> {
    vec![
        pdu("1.3.6.1.2.1.2.2.1.1.1", PduValue::Integer(1)),
        pdu("1.3.6.1.2.1.2.2.1.1.2", PduValue::Integer(2)),
        pdu("1.3.6.1.2.1.2.2.1.2.1", PduValue::OctetString(b"eth0".to_vec())),
        pdu("1.3.6.1.2.1.2.2.1.2.2", PduValue::OctetString(b"eth1".to_vec())),
        pdu("1.3.6.1.2.1.2.2.1.10.1", PduValue::Counter32(100)),
        pdu("1.3.6.1.2.1.2.2.1.10.2", PduValue::Counter32(200)),
        pdu("1.3.6.1.2.1.2.2.1.8.1", PduValue::Integer(1)),
        pdu("1.3.6.1.2.1.2.2.1.8.2", PduValue::Integer(2)),
    ]
}

#[tokio::test]
async fn test_if_table_cold_start_assembles_ordered_rows() {
    let mut transport = FakeTransport::default().with_table("ifTable", two_interface_if_table());
    let mut assembler = TableAssembler::new("router");

    let rows = assembler.walk_if_table(&mut transport).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].index, 1);
    assert_eq!(rows[0].name, "eth0");
    assert_eq!(rows[0].in_octets, 100);
    assert_eq!(rows[0].oper_status, 1);
    assert_eq!(rows[1].index, 2);
    assert_eq!(rows[1].name, "eth1");
    assert_eq!(rows[1].in_octets, 200);
    assert_eq!(rows[1].oper_status, 2);
}

#[tokio::test]
async fn test_duplicate_column_last_wins() {
    let mut pdus = two_interface_if_table();
    pdus.push(pdu("1.3.6.1.2.1.2.2.1.2.1", PduValue::OctetString(b"lan0".to_vec())));

    let mut transport = FakeTransport::default().with_table("ifTable", pdus);
    let mut assembler = TableAssembler::new("router");

    let rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assert_eq!(rows[0].name, "lan0");
}

#[tokio::test]
async fn test_if_index_above_bound_is_rejected() {
    let pdus = vec![
        pdu("1.3.6.1.2.1.2.2.1.1.1", PduValue::Integer(1)),
        pdu("1.3.6.1.2.1.2.2.1.1.1001", PduValue::Integer(1001)),
    ];
    let mut transport = FakeTransport::default().with_table("ifTable", pdus);
    let mut assembler = TableAssembler::new("router");

    let rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_column_for_unknown_row_is_skipped() {
    let pdus = vec![
        pdu("1.3.6.1.2.1.2.2.1.1.1", PduValue::Integer(1)),
        // Column for ifIndex 5, but only one row exists.
        pdu("1.3.6.1.2.1.2.2.1.2.5", PduValue::OctetString(b"ghost".to_vec())),
    ];
    let mut transport = FakeTransport::default().with_table("ifTable", pdus);
    let mut assembler = TableAssembler::new("router");

    let rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "");
}

#[tokio::test]
async fn test_undecodable_column_skips_single_field() {
    let pdus = vec![
        pdu("1.3.6.1.2.1.2.2.1.1.1", PduValue::Integer(1)),
        pdu("1.3.6.1.2.1.2.2.1.2.1", PduValue::Integer(12)),
        pdu("1.3.6.1.2.1.2.2.1.10.1", PduValue::Counter32(5)),
    ];
    let mut transport = FakeTransport::default().with_table("ifTable", pdus);
    let mut assembler = TableAssembler::new("router");

    let rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assert_eq!(rows[0].name, "");
    assert_eq!(rows[0].in_octets, 5);
}

#[tokio::test]
async fn test_bulk_failure_falls_back_and_sticks() {
    let mut transport = FakeTransport {
        fail_bulk: true,
        ..Default::default()
    }
    .with_table("ifTable", two_interface_if_table());
    let mut assembler = TableAssembler::new("router");

    let rows = assembler.walk_if_table(&mut transport).await.unwrap();
    // The partial bulk output was discarded; rows come from the single walk.
    assert_eq!(rows.len(), 2);
    assert_eq!(transport.bulk_calls, 1);
    assert_eq!(transport.walk_calls, 1);

    // Later walks skip bulk entirely.
    let rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(transport.bulk_calls, 1);
    assert_eq!(transport.walk_calls, 2);
}

#[tokio::test]
async fn test_if_x_table_overlays_hc_counters() {
    let mut transport = FakeTransport::default()
        .with_table("ifTable", two_interface_if_table())
        .with_table(
            "ifXTable",
            vec![
                pdu("1.3.6.1.2.1.31.1.1.1.6.1", PduValue::Counter64(10_000_000_000)),
                pdu("1.3.6.1.2.1.31.1.1.1.10.2", PduValue::Counter64(7)),
            ],
        );
    let mut assembler = TableAssembler::new("router");

    let mut rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assembler
        .walk_if_x_table(&mut transport, &mut rows)
        .await
        .unwrap();

    assert_eq!(rows[0].hc_in_octets, 10_000_000_000);
    assert_eq!(rows[0].bytes_in(), 10_000_000_000);
    assert_eq!(rows[1].hc_out_octets, 7);
}

#[tokio::test]
async fn test_ip_address_table_attaches_and_suppresses_broadcast() {
    let unicast_suffix = "1.4.192.168.1.10";
    let broadcast_suffix = "1.4.192.168.1.255";
    let mut transport = FakeTransport::default()
        .with_table("ifTable", two_interface_if_table())
        .with_table(
            "ipAddressTable",
            vec![
                pdu(
                    &format!("{}{}", oids::IP_ADDRESS_IF_INDEX, unicast_suffix),
                    PduValue::Integer(1),
                ),
                pdu(
                    &format!("{}{}", oids::IP_ADDRESS_TYPE, unicast_suffix),
                    PduValue::Integer(oids::IP_ADDRESS_TYPE_UNICAST.into()),
                ),
                pdu(
                    &format!("{}{}", oids::IP_ADDRESS_IF_INDEX, broadcast_suffix),
                    PduValue::Integer(1),
                ),
                pdu(
                    &format!("{}{}", oids::IP_ADDRESS_TYPE, broadcast_suffix),
                    PduValue::Integer(oids::IP_ADDRESS_TYPE_BROADCAST.into()),
                ),
            ],
        );
    let mut assembler = TableAssembler::new("router");

    let mut rows = assembler.walk_if_table(&mut transport).await.unwrap();
    let count = assembler
        .walk_ip_address_table(&mut transport, &mut rows)
        .await
        .unwrap();

    assert_eq!(count, 2);
    let addresses: Vec<IpAddr> = rows[0]
        .ip_addresses
        .iter()
        .filter_map(|e| e.address)
        .collect();
    assert_eq!(addresses, vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))]);
}

#[tokio::test]
async fn test_ip_address_table_out_of_range_if_index_is_dropped() {
    let suffix = "1.4.10.0.0.1";
    let mut transport = FakeTransport::default()
        .with_table("ifTable", two_interface_if_table())
        .with_table(
            "ipAddressTable",
            vec![pdu(
                &format!("{}{}", oids::IP_ADDRESS_IF_INDEX, suffix),
                PduValue::Integer(9),
            )],
        );
    let mut assembler = TableAssembler::new("router");

    let mut rows = assembler.walk_if_table(&mut transport).await.unwrap();
    let count = assembler
        .walk_ip_address_table(&mut transport, &mut rows)
        .await
        .unwrap();

    // The entry still counts (the table is populated), but attaches nowhere.
    assert_eq!(count, 1);
    assert!(rows[0].ip_addresses.is_empty());
    assert!(rows[1].ip_addresses.is_empty());
}

#[tokio::test]
async fn test_deprecated_ip_addr_table_attaches_unconditionally() {
    let suffix = "192.168.1.255";
    let mut transport = FakeTransport::default()
        .with_table("ifTable", two_interface_if_table())
        .with_table(
            "ipAddrTable",
            vec![
                pdu(
                    &format!("{}{}", oids::IP_AD_ENT_ADDR, suffix),
                    PduValue::IpAddress([192, 168, 1, 255]),
                ),
                pdu(
                    &format!("{}{}", oids::IP_AD_ENT_IF_INDEX, suffix),
                    PduValue::Integer(1),
                ),
                pdu(
                    &format!("{}{}", oids::IP_AD_ENT_NET_MASK, suffix),
                    PduValue::IpAddress([255, 255, 255, 0]),
                ),
            ],
        );
    let mut assembler = TableAssembler::new("router");

    let mut rows = assembler.walk_if_table(&mut transport).await.unwrap();
    assembler
        .walk_ip_addr_table(&mut transport, &mut rows)
        .await
        .unwrap();

    assert_eq!(rows[0].ip_addresses.len(), 1);
    let entry = &rows[0].ip_addresses[0];
    assert_eq!(entry.ip_version, 4);
    assert_eq!(entry.address, Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 255))));
    assert_eq!(entry.net_mask, "255.255.255.0");
}

#[test]
fn test_parse_address_suffix_ipv4() {
    let (version, address) = parse_address_suffix("1.4.10.31.14.255").unwrap();
    assert_eq!(version, 4);
    assert_eq!(address, IpAddr::V4(Ipv4Addr::new(10, 31, 14, 255)));
}

#[test]
fn test_parse_address_suffix_ipv6() {
    let (version, address) =
        parse_address_suffix("2.16.38.5.166.1.169.197.6.2.30.105.122.255.254.13.177.225").unwrap();
    assert_eq!(version, 6);
    assert_eq!(
        address,
        IpAddr::V6(Ipv6Addr::from([
            38, 5, 166, 1, 169, 197, 6, 2, 30, 105, 122, 255, 254, 13, 177, 225,
        ]))
    );
}

#[test]
fn test_parse_address_suffix_rejects_other_shapes() {
    assert!(parse_address_suffix("1.4.10.31.14").is_err());
    assert!(parse_address_suffix("3.4.1.2.3.4").is_err());
    assert!(parse_address_suffix("2.16.1.2.3").is_err());
    assert!(parse_address_suffix("1.4.1.2.3.400").is_err());
    assert!(parse_address_suffix("").is_err());
}

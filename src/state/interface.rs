//! Retained per-interface state
//!
//! Keeps the last sample's counters, a rolling byte-rate ring and the
//! address lists, and diffs each incoming row against them, emitting one
//! event per changed aspect. An interface with no sample yet is "new": the
//! first update establishes a baseline without advancing the rate ring.

use std::cmp::Ordering;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::config::{AddressChangeListener, InterfaceConfig, InterfaceKey};
use crate::events::{
    Event, HostEventContext, InterfaceAddressChange, InterfaceDiscardStatsChange,
    InterfaceErrorStatsChange, InterfaceStatusChange, InterfaceTrafficStatsChange,
};
use crate::models::{IfRow, IpMapEntry};
use crate::runtime::{EntityId, ReceiverHandle};
use crate::state::InternalViolation;

/// Rate-history ring capacity
pub const RATE_HISTORY_SIZE: usize = 64;

pub struct InterfaceState {
    local_id: String,
    key: InterfaceKey,
    entity_id: EntityId,
    listeners: Vec<AddressChangeListener>,
    receiver_handle: Option<ReceiverHandle>,

    index: u32,
    name: String,
    status: String,
    phys_address: String,
    ip_v4_addresses: Vec<String>,
    last_ip_v4_change: Option<DateTime<Utc>>,
    ip_addresses: Vec<IpAddr>,
    last_ip_addresses_change: Option<DateTime<Utc>>,
    bytes_in: u64,
    bytes_out: u64,
    packets_in: u64,
    packets_out: u64,
    errors_in: u64,
    errors_out: u64,
    discards_in: u64,
    discards_out: u64,
    last_update_time: Option<DateTime<Utc>>,

    history_index: usize,
    bytes_in_rate: [u64; RATE_HISTORY_SIZE],
    bytes_out_rate: [u64; RATE_HISTORY_SIZE],
}

impl InterfaceState {
    pub fn new(local_id: impl Into<String>, config: &InterfaceConfig) -> Self {
        Self {
            local_id: local_id.into(),
            key: config.key.clone(),
            entity_id: EntityId::default(),
            listeners: config.address_change_listeners().to_vec(),
            receiver_handle: None,
            index: 0,
            name: config.key.tracking_name(),
            status: String::new(),
            phys_address: String::new(),
            ip_v4_addresses: Vec::new(),
            last_ip_v4_change: None,
            ip_addresses: Vec::new(),
            last_ip_addresses_change: None,
            bytes_in: 0,
            bytes_out: 0,
            packets_in: 0,
            packets_out: 0,
            errors_in: 0,
            errors_out: 0,
            discards_in: 0,
            discards_out: 0,
            last_update_time: None,
            history_index: 0,
            bytes_in_rate: [0; RATE_HISTORY_SIZE],
            bytes_out_rate: [0; RATE_HISTORY_SIZE],
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn key(&self) -> &InterfaceKey {
        &self.key
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn set_entity_id(&mut self, entity_id: EntityId) -> Result<(), InternalViolation> {
        if !self.entity_id.is_empty() {
            return Err(InternalViolation(format!(
                "interface {} already has entity id {}",
                self.key, self.entity_id
            )));
        }
        self.entity_id = entity_id;
        Ok(())
    }

    pub fn clear_entity_id(&mut self) {
        self.entity_id = EntityId::default();
    }

    pub fn listeners(&self) -> &[AddressChangeListener] {
        &self.listeners
    }

    pub fn receiver_handle(&self) -> Option<ReceiverHandle> {
        self.receiver_handle
    }

    pub fn set_receiver_handle(&mut self, handle: ReceiverHandle) {
        self.receiver_handle = Some(handle);
    }

    pub fn clear_receiver_handle(&mut self) {
        self.receiver_handle = None;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn phys_address(&self) -> &str {
        &self.phys_address
    }

    pub fn ip_v4_addresses(&self) -> &[String] {
        &self.ip_v4_addresses
    }

    pub fn ip_addresses(&self) -> &[IpAddr] {
        &self.ip_addresses
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    /// The `n` most recent inbound byte rates, oldest first.
    pub fn bytes_in_rate_history(&self, limit: usize) -> Vec<u64> {
        history(&self.bytes_in_rate, self.history_index, limit)
    }

    pub fn bytes_out_rate_history(&self, limit: usize) -> Vec<u64> {
        history(&self.bytes_out_rate, self.history_index, limit)
    }

    /// Diff `row` against the retained snapshot, refresh the rate ring and
    /// append one event per changed aspect.
    pub fn update(
        &mut self,
        host_uptime_secs: u64,
        now: DateTime<Utc>,
        row: &IfRow,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) {
        let mut elapsed_secs = 0u64;

        if let Some(last) = self.last_update_time {
            elapsed_secs = (now - last).num_seconds().max(0) as u64;
            self.history_index = (self.history_index + 1) % RATE_HISTORY_SIZE;
        }

        self.last_update_time = Some(now);

        if row.index != 0 {
            self.index = row.index;
        }
        if !row.phys_address.is_empty() {
            self.phys_address = row.phys_address.clone();
        }

        self.update_status(row, ctx, events);
        self.update_ip_addresses(now, row, ctx, events);
        self.update_traffic_stats(host_uptime_secs, elapsed_secs, row, ctx, events);
        self.update_error_stats(row, ctx, events);
        self.update_discard_stats(row, ctx, events);
    }

    fn update_status(&mut self, row: &IfRow, ctx: &HostEventContext, events: &mut Vec<Event>) {
        let new_status = describe_status(row.oper_status);

        if new_status != self.status {
            events.push(Event::InterfaceStatusChange(InterfaceStatusChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                interface_entity_id: self.entity_id.clone(),
                old_value: self.status.clone(),
                new_value: new_status.to_string(),
            }));
        }
        self.status = new_status.to_string();
    }

    fn update_ip_addresses(
        &mut self,
        now: DateTime<Utc>,
        row: &IfRow,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) {
        // Sort so that list equality and display order are stable.
        let mut entries: Vec<&IpMapEntry> = row
            .ip_addresses
            .iter()
            .filter(|entry| entry.address.is_some())
            .collect();
        entries.sort_by(|a, b| ip_entry_order(a, b));

        let new_v4: Vec<String> = entries
            .iter()
            .filter(|entry| entry.ip_version == 4)
            .filter_map(|entry| entry.address.map(|address| address.to_string()))
            .collect();

        if !new_v4.is_empty() && new_v4 != self.ip_v4_addresses {
            self.ip_v4_addresses = new_v4;
            self.last_ip_v4_change = Some(now);
        }

        let new_all: Vec<IpAddr> = entries.iter().filter_map(|entry| entry.address).collect();

        if !new_all.is_empty() && new_all != self.ip_addresses {
            events.push(Event::InterfaceAddressChange(InterfaceAddressChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                interface_entity_id: self.entity_id.clone(),
                old_value: self.ip_addresses.clone(),
                new_value: new_all.clone(),
            }));
            self.ip_addresses = new_all;
            self.last_ip_addresses_change = Some(now);
        }
    }

    fn update_traffic_stats(
        &mut self,
        host_uptime_secs: u64,
        elapsed_secs: u64,
        row: &IfRow,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) {
        let new_bytes_in = row.bytes_in();
        let new_bytes_out = row.bytes_out();
        let new_packets_in = row.packets_in();
        let new_packets_out = row.packets_out();

        if elapsed_secs != 0 {
            let slot = self.history_index;
            if host_uptime_secs <= elapsed_secs {
                // The device restarted, so counters reset.
                self.bytes_in_rate[slot] = new_bytes_in / elapsed_secs;
                self.bytes_out_rate[slot] = new_bytes_out / elapsed_secs;
            } else {
                // Per channel: rollover when the counter went backwards,
                // using the cap of the counter width the row carries.
                self.bytes_in_rate[slot] =
                    channel_rate(self.bytes_in, new_bytes_in, row.bytes_in_cap(), elapsed_secs);
                self.bytes_out_rate[slot] = channel_rate(
                    self.bytes_out,
                    new_bytes_out,
                    row.bytes_out_cap(),
                    elapsed_secs,
                );
            }
        }

        if self.bytes_in != new_bytes_in
            || self.bytes_out != new_bytes_out
            || self.packets_in != new_packets_in
            || self.packets_out != new_packets_out
        {
            events.push(Event::InterfaceTrafficStatsChange(InterfaceTrafficStatsChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                interface_entity_id: self.entity_id.clone(),
                old_bytes_in: self.bytes_in,
                new_bytes_in,
                old_bytes_out: self.bytes_out,
                new_bytes_out,
                old_packets_in: self.packets_in,
                new_packets_in,
                old_packets_out: self.packets_out,
                new_packets_out,
            }));
            self.bytes_in = new_bytes_in;
            self.bytes_out = new_bytes_out;
            self.packets_in = new_packets_in;
            self.packets_out = new_packets_out;
        }
    }

    fn update_error_stats(&mut self, row: &IfRow, ctx: &HostEventContext, events: &mut Vec<Event>) {
        let new_errors_in = row.errors_in();
        let new_errors_out = row.errors_out();

        if self.errors_in != new_errors_in || self.errors_out != new_errors_out {
            events.push(Event::InterfaceErrorStatsChange(InterfaceErrorStatsChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                interface_entity_id: self.entity_id.clone(),
                old_errors_in: self.errors_in,
                new_errors_in,
                old_errors_out: self.errors_out,
                new_errors_out,
            }));
            self.errors_in = new_errors_in;
            self.errors_out = new_errors_out;
        }
    }

    fn update_discard_stats(
        &mut self,
        row: &IfRow,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) {
        let new_discards_in = row.discards_in();
        let new_discards_out = row.discards_out();

        if self.discards_in != new_discards_in || self.discards_out != new_discards_out {
            events.push(Event::InterfaceDiscardStatsChange(InterfaceDiscardStatsChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                interface_entity_id: self.entity_id.clone(),
                old_discards_in: self.discards_in,
                new_discards_in,
                old_discards_out: self.discards_out,
                new_discards_out,
            }));
            self.discards_in = new_discards_in;
            self.discards_out = new_discards_out;
        }
    }

    #[cfg(test)]
    pub(crate) fn seed_counters(&mut self, bytes_in: u64, bytes_out: u64) {
        self.bytes_in = bytes_in;
        self.bytes_out = bytes_out;
    }

    #[cfg(test)]
    pub(crate) fn seed_history(
        &mut self,
        history_index: usize,
        bytes_in_rate: [u64; RATE_HISTORY_SIZE],
    ) {
        self.history_index = history_index;
        self.bytes_in_rate = bytes_in_rate;
    }

    #[cfg(test)]
    pub(crate) fn seed_last_update(&mut self, at: DateTime<Utc>) {
        self.last_update_time = Some(at);
    }

    #[cfg(test)]
    pub(crate) fn current_rates(&self) -> (u64, u64) {
        (
            self.bytes_in_rate[self.history_index],
            self.bytes_out_rate[self.history_index],
        )
    }
}

fn channel_rate(current: u64, new: u64, cap: u64, elapsed_secs: u64) -> u64 {
    if new < current {
        (cap - current + new) / elapsed_secs
    } else {
        (new - current) / elapsed_secs
    }
}

fn describe_status(oper_status: i32) -> &'static str {
    match oper_status {
        1 => "Up",
        2 => "Down",
        _ => "Unknown",
    }
}

/// Sort order for address entries: version ascending, then address bytes.
fn ip_entry_order(a: &IpMapEntry, b: &IpMapEntry) -> Ordering {
    a.ip_version
        .cmp(&b.ip_version)
        .then_with(|| address_bytes(a).cmp(&address_bytes(b)))
}

fn address_bytes(entry: &IpMapEntry) -> Vec<u8> {
    match entry.address {
        Some(IpAddr::V4(v4)) => v4.octets().to_vec(),
        Some(IpAddr::V6(v6)) => v6.octets().to_vec(),
        None => Vec::new(),
    }
}

/// Chronological slice of a rate ring: `limit` cells ending at `current`,
/// oldest first.
fn history(src: &[u64; RATE_HISTORY_SIZE], current: usize, limit: usize) -> Vec<u64> {
    let limit = limit.min(RATE_HISTORY_SIZE);
    (0..limit)
        .map(|i| src[(current + RATE_HISTORY_SIZE + 1 - limit + i) % RATE_HISTORY_SIZE])
        .collect()
}

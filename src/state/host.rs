//! Retained per-host state
//!
//! Applies each `HostSample` against the retained snapshot: ping fields,
//! uptime, the per-interface updates (resolved by name, then physical
//! address, then ifIndex) and finally the fused reachability. Events are
//! appended in a fixed order — ping, uptime, interfaces, reachability last.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{HostConfig, InterfaceKey};
use crate::events::{
    Event, HostEventContext, HostPingPacketLossChange, HostReachabilityChange, HostUptimeChange,
};
use crate::models::{HostSample, IfRow, PingSample, Reachability};
use crate::runtime::EntityId;
use crate::state::{InternalViolation, InterfaceState};

/// Ordered key builders for interface resolution; first hit wins.
type KeyStrategy = fn(&IfRow) -> Option<InterfaceKey>;

const KEY_STRATEGIES: &[KeyStrategy] = &[
    |row| (!row.name.is_empty()).then(|| InterfaceKey::Name(row.name.clone())),
    |row| (!row.phys_address.is_empty()).then(|| InterfaceKey::PhysAddress(row.phys_address.clone())),
    |row| Some(InterfaceKey::Index(row.index)),
];

pub struct HostState {
    local_id: String,
    config: Arc<HostConfig>,
    entity_id: EntityId,
    interfaces: BTreeMap<InterfaceKey, InterfaceState>,

    last_update_time: Option<DateTime<Utc>>,
    snmp_status: String,
    uptime_seconds: u64,
    ping_status: String,
    ping_packets_sent: usize,
    ping_packet_loss: f64,
    ping_rtt_min: Duration,
    ping_rtt_avg: Duration,
    ping_rtt_max: Duration,
    ping_rtt_std_dev: Duration,
    reachability: Reachability,
}

impl HostState {
    pub fn new(local_id: impl Into<String>, config: Arc<HostConfig>) -> Self {
        Self {
            local_id: local_id.into(),
            config,
            entity_id: EntityId::default(),
            interfaces: BTreeMap::new(),
            last_update_time: None,
            snmp_status: String::new(),
            uptime_seconds: 0,
            ping_status: String::new(),
            ping_packets_sent: 0,
            ping_packet_loss: 0.0,
            ping_rtt_min: Duration::ZERO,
            ping_rtt_avg: Duration::ZERO,
            ping_rtt_max: Duration::ZERO,
            ping_rtt_std_dev: Duration::ZERO,
            reachability: Reachability::Unknown,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn config_handle(&self) -> Arc<HostConfig> {
        Arc::clone(&self.config)
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn set_entity_id(&mut self, entity_id: EntityId) -> Result<(), InternalViolation> {
        if !self.entity_id.is_empty() {
            return Err(InternalViolation(format!(
                "host {} already has entity id {}",
                self.config.name, self.entity_id
            )));
        }
        self.entity_id = entity_id;
        Ok(())
    }

    pub fn clear_entity_id(&mut self) {
        self.entity_id = EntityId::default();
    }

    pub fn add_interface(&mut self, key: InterfaceKey, interface: InterfaceState) {
        self.interfaces.insert(key, interface);
    }

    pub fn interfaces(&self) -> impl Iterator<Item = (&InterfaceKey, &InterfaceState)> {
        self.interfaces.iter()
    }

    pub fn interfaces_mut(&mut self) -> impl Iterator<Item = (&InterfaceKey, &mut InterfaceState)> {
        self.interfaces.iter_mut()
    }

    pub fn interface(&self, key: &InterfaceKey) -> Option<&InterfaceState> {
        self.interfaces.get(key)
    }

    pub fn reachability(&self) -> Reachability {
        self.reachability
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds
    }

    pub fn ping_packet_loss(&self) -> f64 {
        self.ping_packet_loss
    }

    pub fn snmp_status(&self) -> &str {
        &self.snmp_status
    }

    pub fn ping_status(&self) -> &str {
        &self.ping_status
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }

    /// Apply one sample. Events append to `events` in emission order; the
    /// caller flushes them only after this returns.
    pub fn apply(&mut self, sample: &HostSample, events: &mut Vec<Event>) {
        self.last_update_time = Some(sample.timestamp);

        let ctx = HostEventContext {
            host_entity_id: self.entity_id.clone(),
            host_name: self.config.name.clone(),
        };

        let mut ping_reachability = Reachability::Unknown;
        let mut snmp_reachability = Reachability::Unknown;

        if self.config.ping_enabled && sample.ping.packets_sent > 0 {
            ping_reachability = self.update_ping_data(&sample.ping, &ctx, events);
        }

        if self.config.snmp_enabled {
            snmp_reachability = self.update_snmp_data(sample, &ctx, events);
        }

        let new_reachability = fuse_reachability(ping_reachability, snmp_reachability);

        if self.reachability != new_reachability {
            events.push(Event::HostReachabilityChange(HostReachabilityChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                old_value: self.reachability,
                new_value: new_reachability,
            }));
            self.reachability = new_reachability;
        }
    }

    fn update_ping_data(
        &mut self,
        ping: &PingSample,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) -> Reachability {
        self.ping_status = ping.status.clone();
        self.ping_packets_sent = ping.packets_sent;

        if self.ping_packet_loss != ping.packet_loss {
            events.push(Event::HostPingPacketLossChange(HostPingPacketLossChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                old_value: self.ping_packet_loss,
                new_value: ping.packet_loss,
            }));
            self.ping_packet_loss = ping.packet_loss;
        }

        self.ping_rtt_min = ping.rtt_min;
        self.ping_rtt_avg = ping.rtt_avg;
        self.ping_rtt_max = ping.rtt_max;
        self.ping_rtt_std_dev = ping.rtt_std_dev;

        if ping.packet_loss == 100.0 {
            Reachability::Unreachable
        } else {
            Reachability::Reachable
        }
    }

    fn update_snmp_data(
        &mut self,
        sample: &HostSample,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) -> Reachability {
        self.snmp_status = sample.snmp.status.clone();

        let new_uptime = sample.snmp.uptime_seconds;
        if new_uptime != 0 && self.uptime_seconds != new_uptime {
            events.push(Event::HostUptimeChange(HostUptimeChange {
                host_entity_id: ctx.host_entity_id.clone(),
                host_name: ctx.host_name.clone(),
                old_seconds: self.uptime_seconds,
                new_seconds: new_uptime,
            }));
            self.uptime_seconds = new_uptime;
        }

        for row in &sample.snmp.if_rows {
            self.update_interface(sample, row, ctx, events);
        }

        if sample.snmp.success {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        }
    }

    fn update_interface(
        &mut self,
        sample: &HostSample,
        row: &IfRow,
        ctx: &HostEventContext,
        events: &mut Vec<Event>,
    ) {
        let Some(key) = self.resolve_interface_key(row) else {
            // Unknown interfaces are not auto-created; they were not configured.
            return;
        };

        if let Some(interface) = self.interfaces.get_mut(&key) {
            interface.update(sample.snmp.uptime_seconds, sample.timestamp, row, ctx, events);
        }
    }

    fn resolve_interface_key(&self, row: &IfRow) -> Option<InterfaceKey> {
        for strategy in KEY_STRATEGIES {
            let Some(key) = strategy(row) else {
                continue;
            };
            if self.interfaces.contains_key(&key) {
                debug!(host = %self.config.name, key = %key, "resolved interface");
                return Some(key);
            }
        }
        None
    }
}

/// Fused reachability across the two channels: any reachable channel wins,
/// two unknowns stay unknown, anything else is unreachable.
pub fn fuse_reachability(ping: Reachability, snmp: Reachability) -> Reachability {
    if ping == Reachability::Reachable || snmp == Reachability::Reachable {
        return Reachability::Reachable;
    }

    if ping == Reachability::Unknown && snmp == Reachability::Unknown {
        return Reachability::Unknown;
    }

    Reachability::Unreachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterfaceConfig;
    use crate::models::SnmpSample;

    fn host_state(
        ping_enabled: bool,
        snmp_enabled: bool,
        interface_keys: &[InterfaceKey],
    ) -> HostState {
        let mut config = HostConfig::new("router", "192.168.1.1");
        config.ping_enabled = ping_enabled;
        config.snmp_enabled = snmp_enabled;
        for key in interface_keys {
            config
                .interfaces
                .insert(key.clone(), InterfaceConfig::new(key.clone()));
        }

        let mut state = HostState::new("Host_1", Arc::new(config.clone()));
        state.set_entity_id(EntityId::from("entity-host-1")).unwrap();
        let mut counter = 1;
        for (key, iface_config) in &config.interfaces {
            counter += 1;
            let mut iface =
                InterfaceState::new(format!("NetworkInterface_{counter}"), iface_config);
            iface
                .set_entity_id(EntityId(format!("entity-if-{counter}")))
                .unwrap();
            state.add_interface(key.clone(), iface);
        }
        state
    }

    fn sample_at(timestamp: DateTime<Utc>) -> HostSample {
        HostSample::new(timestamp)
    }

    #[test]
    fn test_reachability_fusion_table() {
        use Reachability::*;

        let cases = [
            (Unknown, Unknown, Unknown),
            (Unknown, Reachable, Reachable),
            (Unknown, Unreachable, Unreachable),
            (Reachable, Unknown, Reachable),
            (Reachable, Reachable, Reachable),
            (Reachable, Unreachable, Reachable),
            (Unreachable, Unknown, Unreachable),
            (Unreachable, Reachable, Reachable),
            (Unreachable, Unreachable, Unreachable),
        ];

        for (ping, snmp, expected) in cases {
            assert_eq!(fuse_reachability(ping, snmp), expected, "{ping:?}/{snmp:?}");
        }
    }

    #[test]
    fn test_name_match_wins_over_phys_address() {
        let name_key = InterfaceKey::Name("eth0".to_string());
        let phys_key = InterfaceKey::PhysAddress("12:34:56:78:90:ab".to_string());
        let state = host_state(false, true, &[name_key.clone(), phys_key]);

        let row = IfRow {
            index: 1,
            name: "eth0".to_string(),
            phys_address: "12:34:56:78:90:ab".to_string(),
            ..Default::default()
        };

        assert_eq!(state.resolve_interface_key(&row), Some(name_key));
    }

    #[test]
    fn test_resolution_falls_back_to_index() {
        let index_key = InterfaceKey::Index(3);
        let state = host_state(false, true, &[index_key.clone()]);

        let row = IfRow {
            index: 3,
            name: "wan7".to_string(),
            ..Default::default()
        };

        assert_eq!(state.resolve_interface_key(&row), Some(index_key));
    }

    #[test]
    fn test_unknown_interface_is_silently_ignored() {
        let mut state = host_state(false, true, &[]);
        let mut sample = sample_at(Utc::now());
        sample.snmp.success = true;
        sample.snmp.if_rows = vec![IfRow {
            index: 1,
            name: "eth0".to_string(),
            oper_status: 1,
            ..Default::default()
        }];

        let mut events = Vec::new();
        state.apply(&sample, &mut events);

        // Only the reachability transition fires.
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::HostReachabilityChange(_)));
    }

    #[test]
    fn test_ping_only_loss_transitions_reachability() {
        let mut state = host_state(true, false, &[]);
        let mut sample = sample_at(Utc::now());
        sample.ping.packets_sent = 3;
        sample.ping.packet_loss = 100.0;
        sample.ping.status = "Timeout".to_string();

        let mut events = Vec::new();
        state.apply(&sample, &mut events);

        assert_eq!(state.reachability(), Reachability::Unreachable);
        assert_eq!(events.len(), 2);
        let Event::HostPingPacketLossChange(loss) = &events[0] else {
            panic!("expected loss change first, got {:?}", events[0]);
        };
        assert_eq!(loss.old_value, 0.0);
        assert_eq!(loss.new_value, 100.0);
        let Event::HostReachabilityChange(reach) = &events[1] else {
            panic!("expected reachability change last, got {:?}", events[1]);
        };
        assert_eq!(reach.old_value, Reachability::Unknown);
        assert_eq!(reach.new_value, Reachability::Unreachable);

        // Same sample again: nothing changed, nothing fires.
        let mut events = Vec::new();
        state.apply(&sample, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_ping_with_zero_packets_sent_is_ignored() {
        let mut state = host_state(true, false, &[]);
        let mut sample = sample_at(Utc::now());
        sample.ping.packets_sent = 0;
        sample.ping.status = "Cancelled".to_string();

        let mut events = Vec::new();
        state.apply(&sample, &mut events);

        assert_eq!(state.reachability(), Reachability::Unknown);
        assert!(events.is_empty());
    }

    #[test]
    fn test_uptime_change_emits_once_and_ignores_zero() {
        let mut state = host_state(false, true, &[]);

        let mut sample = sample_at(Utc::now());
        sample.snmp.success = true;
        sample.snmp.uptime_seconds = 500;

        let mut events = Vec::new();
        state.apply(&sample, &mut events);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::HostUptimeChange(u) if u.old_seconds == 0 && u.new_seconds == 500))
        );

        // Zero uptime in a later sample leaves the retained value alone.
        let mut sample = sample_at(Utc::now());
        sample.snmp = SnmpSample {
            success: true,
            uptime_seconds: 0,
            ..Default::default()
        };
        let mut events = Vec::new();
        state.apply(&sample, &mut events);
        assert!(!events.iter().any(|e| matches!(e, Event::HostUptimeChange(_))));
        assert_eq!(state.uptime_seconds(), 500);
    }

    #[test]
    fn test_event_order_ping_uptime_interfaces_reachability() {
        let name_key = InterfaceKey::Name("eth0".to_string());
        let mut state = host_state(true, true, &[name_key]);

        let mut sample = sample_at(Utc::now());
        sample.ping.packets_sent = 3;
        sample.ping.packet_loss = 25.0;
        sample.snmp.success = true;
        sample.snmp.uptime_seconds = 1000;
        sample.snmp.if_rows = vec![IfRow {
            index: 1,
            name: "eth0".to_string(),
            oper_status: 1,
            in_octets: 10,
            ..Default::default()
        }];

        let mut events = Vec::new();
        state.apply(&sample, &mut events);

        assert!(matches!(events[0], Event::HostPingPacketLossChange(_)));
        assert!(matches!(events[1], Event::HostUptimeChange(_)));
        assert!(matches!(events[2], Event::InterfaceStatusChange(_)));
        assert!(matches!(
            events.last().unwrap(),
            Event::HostReachabilityChange(_)
        ));
    }

    #[test]
    fn test_apply_is_idempotent_per_sample() {
        let name_key = InterfaceKey::Name("eth0".to_string());
        let mut state = host_state(false, true, &[name_key]);

        let mut sample = sample_at(Utc::now());
        sample.snmp.success = true;
        sample.snmp.uptime_seconds = 99999;
        sample.snmp.if_rows = vec![IfRow {
            index: 1,
            name: "eth0".to_string(),
            oper_status: 1,
            in_octets: 100,
            out_octets: 50,
            ..Default::default()
        }];

        let mut first = Vec::new();
        state.apply(&sample, &mut first);
        assert!(!first.is_empty());

        let mut second = Vec::new();
        state.apply(&sample, &mut second);
        assert!(second.is_empty(), "unexpected events: {second:?}");
    }
}

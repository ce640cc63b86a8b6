//! Per-host scan task
//!
//! One task per host: an initial random delay spreads the fleet out, then
//! every interval tick runs ping and SNMP acquisition and hands the sample
//! to the serialization domain. Cancellation is honored at every wait and
//! between acquisition phases; a scan interrupted mid-flight publishes
//! nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{HostConfig, SCAN_JITTER_FLOOR_SECS};
use crate::domain::Command;
use crate::models::HostSample;
use crate::scanner::ping;
use crate::snmp::{Snmp2Transport, TableAssembler, decode, oids};

pub(crate) struct ScanTask {
    cancel: CancellationToken,
    host: Arc<HostConfig>,
    host_id: String,
    interval: Duration,
    assembler: TableAssembler,
    updates: mpsc::UnboundedSender<Command>,
}

impl ScanTask {
    pub fn new(
        cancel: CancellationToken,
        host: Arc<HostConfig>,
        host_id: String,
        interval: Duration,
        updates: mpsc::UnboundedSender<Command>,
    ) -> Self {
        let assembler = TableAssembler::new(host.name.clone());
        Self {
            cancel,
            host,
            host_id,
            interval,
            assembler,
            updates,
        }
    }

    pub async fn run(mut self) {
        if !self.initial_delay().await {
            info!(host = %self.host.name, "monitoring task terminated");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            self.scan().await;

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }

        info!(host = %self.host.name, "monitoring task terminated");
    }

    /// Initial jitter before the first scan. Returns false when cancelled.
    async fn initial_delay(&self) -> bool {
        let max_random = self.interval.as_secs().saturating_sub(15).max(15);
        let delay = SCAN_JITTER_FLOOR_SECS + rand::rng().random_range(0..max_random);
        debug!(host = %self.host.name, delay, "initially pausing");

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(Duration::from_secs(delay)) => true,
        }
    }

    async fn scan(&mut self) {
        debug!(host = %self.host.name, "scanning");
        let mut sample = HostSample::new(Utc::now());

        if self.host.ping_enabled {
            self.ping_probe(&mut sample).await;
        }

        if self.host.snmp_enabled && !self.cancel.is_cancelled() {
            self.snmp_scan(&mut sample).await;
        }

        if self.cancel.is_cancelled() {
            debug!(host = %self.host.name, "scan interrupted, dropping sample");
            return;
        }

        if self
            .updates
            .send(Command::ApplySample {
                host_id: self.host_id.clone(),
                sample,
            })
            .is_err()
        {
            warn!(host = %self.host.name, "serialization domain closed, dropping sample");
        }
    }

    async fn ping_probe(&self, sample: &mut HostSample) {
        debug!(
            host = %self.host.name,
            count = self.host.ping_count,
            timeout = self.host.ping_timeout_secs,
            "pinging"
        );

        let timeout = Duration::from_secs(self.host.ping_timeout_secs);
        match ping::probe(
            &self.host.ip_address,
            self.host.ping_count,
            timeout,
            self.host.ping_use_icmp,
            &self.cancel,
        )
        .await
        {
            Ok(stats) => {
                if stats.sent == 0 {
                    sample.ping.status = "Cancelled".to_string();
                    return;
                }
                sample.ping.packets_sent = stats.sent;
                sample.ping.packet_loss = stats.loss_pct;
                sample.ping.status = if stats.loss_pct >= 100.0 {
                    "Timeout".to_string()
                } else {
                    "OK".to_string()
                };
                sample.ping.rtt_min = stats.rtt_min;
                sample.ping.rtt_avg = stats.rtt_avg;
                sample.ping.rtt_max = stats.rtt_max;
                sample.ping.rtt_std_dev = stats.rtt_std_dev;
            }
            Err(e) => {
                warn!(host = %self.host.name, error = %e, "failed to ping");
                sample.ping.status = format!("Unable to ping: {e}");
            }
        }
    }

    async fn snmp_scan(&mut self, sample: &mut HostSample) {
        debug!(host = %self.host.name, "retrieving snmp data");
        let started = Instant::now();

        let mut transport =
            match Snmp2Transport::connect(&self.host.ip_address, self.cancel.clone()).await {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(host = %self.host.name, error = %e, "unable to connect");
                    sample.snmp.status = format!("Unable to connect: {e}");
                    return;
                }
            };

        let uptime_success = self.get_uptime(&mut transport, sample).await;

        let if_table_success = match self.assembler.walk_if_table(&mut transport).await {
            Ok(rows) => {
                let populated = !rows.is_empty();
                sample.snmp.if_rows = rows;
                populated
            }
            Err(e) => {
                warn!(host = %self.host.name, error = %e, "error retrieving ifTable");
                false
            }
        };

        if if_table_success {
            if let Err(e) = self
                .assembler
                .walk_if_x_table(&mut transport, &mut sample.snmp.if_rows)
                .await
            {
                warn!(host = %self.host.name, error = %e, "error retrieving ifXTable");
            }

            match self
                .assembler
                .walk_ip_address_table(&mut transport, &mut sample.snmp.if_rows)
                .await
            {
                // Hosts without the current table may still carry the
                // deprecated IPv4-only one.
                Ok(0) => {
                    if let Err(e) = self
                        .assembler
                        .walk_ip_addr_table(&mut transport, &mut sample.snmp.if_rows)
                        .await
                    {
                        warn!(host = %self.host.name, error = %e, "error retrieving ipAddrTable");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(host = %self.host.name, error = %e, "error retrieving ipAddressTable");
                }
            }
        }

        debug!(
            host = %self.host.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snmp walk completed"
        );

        if uptime_success || if_table_success {
            sample.snmp.status = "OK".to_string();
            sample.snmp.success = true;
        } else {
            sample.snmp.status = "Failed to retrieve any data".to_string();
        }
    }

    async fn get_uptime(&self, transport: &mut Snmp2Transport, sample: &mut HostSample) -> bool {
        use crate::snmp::SnmpTransport;

        match transport.get(oids::SYS_UPTIME).await {
            Ok(pdu) => {
                match decode::time_ticks_secs(&pdu.value) {
                    Ok(seconds) => sample.snmp.uptime_seconds = u64::from(seconds),
                    Err(e) => {
                        debug!(host = %self.host.name, error = %e, "unexpected sysUpTime value");
                    }
                }
                true
            }
            Err(e) => {
                warn!(host = %self.host.name, error = %e, "error retrieving sysUpTime");
                false
            }
        }
    }
}

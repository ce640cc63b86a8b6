//! ICMP echo probing
//!
//! Issues a fixed number of echoes toward a single target and reports
//! loss/RTT statistics. The probe is cancellable between echoes; a probe
//! cancelled before the first echo reports `sent == 0`.

use std::net::IpAddr;
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PingError {
    #[error("invalid ping target {0}")]
    InvalidTarget(String),
    #[error("icmp client unavailable: {0}")]
    Client(String),
}

/// Echo statistics for one probe
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingStats {
    pub sent: usize,
    /// Percent, 0.0..=100.0
    pub loss_pct: f64,
    pub rtt_min: Duration,
    pub rtt_avg: Duration,
    pub rtt_max: Duration,
    pub rtt_std_dev: Duration,
}

impl PingStats {
    /// Build statistics from the echoes actually issued and the RTTs of the
    /// replies that came back.
    pub fn from_rtts(sent: usize, rtts: &[Duration]) -> Self {
        if sent == 0 || rtts.is_empty() {
            return Self {
                sent,
                loss_pct: if sent == 0 { 0.0 } else { 100.0 },
                ..Default::default()
            };
        }

        let received = rtts.len().min(sent);
        let loss_pct = ((sent - received) as f64 / sent as f64) * 100.0;

        let min = rtts.iter().min().copied().unwrap_or_default();
        let max = rtts.iter().max().copied().unwrap_or_default();
        let sum: f64 = rtts.iter().map(Duration::as_secs_f64).sum();
        let avg = sum / rtts.len() as f64;
        let variance = rtts
            .iter()
            .map(|rtt| {
                let delta = rtt.as_secs_f64() - avg;
                delta * delta
            })
            .sum::<f64>()
            / rtts.len() as f64;

        Self {
            sent,
            loss_pct,
            rtt_min: min,
            rtt_avg: Duration::from_secs_f64(avg),
            rtt_max: max,
            rtt_std_dev: Duration::from_secs_f64(variance.sqrt()),
        }
    }
}

/// Generates a per-probe ping identifier
fn rand_id() -> u16 {
    use std::time::SystemTime;
    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    ((duration.as_nanos() % 0xFFFF) as u16).wrapping_add(1)
}

fn client_config(ip: IpAddr, use_icmp: bool) -> Config {
    let kind = match ip {
        IpAddr::V4(_) => ICMP::V4,
        IpAddr::V6(_) => ICMP::V6,
    };
    let mut builder = Config::builder().kind(kind);
    if use_icmp {
        // Raw ICMP sockets need CAP_NET_RAW; the datagram kind works
        // unprivileged on Linux.
        builder = builder.sock_type_hint(socket2::Type::RAW);
    }
    builder.build()
}

/// Probe `target` with `count` echoes, each bounded by `timeout`.
pub async fn probe(
    target: &str,
    count: usize,
    timeout: Duration,
    use_icmp: bool,
    cancel: &CancellationToken,
) -> Result<PingStats, PingError> {
    let ip: IpAddr = target
        .parse()
        .map_err(|_| PingError::InvalidTarget(target.to_string()))?;

    let client = Client::new(&client_config(ip, use_icmp))
        .map_err(|e| PingError::Client(e.to_string()))?;

    let payload = [0u8; 56];
    let mut pinger = client.pinger(ip, PingIdentifier(rand_id())).await;
    pinger.timeout(timeout);

    let mut sent = 0usize;
    let mut rtts: Vec<Duration> = Vec::with_capacity(count);

    for seq in 0..count {
        if cancel.is_cancelled() {
            break;
        }
        sent += 1;

        tokio::select! {
            _ = cancel.cancelled() => break,
            result = pinger.ping(PingSequence(seq as u16), &payload) => {
                match result {
                    Ok((_packet, rtt)) => rtts.push(rtt),
                    // A lost echo; it still counts as sent.
                    Err(e) => debug!(target, seq, error = %e, "echo timed out"),
                }
            }
        }
    }

    Ok(PingStats::from_rtts(sent, &rtts))
}

//! SNMP session transport
//!
//! Wraps an `snmp2` v2c session with the per-request timeout/retry policy
//! and converts borrowed response values into owned [`Pdu`]s. Walks are
//! GET-NEXT based; bulk walks use GET-BULK. Every request observes the
//! task's cancellation token.

use snmp2::{AsyncSession, Oid, Value};
use thiserror::Error;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::{SNMP_BULK_MAX_REPETITIONS, SNMP_COMMUNITY, SNMP_PORT, SNMP_RETRIES, SNMP_TIMEOUT};
use crate::snmp::PduValue;
use crate::snmp::oids::Subtree;

#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("{0}")]
    Transport(String),
    #[error("cancelled")]
    Cancelled,
}

/// One varbind with its OID in dotted form (no leading dot)
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub oid: String,
    pub value: PduValue,
}

impl Pdu {
    pub fn new(oid: impl Into<String>, value: PduValue) -> Self {
        Self {
            oid: oid.into(),
            value,
        }
    }
}

/// Transport abstraction the table assembler walks against. The production
/// implementation is [`Snmp2Transport`]; tests substitute canned PDU sets.
#[allow(async_fn_in_trait)]
pub trait SnmpTransport {
    async fn get(&mut self, oid: &[u64]) -> Result<Pdu, SnmpError>;

    /// GET-NEXT walk of `subtree`, appending in-subtree varbinds to `out`.
    async fn walk(&mut self, subtree: &Subtree, out: &mut Vec<Pdu>) -> Result<(), SnmpError>;

    /// GET-BULK walk of `subtree`.
    async fn bulk_walk(&mut self, subtree: &Subtree, out: &mut Vec<Pdu>) -> Result<(), SnmpError>;
}

pub struct Snmp2Transport {
    session: AsyncSession,
    cancel: CancellationToken,
}

impl Snmp2Transport {
    /// Open a v2c session toward `target` (udp/161, community "public").
    pub async fn connect(target: &str, cancel: CancellationToken) -> Result<Self, SnmpError> {
        let addr = format!("{}:{}", target, SNMP_PORT);

        let session = tokio::select! {
            _ = cancel.cancelled() => return Err(SnmpError::Cancelled),
            result = timeout(
                SNMP_TIMEOUT,
                AsyncSession::new_v2c(&addr, SNMP_COMMUNITY.as_bytes(), 0),
            ) => match result {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => return Err(SnmpError::Transport(format!("unable to connect: {:?}", e))),
                Err(_) => return Err(SnmpError::Transport("connect timed out".to_string())),
            },
        };

        Ok(Self { session, cancel })
    }

    async fn get_varbinds(&mut self, oid_parts: &[u64]) -> Result<Vec<(Vec<u64>, PduValue)>, SnmpError> {
        let oid = oid_from_parts(oid_parts)?;
        let mut last_error = String::new();

        for _ in 0..SNMP_RETRIES {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(SnmpError::Cancelled),
                result = timeout(SNMP_TIMEOUT, self.session.get(&oid)) => match result {
                    Ok(Ok(response)) => return Ok(collect_varbinds(response)),
                    Ok(Err(e)) => last_error = format!("{:?}", e),
                    Err(_) => last_error = "request timed out".to_string(),
                },
            }
        }

        Err(SnmpError::Transport(last_error))
    }

    async fn getnext_varbinds(
        &mut self,
        oid_parts: &[u64],
    ) -> Result<Vec<(Vec<u64>, PduValue)>, SnmpError> {
        let oid = oid_from_parts(oid_parts)?;
        let mut last_error = String::new();

        for _ in 0..SNMP_RETRIES {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(SnmpError::Cancelled),
                result = timeout(SNMP_TIMEOUT, self.session.getnext(&oid)) => match result {
                    Ok(Ok(response)) => return Ok(collect_varbinds(response)),
                    Ok(Err(e)) => last_error = format!("{:?}", e),
                    Err(_) => last_error = "request timed out".to_string(),
                },
            }
        }

        Err(SnmpError::Transport(last_error))
    }

    async fn getbulk_varbinds(
        &mut self,
        oid_parts: &[u64],
    ) -> Result<Vec<(Vec<u64>, PduValue)>, SnmpError> {
        let oid = oid_from_parts(oid_parts)?;
        let mut last_error = String::new();

        for _ in 0..SNMP_RETRIES {
            let oids = [&oid];
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(SnmpError::Cancelled),
                result = timeout(
                    SNMP_TIMEOUT,
                    self.session.getbulk(&oids, 0, SNMP_BULK_MAX_REPETITIONS),
                ) => match result {
                    Ok(Ok(response)) => return Ok(collect_varbinds(response)),
                    Ok(Err(e)) => last_error = format!("{:?}", e),
                    Err(_) => last_error = "request timed out".to_string(),
                },
            }
        }

        Err(SnmpError::Transport(last_error))
    }
}

impl SnmpTransport for Snmp2Transport {
    async fn get(&mut self, oid: &[u64]) -> Result<Pdu, SnmpError> {
        let varbinds = self.get_varbinds(oid).await?;
        let (parts, value) = varbinds
            .into_iter()
            .next()
            .ok_or_else(|| SnmpError::Transport("empty response".to_string()))?;
        Ok(Pdu::new(dotted(&parts), value))
    }

    async fn walk(&mut self, subtree: &Subtree, out: &mut Vec<Pdu>) -> Result<(), SnmpError> {
        let mut current: Vec<u64> = subtree.root.to_vec();

        loop {
            let varbinds = self.getnext_varbinds(&current).await?;
            let Some((parts, value)) = varbinds.into_iter().next() else {
                return Ok(());
            };
            if !parts.starts_with(subtree.root) || matches!(value, PduValue::EndOfMibView) {
                return Ok(());
            }
            if parts == current {
                // Agent did not advance the OID; bail rather than spin.
                return Ok(());
            }
            out.push(Pdu::new(dotted(&parts), value));
            current = parts;
        }
    }

    async fn bulk_walk(&mut self, subtree: &Subtree, out: &mut Vec<Pdu>) -> Result<(), SnmpError> {
        let mut current: Vec<u64> = subtree.root.to_vec();

        loop {
            let varbinds = self.getbulk_varbinds(&current).await?;
            if varbinds.is_empty() {
                return Ok(());
            }

            let before = current.clone();
            for (parts, value) in varbinds {
                if !parts.starts_with(subtree.root) || matches!(value, PduValue::EndOfMibView) {
                    return Ok(());
                }
                out.push(Pdu::new(dotted(&parts), value));
                current = parts;
            }
            if current == before {
                return Ok(());
            }
        }
    }
}

fn oid_from_parts(parts: &[u64]) -> Result<Oid<'_>, SnmpError> {
    Oid::from(parts).map_err(|_| SnmpError::Transport(format!("invalid oid {:?}", parts)))
}

fn collect_varbinds(response: snmp2::Pdu<'_>) -> Vec<(Vec<u64>, PduValue)> {
    response
        .varbinds
        .map(|(oid, value)| (oid_components(&oid), owned_value(&value)))
        .collect()
}

fn oid_components(oid: &Oid<'_>) -> Vec<u64> {
    match oid.iter() {
        Some(iter) => iter.collect(),
        None => Vec::new(),
    }
}

fn dotted(parts: &[u64]) -> String {
    parts
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn owned_value(value: &Value<'_>) -> PduValue {
    match value {
        Value::Integer(v) => PduValue::Integer(*v),
        Value::OctetString(bytes) => PduValue::OctetString(bytes.to_vec()),
        Value::ObjectIdentifier(oid) => PduValue::ObjectIdentifier(dotted(&oid_components(oid))),
        Value::IpAddress(octets) => PduValue::IpAddress(*octets),
        Value::Counter32(v) => PduValue::Counter32(*v),
        Value::Unsigned32(v) => PduValue::Unsigned32(*v),
        Value::Timeticks(v) => PduValue::Timeticks(*v),
        Value::Counter64(v) => PduValue::Counter64(*v),
        Value::EndOfMibView => PduValue::EndOfMibView,
        _ => PduValue::Other,
    }
}

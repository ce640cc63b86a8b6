//! Typed decoding of raw PDU values
//!
//! Each decoder fails with [`DecodeError`] when the underlying value has an
//! unexpected representation. Callers treat a failure as a skipped field,
//! never as a failed walk.

use std::fmt::Write as _;
use std::net::Ipv4Addr;

use thiserror::Error;

use super::PduValue;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} out of range for {target}")]
    OutOfRange { value: i128, target: &'static str },
}

fn unexpected(expected: &'static str, value: &PduValue) -> DecodeError {
    DecodeError::UnexpectedType {
        expected,
        found: value.kind(),
    }
}

/// Direct textual value. SNMP IpAddress values render as a dotted quad,
/// matching how the deprecated ipAddrTable reports its address column.
pub fn string(value: &PduValue) -> Result<String, DecodeError> {
    match value {
        PduValue::OctetString(bytes) => Ok(String::from_utf8_lossy(bytes).to_string()),
        PduValue::IpAddress(octets) => Ok(Ipv4Addr::from(*octets).to_string()),
        PduValue::ObjectIdentifier(oid) => Ok(oid.clone()),
        other => Err(unexpected("textual value", other)),
    }
}

/// Byte sequence reinterpreted as text.
pub fn string_bytes(value: &PduValue) -> Result<String, DecodeError> {
    match value {
        PduValue::OctetString(bytes) => Ok(String::from_utf8_lossy(bytes).to_string()),
        other => Err(unexpected("OctetString", other)),
    }
}

/// Byte sequence rendered as colon-separated lowercase hex. An empty
/// sequence (interfaces without hardware addresses) decodes to "".
pub fn phys_address(value: &PduValue) -> Result<String, DecodeError> {
    let PduValue::OctetString(bytes) = value else {
        return Err(unexpected("OctetString", value));
    };

    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    Ok(out)
}

pub fn int32(value: &PduValue) -> Result<i32, DecodeError> {
    match value {
        PduValue::Integer(v) => i32::try_from(*v).map_err(|_| DecodeError::OutOfRange {
            value: i128::from(*v),
            target: "i32",
        }),
        other => Err(unexpected("Integer", other)),
    }
}

pub fn uint32(value: &PduValue) -> Result<u32, DecodeError> {
    match value {
        PduValue::Counter32(v) | PduValue::Unsigned32(v) => Ok(*v),
        PduValue::Integer(v) => u32::try_from(*v).map_err(|_| DecodeError::OutOfRange {
            value: i128::from(*v),
            target: "u32",
        }),
        other => Err(unexpected("Counter32/Unsigned32", other)),
    }
}

pub fn uint64(value: &PduValue) -> Result<u64, DecodeError> {
    match value {
        PduValue::Counter64(v) => Ok(*v),
        PduValue::Counter32(v) | PduValue::Unsigned32(v) => Ok(u64::from(*v)),
        PduValue::Integer(v) => u64::try_from(*v).map_err(|_| DecodeError::OutOfRange {
            value: i128::from(*v),
            target: "u64",
        }),
        other => Err(unexpected("Counter64", other)),
    }
}

/// TimeTicks arrive as hundredths of a second; callers get whole seconds.
pub fn time_ticks_secs(value: &PduValue) -> Result<u32, DecodeError> {
    match value {
        PduValue::Timeticks(ticks) => Ok(ticks / 100),
        other => Err(unexpected("Timeticks", other)),
    }
}

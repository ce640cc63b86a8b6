//! Retained monitoring state
//!
//! `HostState` owns its `InterfaceState` values outright; interfaces are
//! never shared across hosts and never hold a reference back to their host.
//! Everything in this module is mutated exclusively on the serialization
//! domain.

pub mod host;
pub mod interface;


use thiserror::Error;

pub use host::{HostState, fuse_reachability};
pub use interface::{InterfaceState, RATE_HISTORY_SIZE};

/// A broken internal invariant, fatal to the affected host.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct InternalViolation(pub String);

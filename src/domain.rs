//! Serialization domain
//!
//! Single-consumer FIFO of typed commands, processed by one worker task
//! that owns every `HostState`. Scan tasks never touch retained state
//! directly; they enqueue an immutable sample and the worker applies it.
//! Two samples for the same host are therefore applied in the order
//! enqueued, and events from one apply flush as an ordered batch.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::models::HostSample;
use crate::runtime::Runtime;
use crate::state::HostState;

/// Work items accepted by the domain
#[derive(Debug)]
pub enum Command {
    ApplySample { host_id: String, sample: HostSample },
}

pub struct SerializationDomain {
    tx: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<BTreeMap<String, HostState>>,
}

impl SerializationDomain {
    /// Move the host states into a new worker task and start processing.
    pub fn spawn(hosts: BTreeMap<String, HostState>, runtime: Arc<dyn Runtime>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, hosts, runtime));
        Self { tx, worker }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Command> {
        self.tx.clone()
    }

    /// Close the queue, let the worker drain what is already enqueued and
    /// hand the host states back.
    pub async fn shutdown(self) -> BTreeMap<String, HostState> {
        drop(self.tx);
        match self.worker.await {
            Ok(hosts) => hosts,
            Err(e) => {
                error!(error = %e, "serialization domain worker failed");
                BTreeMap::new()
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Command>,
    mut hosts: BTreeMap<String, HostState>,
    runtime: Arc<dyn Runtime>,
) -> BTreeMap<String, HostState> {
    while let Some(command) = rx.recv().await {
        match command {
            Command::ApplySample { host_id, sample } => {
                apply_sample(&mut hosts, &runtime, &host_id, &sample);
            }
        }
    }
    hosts
}

fn apply_sample(
    hosts: &mut BTreeMap<String, HostState>,
    runtime: &Arc<dyn Runtime>,
    host_id: &str,
    sample: &HostSample,
) {
    let Some(host) = hosts.get_mut(host_id) else {
        warn!(host_id, "sample for unknown host dropped");
        return;
    };

    debug!(host = %host.name(), timestamp = %sample.timestamp, "applying sample");

    let mut events = Vec::with_capacity(10);
    host.apply(sample, &mut events);

    if host.entity_id().is_empty() {
        if !events.is_empty() {
            debug!(host = %host.name(), count = events.len(), "host not registered, dropping events");
        }
        return;
    }

    for event in events {
        // Interfaces that never registered emit nothing.
        if event
            .interface_entity_id()
            .is_some_and(|id| id.is_empty())
        {
            continue;
        }
        if let Err(e) = runtime.broadcast(host.entity_id(), &event) {
            warn!(host = %host.name(), error = %e, "error broadcasting event");
        }
    }
}

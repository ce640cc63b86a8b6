//! Monitoring engine
//!
//! Wires configuration, the host runtime and the per-host scan tasks
//! together. `start` registers entities, spawns the serialization-domain
//! worker and one scan task per host; `stop` cancels the tasks, drains the
//! domain and deregisters everything. Both are idempotent at the surface a
//! plugin lifecycle needs.

mod supervisor;
mod task;


use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::domain::SerializationDomain;
use crate::events::Event;
use crate::runtime::{EntityId, EntityKind, EventHandler, EventPredicate, Job, Runtime};
use crate::state::{HostState, InterfaceState};

use supervisor::Supervisor;
use task::ScanTask;

pub struct Monitor {
    config: MonitorConfig,
    runtime: Arc<dyn Runtime>,
    running: Option<Running>,
}

struct Running {
    supervisor: Supervisor,
    domain: SerializationDomain,
}

impl Monitor {
    pub fn new(config: MonitorConfig, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            config,
            runtime,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Register entities and start monitoring every configured host.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            anyhow::bail!("monitor already started");
        }

        info!(hosts = self.config.hosts.len(), "starting monitor");

        let mut hosts = self.build_host_states();
        self.register_entities(&mut hosts);

        let interval = self.config.scan_interval();
        let mut supervisor = Supervisor::new();
        let scan_targets: Vec<(String, Arc<crate::config::HostConfig>)> = hosts
            .values()
            .map(|host| (host.local_id().to_string(), host.config_handle()))
            .collect();

        let domain = SerializationDomain::spawn(hosts, Arc::clone(&self.runtime));

        for (host_id, host_config) in scan_targets {
            let task = ScanTask::new(
                supervisor.child_token(),
                host_config,
                host_id,
                interval,
                domain.sender(),
            );
            supervisor.spawn(task.run());
        }

        info!(tasks = supervisor.task_count(), "monitoring tasks started");
        self.running = Some(Running { supervisor, domain });
        Ok(())
    }

    /// Stop all monitoring: cancel tasks, drain the serialization domain,
    /// deregister entities. A second call is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };

        info!("stopping monitor");
        running.supervisor.stop().await;

        let mut hosts = running.domain.shutdown().await;
        self.deregister_entities(&mut hosts);

        info!("monitor stopped");
        Ok(())
    }

    /// Build retained state for every configured host and interface, with
    /// process-local ids from a single counter.
    fn build_host_states(&self) -> BTreeMap<String, HostState> {
        let mut entity_counter = 0usize;
        let mut hosts = BTreeMap::new();

        for host_config in &self.config.hosts {
            let config = Arc::new(host_config.clone());
            entity_counter += 1;
            let host_id = format!("Host_{entity_counter}");
            let mut state = HostState::new(host_id.clone(), Arc::clone(&config));

            for (key, iface_config) in &config.interfaces {
                entity_counter += 1;
                state.add_interface(
                    key.clone(),
                    InterfaceState::new(format!("NetworkInterface_{entity_counter}"), iface_config),
                );
            }

            hosts.insert(host_id, state);
        }

        hosts
    }

    fn register_entities(&self, hosts: &mut BTreeMap<String, HostState>) {
        for host in hosts.values_mut() {
            let host_name = host.name().to_string();

            let host_entity_id = match self.runtime.register_entity(
                host.local_id(),
                EntityKind::Host,
                &host_name,
            ) {
                Ok(id) => id,
                Err(e) => {
                    warn!(host = %host_name, error = %e, "error registering host entity");
                    continue;
                }
            };

            if let Err(violation) = host.set_entity_id(host_entity_id.clone()) {
                error!(host = %host_name, error = %violation, "entity id violation, host disabled");
                continue;
            }

            for (key, iface) in host.interfaces_mut() {
                let display_name = format!("host_{}_interface_{}", host_name, key);

                let iface_entity_id = match self.runtime.register_entity(
                    iface.local_id(),
                    EntityKind::NetworkInterface,
                    &display_name,
                ) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(interface = %display_name, error = %e, "error registering interface entity");
                        continue;
                    }
                };

                if let Err(violation) = iface.set_entity_id(iface_entity_id) {
                    error!(interface = %display_name, error = %violation, "entity id violation, interface disabled");
                    continue;
                }

                self.register_configured_listeners(&host_entity_id, iface);
            }
        }
    }

    /// Route `InterfaceAddressChange` events for this interface to its
    /// configured listeners, dispatched on the runtime's external domain.
    fn register_configured_listeners(&self, host_entity_id: &EntityId, iface: &mut InterfaceState) {
        if iface.listeners().is_empty() {
            return;
        }

        let host_id = host_entity_id.clone();
        let iface_id = iface.entity_id().clone();
        let predicate: EventPredicate = Box::new(move |info| {
            info.source == host_id
                && matches!(
                    &info.event,
                    Event::InterfaceAddressChange(e) if e.interface_entity_id == iface_id
                )
        });

        let listeners = iface.listeners().to_vec();
        let scheduler = Arc::clone(&self.runtime);
        let handler: EventHandler = Box::new(move |info| {
            let Event::InterfaceAddressChange(event) = &info.event else {
                return Ok(());
            };
            let jobs: Vec<Job> = listeners
                .iter()
                .map(|listener| {
                    let listener = Arc::clone(listener);
                    let event = event.clone();
                    Box::new(move || listener(&event)) as Job
                })
                .collect();
            scheduler.enqueue_external(jobs).map_err(|e| {
                anyhow::anyhow!("error enqueuing address-change listener invocations: {e}")
            })
        });

        match self.runtime.register_event_receiver(predicate, handler) {
            Ok(handle) => iface.set_receiver_handle(handle),
            Err(e) => {
                warn!(interface = %iface.key(), error = %e, "error registering address-change receiver");
            }
        }
    }

    fn deregister_entities(&self, hosts: &mut BTreeMap<String, HostState>) {
        for host in hosts.values_mut() {
            let host_name = host.name().to_string();

            for (key, iface) in host.interfaces_mut() {
                if let Some(handle) = iface.receiver_handle() {
                    match self.runtime.deregister_event_receiver(handle) {
                        Ok(()) => iface.clear_receiver_handle(),
                        Err(e) => {
                            warn!(interface = %key, error = %e, "error deregistering address-change receiver");
                        }
                    }
                }

                if iface.entity_id().is_empty() {
                    continue;
                }
                match self.runtime.deregister_entity(iface.entity_id()) {
                    Ok(()) => iface.clear_entity_id(),
                    Err(e) => {
                        warn!(interface = %key, error = %e, "error deregistering interface entity");
                    }
                }
            }

            if host.entity_id().is_empty() {
                continue;
            }
            match self.runtime.deregister_entity(host.entity_id()) {
                Ok(()) => host.clear_entity_id(),
                Err(e) => {
                    warn!(host = %host_name, error = %e, "error deregistering host entity");
                }
            }
        }
    }
}

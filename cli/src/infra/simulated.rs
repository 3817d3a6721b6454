//! In-memory control plane for dry runs and tests.
//!
//! Models the behaviours the enablement workflow has to tolerate:
//! - transitions take several observations to complete;
//! - stop and start reissue the instance handle, and the old one is rejected;
//! - lookups fail for a while right after a transition;
//! - started instances register as servers only after a delay;
//! - chosen members boot into `stranded in booting`.
//!
//! Time is counted in observations, not wall-clock, so runs are deterministic.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;

use crate::application::ports::{
    AttributeResponse, AttributeWriter, IdentityResolver, InstanceControl, InstanceQuery,
};
use crate::domain::enablement::ServerReport;
use crate::domain::identity::SessionIdentity;
use crate::domain::instance::{CloudScope, Instance, InstanceHandle, InstanceState, ResourceUid};

/// Shape of a simulated batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSpec {
    pub instances: usize,
    /// The last `stranded` members boot into `stranded in booting`.
    pub stranded: usize,
    /// Failed lookups per instance after each stop or start.
    pub flaky_lookups: u32,
    /// Observations a state transition takes.
    pub transition_polls: u32,
    /// The first `rejected_updates` members refuse attribute updates.
    pub rejected_updates: usize,
    pub cloud: String,
    pub deployment: String,
}

impl Default for SimulationSpec {
    fn default() -> Self {
        Self {
            instances: 3,
            stranded: 0,
            flaky_lookups: 1,
            transition_polls: 2,
            rejected_updates: 0,
            cloud: "/api/clouds/1".to_string(),
            deployment: "/api/deployments/1".to_string(),
        }
    }
}

#[derive(Debug)]
struct Transition {
    target: InstanceState,
    remaining: u32,
}

#[derive(Debug)]
struct SimInstance {
    uid: ResourceUid,
    name: Option<String>,
    generation: u32,
    state: InstanceState,
    transition: Option<Transition>,
    flaky_remaining: u32,
    boots_stranded: bool,
    rejects_updates: bool,
}

impl SimInstance {
    fn handle(&self, cloud: &str) -> InstanceHandle {
        InstanceHandle::new(format!(
            "{cloud}/instances/{}-g{}",
            self.uid.as_str().to_ascii_uppercase(),
            self.generation
        ))
    }

    fn begin(&mut self, via: &str, target: InstanceState, polls: u32, flaky: u32) {
        self.generation += 1;
        self.state = InstanceState::from(via);
        self.transition = Some(Transition {
            target,
            remaining: polls,
        });
        self.flaky_remaining = flaky;
    }

    /// Advance one observation.
    fn tick(&mut self) {
        if let Some(t) = &mut self.transition {
            t.remaining = t.remaining.saturating_sub(1);
            if t.remaining == 0 {
                self.state = t.target.clone();
                self.transition = None;
            }
        }
    }
}

#[derive(Debug)]
struct PendingServer {
    name: String,
    until_visible: u32,
    until_terminal: u32,
    terminal: InstanceState,
}

#[derive(Debug, Default)]
struct World {
    instances: Vec<SimInstance>,
    servers: Vec<PendingServer>,
    user_data: BTreeMap<String, String>,
    lookup_failures: u32,
    stop_requests: u32,
    start_requests: u32,
}

/// Simulated cloud holding one batch of instances.
#[derive(Debug)]
pub struct SimulatedCloud {
    spec: SimulationSpec,
    world: Mutex<World>,
}

impl SimulatedCloud {
    /// Build a world of `spec.instances` members, booting towards
    /// `operational`.
    ///
    /// # Errors
    ///
    /// Returns an error if a generated resource UID is invalid.
    pub fn new(spec: SimulationSpec) -> Result<Self> {
        let mut instances = Vec::with_capacity(spec.instances);
        for i in 0..spec.instances {
            let uid = ResourceUid::parse(&format!("i-sim{i:04}"))?;
            let mut instance = SimInstance {
                uid,
                // Every other member is unnamed to exercise the uid fallback.
                name: (i % 2 == 0).then(|| format!("sim-{i}")),
                generation: 0,
                state: InstanceState::Operational,
                transition: None,
                flaky_remaining: 0,
                boots_stranded: i >= spec.instances.saturating_sub(spec.stranded),
                rejects_updates: i < spec.rejected_updates,
            };
            instance.begin("booting", InstanceState::Operational, spec.transition_polls, 0);
            instances.push(instance);
        }
        Ok(Self {
            spec,
            world: Mutex::new(World {
                instances,
                ..World::default()
            }),
        })
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn spec(&self) -> &SimulationSpec {
        &self.spec
    }

    /// Initial listing, as a caller would discover the batch.
    #[must_use]
    pub fn instances(&self) -> Vec<Instance> {
        let world = self.world();
        world
            .instances
            .iter()
            .map(|i| self.view(i))
            .collect()
    }

    /// User-data stored for `uid`, if any.
    #[must_use]
    pub fn user_data(&self, uid: &str) -> Option<String> {
        self.world().user_data.get(uid).cloned()
    }

    #[must_use]
    pub fn lookup_failures(&self) -> u32 {
        self.world().lookup_failures
    }

    #[must_use]
    pub fn stop_requests(&self) -> u32 {
        self.world().stop_requests
    }

    #[must_use]
    pub fn start_requests(&self) -> u32 {
        self.world().start_requests
    }

    fn view(&self, i: &SimInstance) -> Instance {
        Instance {
            resource_uid: i.uid.clone(),
            handle: i.handle(&self.spec.cloud),
            name: i.name.clone(),
            state: i.state.clone(),
            cloud: CloudScope::new(self.spec.cloud.clone()),
        }
    }

    /// Find the member addressed by a handle; stale handles are rejected.
    fn by_handle<'w>(&self, world: &'w mut World, handle: &InstanceHandle) -> Result<&'w mut SimInstance> {
        let cloud = &self.spec.cloud;
        world
            .instances
            .iter_mut()
            .find(|i| i.handle(cloud) == *handle)
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: no instance at {handle}"))
    }
}

impl InstanceControl for SimulatedCloud {
    async fn stop(&self, instances: &[Instance]) -> Result<()> {
        let mut world = self.world();
        world.stop_requests += 1;
        for instance in instances {
            let sim = self.by_handle(&mut world, &instance.handle)?;
            sim.begin(
                "decommissioning",
                InstanceState::Provisioned,
                self.spec.transition_polls,
                self.spec.flaky_lookups,
            );
        }
        Ok(())
    }

    async fn start(&self, instances: &[Instance]) -> Result<()> {
        let mut world = self.world();
        world.start_requests += 1;
        let mut registered = Vec::new();
        for instance in instances {
            let sim = self.by_handle(&mut world, &instance.handle)?;
            let terminal = if sim.boots_stranded {
                InstanceState::StrandedInBooting
            } else {
                InstanceState::Operational
            };
            sim.begin(
                "pending",
                terminal.clone(),
                self.spec.transition_polls,
                self.spec.flaky_lookups,
            );
            registered.push(PendingServer {
                name: instance.display_name().to_string(),
                until_visible: self.spec.transition_polls,
                until_terminal: self.spec.transition_polls,
                terminal,
            });
        }
        world.servers.extend(registered);
        Ok(())
    }
}

impl InstanceQuery for SimulatedCloud {
    async fn find_by_uid(&self, cloud: &CloudScope, uid: &ResourceUid) -> Result<Instance> {
        if cloud.as_str() != self.spec.cloud {
            anyhow::bail!("unknown cloud {cloud}");
        }
        let mut world = self.world();
        let World {
            instances,
            lookup_failures,
            ..
        } = &mut *world;
        let sim = instances
            .iter_mut()
            .find(|i| i.uid == *uid)
            .ok_or_else(|| anyhow::anyhow!("no instance with resource_uid {uid}"))?;
        if sim.flaky_remaining > 0 {
            sim.flaky_remaining -= 1;
            *lookup_failures += 1;
            anyhow::bail!("404 Not Found: instance {uid} is being reissued");
        }
        sim.tick();
        Ok(self.view(sim))
    }

    async fn list_servers(&self, deployment: &str) -> Result<Vec<ServerReport>> {
        if deployment != self.spec.deployment {
            anyhow::bail!("unknown deployment {deployment}");
        }
        let mut world = self.world();
        let mut visible = Vec::new();
        for server in &mut world.servers {
            if server.until_visible > 0 {
                server.until_visible -= 1;
                continue;
            }
            let state = if server.until_terminal > 0 {
                server.until_terminal -= 1;
                InstanceState::from("booting")
            } else {
                server.terminal.clone()
            };
            visible.push(ServerReport {
                name: server.name.clone(),
                state,
            });
        }
        Ok(visible)
    }
}

impl AttributeWriter for SimulatedCloud {
    async fn update_instance_attribute(
        &self,
        cloud: &CloudScope,
        uid: &ResourceUid,
        key: &str,
        value: &str,
    ) -> Result<AttributeResponse> {
        if cloud.as_str() != self.spec.cloud {
            anyhow::bail!("unknown cloud {cloud}");
        }
        let mut world = self.world();
        let sim = world
            .instances
            .iter()
            .find(|i| i.uid == *uid)
            .ok_or_else(|| anyhow::anyhow!("no instance with resource_uid {uid}"))?;
        if sim.rejects_updates {
            return Ok(AttributeResponse {
                status: 403,
                body: "Permission denied".to_string(),
            });
        }
        if sim.state != InstanceState::Provisioned {
            return Ok(AttributeResponse {
                status: 422,
                body: format!("{key} can only be changed while the instance is stopped"),
            });
        }
        world.user_data.insert(uid.to_string(), value.to_string());
        Ok(AttributeResponse {
            status: 204,
            body: String::new(),
        })
    }
}

impl IdentityResolver for SimulatedCloud {
    async fn whoami(&self) -> Result<SessionIdentity> {
        Ok(SessionIdentity {
            user_id: "1".to_string(),
            account_id: "1".to_string(),
            api_host: "us-3.rightscale.com".to_string(),
            selfservice_host: "selfservice-3.rightscale.com".to_string(),
        })
    }
}

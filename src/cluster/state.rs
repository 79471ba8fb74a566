//! Wire types for the parts of the Mesos state endpoints we consume

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterState {
    #[serde(default)]
    pub frameworks: Vec<MasterFramework>,
    #[serde(default)]
    pub slaves: Vec<MasterSlave>,
    #[serde(default)]
    pub pid: String,
    #[serde(default)]
    pub leader: String,
}

impl MasterState {
    /// A master answers authoritatively only when it is the leader itself.
    pub fn is_leader(&self) -> bool {
        !self.pid.is_empty() && self.pid == self.leader
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterFramework {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub completed_tasks: Vec<MasterTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterTask {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub slave_id: String,
    #[serde(default)]
    pub labels: Vec<MasterLabel>,
    #[serde(default)]
    pub container: Option<MasterContainer>,
    #[serde(default)]
    pub statuses: Vec<MasterTaskStatus>,
}

impl MasterTask {
    pub fn image(&self) -> String {
        self.container
            .as_ref()
            .and_then(|container| container.docker.as_ref())
            .map(|docker| docker.image.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterContainer {
    #[serde(default)]
    pub docker: Option<MasterDocker>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterDocker {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterTaskStatus {
    #[serde(default)]
    pub state: String,
    /// Seconds since the epoch, with fractional part
    #[serde(default)]
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterSlave {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "hostname")]
    pub host: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MasterLabel {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlaveState {
    #[serde(default)]
    pub frameworks: Vec<SlaveFramework>,
    #[serde(default)]
    pub completed_frameworks: Vec<SlaveFramework>,
}

impl SlaveState {
    /// Every executor the agent knows about, live and completed.
    pub fn executors(&self) -> impl Iterator<Item = &SlaveExecutor> {
        self.frameworks
            .iter()
            .chain(self.completed_frameworks.iter())
            .flat_map(|framework| {
                framework
                    .executors
                    .iter()
                    .chain(framework.completed_executors.iter())
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlaveFramework {
    #[serde(default)]
    pub executors: Vec<SlaveExecutor>,
    #[serde(default)]
    pub completed_executors: Vec<SlaveExecutor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlaveExecutor {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub directory: String,
}

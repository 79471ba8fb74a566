//! Mesos cluster reader
//!
//! Finds the leading master among the configured candidates, extracts failed
//! tasks from its state and resolves sandbox log locations on the agent that
//! ran a task.
//!
//! ```text
//! masters[0] ─┐
//! masters[1] ─┼─ first one with pid == leader ─→ completed tasks ─→ Vec<Failure>
//! masters[n] ─┘
//!
//! Failure.slave ─→ http://<slave>:5051/state ─→ executor.directory ─→ LogUrls
//! ```

pub mod state;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use crate::{Failure, LogUrls};

use self::state::{MasterState, MasterTask, SlaveState};

/// Port the Mesos agent serves its state and sandbox files on
pub const DEFAULT_AGENT_PORT: u16 = 5051;

/// Task states reported as failures
pub const FAILED_STATES: [&str; 3] = ["TASK_FAILED", "TASK_ERROR", "TASK_LOST"];

/// State substituted for tasks without any status updates
pub const UNKNOWN_STATE: &str = "UNKNOWN";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub type ClusterResult<T> = Result<T, ClusterError>;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("mesos master not found")]
    NoLeader,

    #[error("cannot find executor by ID ({0})")]
    ExecutorNotFound(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Source of failed tasks and their logs
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Failed tasks known to the leading master
    async fn failures(&self) -> ClusterResult<Vec<Failure>>;

    /// Sandbox stdout and stderr locations for a failed task
    async fn logs(&self, failure: &Failure) -> ClusterResult<LogUrls>;
}

/// Mesos cluster reached over the masters' and agents' HTTP state endpoints
#[derive(Debug, Clone)]
pub struct MesosCluster {
    masters: Vec<String>,
    agent_port: u16,
    client: reqwest::Client,
}

impl MesosCluster {
    /// Create a cluster reader for the given master URLs, tried in order.
    pub fn new(masters: Vec<String>) -> ClusterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClusterError::Client)?;

        Ok(Self {
            masters: cleanup_master_urls(&masters),
            agent_port: DEFAULT_AGENT_PORT,
            client,
        })
    }

    pub fn with_agent_port(mut self, port: u16) -> Self {
        self.agent_port = port;
        self
    }

    pub fn masters(&self) -> &[String] {
        &self.masters
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> ClusterResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ClusterError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClusterError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.json::<T>().await.map_err(|source| ClusterError::Request {
            url: url.to_string(),
            source,
        })
    }

    async fn slave_state(&self, host: &str) -> ClusterResult<SlaveState> {
        let url = format!("http://{host}:{}/state", self.agent_port);
        self.fetch(&url).await
    }

    fn sandbox_url(&self, host: &str, directory: &str, file: &str) -> String {
        format!(
            "http://{host}:{}/files/download?path={directory}/{file}",
            self.agent_port
        )
    }
}

#[async_trait]
impl ClusterReader for MesosCluster {
    #[instrument(skip(self))]
    async fn failures(&self) -> ClusterResult<Vec<Failure>> {
        for master in &self.masters {
            let url = format!("{master}/master/state");
            trace!("requesting state from {url}");

            let state: MasterState = match self.fetch(&url).await {
                Ok(state) => state,
                Err(e) => {
                    warn!("error fetching state from {master}: {e}");
                    continue;
                }
            };

            if !state.is_leader() {
                debug!("{master} is not the leader (leader is {})", state.leader);
                continue;
            }

            return Ok(failures_from_leader(&state));
        }

        Err(ClusterError::NoLeader)
    }

    #[instrument(skip(self, failure), fields(task = %failure.id, slave = %failure.slave))]
    async fn logs(&self, failure: &Failure) -> ClusterResult<LogUrls> {
        let state = self.slave_state(&failure.slave).await?;

        let executor = state
            .executors()
            .find(|executor| executor.id == failure.id)
            .ok_or_else(|| ClusterError::ExecutorNotFound(failure.id.clone()))?;

        Ok(LogUrls::new(
            self.sandbox_url(&failure.slave, &executor.directory, "stdout"),
            self.sandbox_url(&failure.slave, &executor.directory, "stderr"),
        ))
    }
}

/// Failures from the completed tasks of a leader's state.
pub fn failures_from_leader(state: &MasterState) -> Vec<Failure> {
    let hosts: HashMap<&str, &str> = state
        .slaves
        .iter()
        .map(|slave| (slave.id.as_str(), slave.host.as_str()))
        .collect();

    state
        .frameworks
        .iter()
        .flat_map(|framework| {
            framework
                .completed_tasks
                .iter()
                .filter(|task| FAILED_STATES.contains(&task.state.as_str()))
                .map(|task| failure_from_task(&framework.name, task, &hosts))
        })
        .collect()
}

fn failure_from_task(framework: &str, task: &MasterTask, hosts: &HashMap<&str, &str>) -> Failure {
    let labels = task
        .labels
        .iter()
        .map(|label| (label.key.clone(), label.value.clone()))
        .collect();

    let (state, started, finished) = match (task.statuses.first(), task.statuses.last()) {
        (Some(first), Some(last)) => (
            last.state.clone(),
            timestamp(first.timestamp),
            timestamp(last.timestamp),
        ),
        _ => (
            UNKNOWN_STATE.to_string(),
            DateTime::<Utc>::UNIX_EPOCH,
            DateTime::<Utc>::UNIX_EPOCH,
        ),
    };

    Failure {
        id: task.id.clone(),
        name: task.name.clone(),
        slave: hosts
            .get(task.slave_id.as_str())
            .map(|host| host.to_string())
            .unwrap_or_default(),
        framework: framework.to_string(),
        image: task.image(),
        state,
        started,
        finished,
        labels,
    }
}

fn timestamp(seconds: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis((seconds * 1000.0) as i64).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Trim, validate and strip trailing slashes from master URLs.
///
/// Entries that are empty or do not parse as URLs are dropped.
pub fn cleanup_master_urls(urls: &[String]) -> Vec<String> {
    urls.iter()
        .map(|candidate| candidate.trim())
        .filter(|candidate| !candidate.is_empty())
        .filter(|candidate| url::Url::parse(candidate).is_ok())
        .map(|candidate| candidate.trim_end_matches('/').to_string())
        .collect()
}

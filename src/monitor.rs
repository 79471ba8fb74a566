//! Monitor - routes freshly failed tasks to the configured reporters
//!
//! ## Tick
//!
//! ```text
//! cluster.failures() ─→ matcher ─→ recent window ─→ freshness ─→ cold start
//!                                                                    │
//!      reporter.report() × instance  ←─ uploader ←─ cluster.logs() ←─┘
//! ```
//!
//! Every task id is remembered (with its finish time) the first time it is
//! seen, whether it gets reported or not, and forgotten once it finished more
//! than [`RETENTION`] ago. Only tasks that finished less than half of the
//! retention ago are reported, and nothing is reported from the very first
//! successful tick so a restart does not replay the cluster's history.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::Failure;
use crate::cluster::ClusterReader;
use crate::labels::Labels;
use crate::matcher::{FailureMatcher, NoopMatcher};
use crate::reporters::Reporter;
use crate::uploaders::Uploader;

/// How long a seen task id is remembered
pub const RETENTION: Duration = Duration::from_secs(60);

/// Last cluster read error, shared with the health endpoint
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    error: Arc<RwLock<Option<String>>>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, error: Option<String>) {
        *self.error.write().await = error;
    }

    pub async fn error(&self) -> Option<String> {
        self.error.read().await.clone()
    }
}

pub struct Monitor {
    name: String,
    cluster: Arc<dyn ClusterReader>,
    uploader: Arc<dyn Uploader>,
    reporters: BTreeMap<String, Arc<dyn Reporter>>,
    matcher: Box<dyn FailureMatcher>,
    defaults: bool,

    /// Task id → finish time of every task seen within the retention
    recent: HashMap<String, DateTime<Utc>>,

    /// Set until the first successful tick completed
    cold_start: bool,

    health: HealthStatus,
}

impl Monitor {
    pub fn new(
        name: impl Into<String>,
        cluster: Arc<dyn ClusterReader>,
        uploader: Arc<dyn Uploader>,
        reporters: BTreeMap<String, Arc<dyn Reporter>>,
        defaults: bool,
    ) -> Self {
        Self {
            name: name.into(),
            cluster,
            uploader,
            reporters,
            matcher: Box::new(NoopMatcher),
            defaults,
            recent: HashMap::new(),
            cold_start: true,
            health: HealthStatus::new(),
        }
    }

    pub fn with_matcher(mut self, matcher: Box<dyn FailureMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Health status updated by every tick
    pub fn health(&self) -> HealthStatus {
        self.health.clone()
    }

    /// Number of task ids currently remembered
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Run one tick across the failed tasks and report new failures.
    ///
    /// Only a failed cluster read is returned as an error, problems while
    /// reporting a single failure are logged.
    #[instrument(skip(self), fields(complainer = %self.name))]
    pub async fn run(&mut self) -> Result<()> {
        let failures = match self.cluster.failures().await {
            Ok(failures) => failures,
            Err(e) => {
                self.health.set(Some(e.to_string())).await;
                return Err(e).context("failed to read failures from mesos");
            }
        };
        self.health.set(None).await;

        let now = Utc::now();
        let cold_start = std::mem::replace(&mut self.cold_start, false);
        if cold_start {
            info!(
                "first successful poll, remembering {} failures without reporting",
                failures.len()
            );
        }

        let fresh: Vec<&Failure> = failures
            .iter()
            .filter(|failure| self.check_failure(failure, now, cold_start))
            .collect();

        let results = join_all(fresh.iter().map(|failure| self.process_failure(failure))).await;
        for (failure, result) in fresh.iter().zip(results) {
            if let Err(e) = result {
                error!("error reporting failure of {}: {e:#}", failure.id);
            }
        }

        self.cleanup_recent(now);

        Ok(())
    }

    /// Remember the failure and decide whether it should be reported now.
    fn check_failure(&mut self, failure: &Failure, now: DateTime<Utc>, cold_start: bool) -> bool {
        if !self.matcher.matches(&failure.framework) {
            debug!("framework {} of {failure} is filtered out", failure.framework);
            return false;
        }

        if self.recent.contains_key(&failure.id) {
            return false;
        }

        self.recent.insert(failure.id.clone(), failure.finished);

        if age(now, failure.finished) > RETENTION / 2 {
            debug!("{failure} finished too long ago, not reporting");
            return false;
        }

        !cold_start
    }

    async fn process_failure(&self, failure: &Failure) -> Result<()> {
        let labels = Labels::new(&self.name, &failure.labels, self.defaults);

        let targets: Vec<(&str, &Arc<dyn Reporter>, Vec<String>)> = self
            .reporters
            .iter()
            .map(|(name, reporter)| (name.as_str(), reporter, labels.instances(name)))
            .collect();

        if targets.iter().all(|(_, _, instances)| instances.is_empty()) {
            info!("skipping {failure}, no reporter instances for {labels}");
            return Ok(());
        }

        info!("reporting {failure}");

        let logs = self
            .cluster
            .logs(failure)
            .await
            .context("cannot get stdout and stderr urls from mesos")?;

        let logs = self
            .uploader
            .upload(failure, logs)
            .await
            .context("cannot get stdout and stderr urls from uploader")?;

        for (name, reporter, instances) in &targets {
            for instance in instances {
                let config = labels.provider(name, instance);
                if let Err(e) = reporter.report(failure, &config, &logs).await {
                    warn!(
                        "cannot generate report with {name} [instance={instance}] for task with ID {}: {e:#}",
                        failure.id
                    );
                }
            }
        }

        Ok(())
    }

    /// Forget task ids that finished more than [`RETENTION`] before `now`.
    pub fn cleanup_recent(&mut self, now: DateTime<Utc>) {
        self.recent
            .retain(|_, finished| age(now, *finished) <= RETENTION);
    }
}

fn age(now: DateTime<Utc>, then: DateTime<Utc>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}

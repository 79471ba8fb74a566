//! Sentry reporter speaking the store endpoint of the Sentry HTTP API

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use url::Url;

use super::Reporter;
use crate::labels::ConfigProvider;
use crate::{Failure, LogUrls};

const SENTRY_CLIENT: &str = concat!("complainer/", env!("CARGO_PKG_VERSION"));

/// Parsed Sentry DSN: `https://<public>[:<secret>]@<host>/<project>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    public_key: String,
    secret_key: Option<String>,
    store_url: String,
}

impl Dsn {
    pub fn parse(dsn: &str) -> Result<Self> {
        let url = Url::parse(dsn).with_context(|| format!("invalid sentry dsn {dsn:?}"))?;

        let public_key = url.username().to_string();
        if public_key.is_empty() {
            bail!("sentry dsn {dsn:?} has no public key");
        }

        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("sentry dsn {dsn:?} has no host"))?;

        let path = url.path().trim_matches('/');
        let (prefix, project) = match path.rsplit_once('/') {
            Some((prefix, project)) => (format!("/{prefix}"), project),
            None => (String::new(), path),
        };
        if project.is_empty() {
            bail!("sentry dsn {dsn:?} has no project id");
        }

        let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();

        Ok(Self {
            public_key,
            secret_key: url.password().map(str::to_string),
            store_url: format!(
                "{}://{host}{port}{prefix}/api/{project}/store/",
                url.scheme()
            ),
        })
    }

    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    fn auth_header(&self) -> String {
        let mut header = format!(
            "Sentry sentry_version=7, sentry_client={SENTRY_CLIENT}, sentry_timestamp={}, sentry_key={}",
            Utc::now().timestamp(),
            self.public_key
        );
        if let Some(secret) = &self.secret_key {
            header.push_str(&format!(", sentry_secret={secret}"));
        }
        header
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: String,
    pub level: &'static str,
    pub platform: &'static str,
    pub logger: &'static str,
    pub server_name: String,
    pub message: String,
    pub tags: BTreeMap<String, String>,
    pub extra: BTreeMap<String, Value>,
}

/// Sends failures as Sentry events
#[derive(Debug, Clone)]
pub struct SentryReporter {
    client: Client,
    dsn: String,
}

impl SentryReporter {
    pub fn new(client: Client, dsn: impl Into<String>) -> Result<Self> {
        let dsn = dsn.into();
        if !dsn.is_empty() {
            Dsn::parse(&dsn)?;
        }

        Ok(Self { client, dsn })
    }

    pub fn build_event(failure: &Failure, logs: &LogUrls) -> Event {
        let mut extra = BTreeMap::from([
            ("task.id".to_string(), json!(failure.id)),
            (
                "timings.lifetime".to_string(),
                json!(format!("{}s", (failure.finished - failure.started).num_seconds())),
            ),
            (
                "timings.started".to_string(),
                json!(failure.started.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ),
            (
                "timings.finished".to_string(),
                json!(failure.finished.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ),
            ("logs.stdout".to_string(), json!(logs.stdout)),
            ("logs.stderr".to_string(), json!(logs.stderr)),
        ]);

        for (key, value) in &failure.labels {
            extra.insert(format!("labels.{key}"), json!(value));
        }

        Event {
            event_id: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            level: "error",
            platform: "other",
            logger: "complainer",
            server_name: failure.slave.clone(),
            message: format!("Task {} died with status {}", failure.name, failure.state),
            tags: BTreeMap::from([("task_state".to_string(), failure.state.clone())]),
            extra,
        }
    }
}

#[async_trait]
impl Reporter for SentryReporter {
    #[instrument(skip_all, fields(task = %failure.id, instance = %config.instance()))]
    async fn report(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> Result<()> {
        let dsn = config.get_or("dsn", &self.dsn);
        if dsn.is_empty() {
            debug!("no sentry dsn configured, skipping");
            return Ok(());
        }

        let dsn = Dsn::parse(&dsn)?;
        let event = Self::build_event(failure, logs);

        let response = self
            .client
            .post(dsn.store_url())
            .header("X-Sentry-Auth", dsn.auth_header())
            .json(&event)
            .send()
            .await
            .context("failed to send sentry event")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("sentry rejected event with status {status}: {body}");
        }

        info!(event_id = %event.event_id, "sent sentry event");
        Ok(())
    }
}

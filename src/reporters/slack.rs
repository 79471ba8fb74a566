use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::Reporter;
use crate::labels::ConfigProvider;
use crate::{Failure, LogUrls};

/// Command line defaults for the Slack reporter
#[derive(Debug, Clone, Default)]
pub struct SlackDefaults {
    pub hook_url: String,
    pub username: String,
    pub channel: String,
    pub icon_emoji: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlackMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon_emoji: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon_url: String,
}

/// Posts failures to a Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackReporter {
    client: Client,
    defaults: SlackDefaults,
}

impl SlackReporter {
    pub fn new(client: Client, defaults: SlackDefaults) -> Result<Self> {
        if !defaults.hook_url.is_empty() {
            url::Url::parse(&defaults.hook_url).context("invalid slack hook url")?;
        }

        Ok(Self { client, defaults })
    }

    pub fn build_message(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> SlackMessage {
        SlackMessage {
            channel: config.get_or("channel", &self.defaults.channel),
            username: config.get_or("username", &self.defaults.username),
            text: format!(
                "Task {} ({}) died with status {} [<{}|stdout>, <{}|stderr>]",
                failure.name, failure.slave, failure.state, logs.stdout, logs.stderr
            ),
            icon_emoji: config.get_or("icon_emoji", &self.defaults.icon_emoji),
            icon_url: config.get_or("icon_url", &self.defaults.icon_url),
        }
    }
}

#[async_trait]
impl Reporter for SlackReporter {
    #[instrument(skip_all, fields(task = %failure.id, instance = %config.instance()))]
    async fn report(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> Result<()> {
        let hook_url = config.get_or("hook_url", &self.defaults.hook_url);
        if hook_url.is_empty() {
            debug!("no slack hook url configured, skipping");
            return Ok(());
        }

        let hook_url = url::Url::parse(&hook_url).context("invalid slack hook url")?;
        let message = self.build_message(failure, config, logs);

        let response = self
            .client
            .post(hook_url)
            .json(&message)
            .send()
            .await
            .context("failed to send slack message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("slack webhook failed with status {status}: {body}");
        }

        info!("successfully sent slack message");
        Ok(())
    }
}

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::Reporter;
use crate::labels::ConfigProvider;
use crate::{Failure, LogUrls};

const FAILURE_COLOR: u32 = 15158332; // Red

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Command line defaults for the Discord reporter
#[derive(Debug, Clone, Default)]
pub struct DiscordDefaults {
    pub url: String,
    pub user_id: String,
}

/// Posts failures as embeds to a Discord webhook
#[derive(Debug, Clone)]
pub struct DiscordReporter {
    client: Client,
    defaults: DiscordDefaults,
}

impl DiscordReporter {
    pub fn new(client: Client, defaults: DiscordDefaults) -> Self {
        Self { client, defaults }
    }

    pub fn build_failure_embed(&self, failure: &Failure, logs: &LogUrls) -> Embed {
        let lifetime = failure.finished - failure.started;

        Embed {
            title: Some("💥 Task Failed".to_string()),
            description: Some(format!(
                "Task **{}** died with status `{}`",
                failure.name, failure.state
            )),
            color: Some(FAILURE_COLOR),
            fields: vec![
                EmbedField {
                    name: "🆔 Task".to_string(),
                    value: failure.id.clone(),
                    inline: false,
                },
                EmbedField {
                    name: "🖥️ Host".to_string(),
                    value: failure.slave.clone(),
                    inline: true,
                },
                EmbedField {
                    name: "⏱️ Lifetime".to_string(),
                    value: format!("{}s", lifetime.num_seconds()),
                    inline: true,
                },
                EmbedField {
                    name: "📜 Logs".to_string(),
                    value: format!("[stdout]({}) | [stderr]({})", logs.stdout, logs.stderr),
                    inline: false,
                },
            ],
            footer: Some(EmbedFooter {
                text: format!("Framework: {} | {}", failure.framework, failure.image),
            }),
            timestamp: Some(
                failure
                    .finished
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        }
    }

    pub fn build_message(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> Message {
        let mut builder = MessageBuilder::new().add_embed(self.build_failure_embed(failure, logs));

        let user_id = config.get_or("user_id", &self.defaults.user_id);
        if !user_id.is_empty() {
            builder = builder.content(format!("💥 ({} ~ {}) <@{user_id}>", failure.name, failure.state));
        }

        builder.build()
    }
}

#[async_trait]
impl Reporter for DiscordReporter {
    #[instrument(skip_all, fields(task = %failure.id, instance = %config.instance()))]
    async fn report(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> Result<()> {
        let url = config.get_or("url", &self.defaults.url);
        if url.is_empty() {
            debug!("no discord webhook configured, skipping");
            return Ok(());
        }

        let message = self.build_message(failure, config, logs);

        let response = self
            .client
            .post(&url)
            .json(&message)
            .send()
            .await
            .context("failed to send Discord message")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Discord message failed with status {status}: {body}");
        }

        info!("successfully sent Discord message");
        Ok(())
    }
}

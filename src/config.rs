use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser};
use tracing::level_filters::LevelFilter;
use tracing::trace;

use crate::cluster::{MesosCluster, cleanup_master_urls};
use crate::labels::DEFAULT_NAME;
use crate::matcher::{FailureMatcher, matcher_from_patterns};
use crate::reporters::discord::DiscordDefaults;
use crate::reporters::slack::SlackDefaults;
use crate::reporters::{DiscordReporter, FileReporter, Reporter, SentryReporter, SlackReporter, file};
use crate::uploaders::{LocalUploader, NoopUploader, Uploader};
use crate::util::{get_listen_addr, parse_listen_addr};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Reports failed Mesos tasks to the configured reporters
#[derive(Debug, Clone, Parser)]
#[command(name = "complainer", version)]
pub struct Config {
    /// Complainer name used to namespace task labels
    #[arg(long, env = "COMPLAINER_NAME", default_value = DEFAULT_NAME)]
    pub name: String,

    /// Whether unlabelled tasks go to the default instance of every reporter
    #[arg(long = "default", env = "COMPLAINER_DEFAULT", default_value_t = true, action = ArgAction::Set)]
    pub defaults: bool,

    /// Uploader to use (noop, local)
    #[arg(long, env = "COMPLAINER_UPLOADER")]
    pub uploader: String,

    /// Reporters to use (file, slack, discord, sentry)
    #[arg(long, env = "COMPLAINER_REPORTERS", value_delimiter = ',', required = true)]
    pub reporters: Vec<String>,

    /// Master urls: http://host:port,http://host:port
    #[arg(long, env = "COMPLAINER_MASTERS", value_delimiter = ',', required = true)]
    pub masters: Vec<String>,

    /// Health endpoint listen address (host:port or :port), falls back to 0.0.0.0:$PORT
    #[arg(long, env = "COMPLAINER_LISTEN", value_parser = parse_listen_addr)]
    pub listen: Option<SocketAddr>,

    /// Seconds between two polls of the cluster
    #[arg(long, env = "COMPLAINER_INTERVAL", default_value_t = 5)]
    pub interval: u64,

    /// Only report frameworks matching one of these patterns
    #[arg(long, env = "COMPLAINER_FRAMEWORKS_ALLOW", value_delimiter = ',')]
    pub frameworks_allow: Vec<String>,

    /// Never report frameworks matching one of these patterns
    #[arg(long, env = "COMPLAINER_FRAMEWORKS_DENY", value_delimiter = ',')]
    pub frameworks_deny: Vec<String>,

    #[arg(long, env = "COMPLAINER_LOG_LEVEL", default_value_t = LevelFilter::INFO)]
    pub log_level: LevelFilter,

    #[command(flatten)]
    pub file: FileArgs,

    #[command(flatten)]
    pub slack: SlackArgs,

    #[command(flatten)]
    pub discord: DiscordArgs,

    #[command(flatten)]
    pub sentry: SentryArgs,

    #[command(flatten)]
    pub local: LocalArgs,
}

#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    /// File to log failures to
    #[arg(long = "file-name", env = "FILE_NAME", default_value = file::DEFAULT_FILE)]
    pub path: PathBuf,

    /// Log format
    #[arg(long = "file-format", env = "FILE_FORMAT", default_value = file::DEFAULT_FORMAT)]
    pub format: String,
}

#[derive(Debug, Clone, Args)]
pub struct SlackArgs {
    /// Default slack webhook url
    #[arg(long = "slack-hook-url", env = "SLACK_HOOK_URL", default_value_t)]
    pub hook_url: String,

    /// Default slack username
    #[arg(long = "slack-username", env = "SLACK_USERNAME", default_value_t)]
    pub username: String,

    /// Default slack channel
    #[arg(long = "slack-channel", env = "SLACK_CHANNEL", default_value_t)]
    pub channel: String,

    /// Default slack user icon emoji
    #[arg(long = "slack-icon-emoji", env = "SLACK_ICON_EMOJI", default_value_t)]
    pub icon_emoji: String,

    /// Default slack user icon url
    #[arg(long = "slack-icon-url", env = "SLACK_ICON_URL", default_value_t)]
    pub icon_url: String,
}

#[derive(Debug, Clone, Args)]
pub struct DiscordArgs {
    /// Default discord webhook url
    #[arg(long = "discord-url", env = "DISCORD_URL", default_value_t)]
    pub url: String,

    /// Default discord user to mention
    #[arg(long = "discord-user-id", env = "DISCORD_USER_ID", default_value_t)]
    pub user_id: String,
}

#[derive(Debug, Clone, Args)]
pub struct SentryArgs {
    /// Default sentry dsn
    #[arg(long = "sentry-dsn", env = "SENTRY_DSN", default_value_t)]
    pub dsn: String,
}

#[derive(Debug, Clone, Args)]
pub struct LocalArgs {
    /// Directory the local uploader stores logs in
    #[arg(long = "local-root", env = "LOCAL_ROOT")]
    pub root: Option<PathBuf>,

    /// Url the local uploader's directory is served under
    #[arg(long = "local-base-url", env = "LOCAL_BASE_URL", default_value_t)]
    pub base_url: String,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }

    pub fn listen_addr(&self) -> Option<SocketAddr> {
        get_listen_addr(self.listen)
    }

    pub fn cluster(&self) -> Result<MesosCluster> {
        let masters = cleanup_master_urls(&self.masters);
        if masters.is_empty() {
            bail!("after URL cleanup, there is no Mesos master left over, please check the masters argument");
        }

        MesosCluster::new(masters).context("cannot create mesos cluster")
    }

    pub fn matcher(&self) -> Result<Box<dyn FailureMatcher>> {
        matcher_from_patterns(&self.frameworks_allow, &self.frameworks_deny)
    }

    pub fn uploader(&self, client: &reqwest::Client) -> Result<Arc<dyn Uploader>> {
        match self.uploader.trim() {
            "noop" => Ok(Arc::new(NoopUploader)),
            "local" => {
                let root = self
                    .local
                    .root
                    .clone()
                    .context("local uploader needs --local-root")?;
                Ok(Arc::new(LocalUploader::new(
                    client.clone(),
                    root,
                    &self.local.base_url,
                )?))
            }
            other => bail!("unknown uploader {other:?}"),
        }
    }

    pub async fn reporters(
        &self,
        client: &reqwest::Client,
    ) -> Result<BTreeMap<String, Arc<dyn Reporter>>> {
        let mut reporters: BTreeMap<String, Arc<dyn Reporter>> = BTreeMap::new();

        for name in self.reporters.iter().map(|name| name.trim()) {
            if name.is_empty() || reporters.contains_key(name) {
                continue;
            }

            let reporter: Arc<dyn Reporter> = match name {
                "file" => Arc::new(
                    FileReporter::new(&self.file.path, &self.file.format)
                        .await
                        .context("cannot create file reporter")?,
                ),
                "slack" => Arc::new(
                    SlackReporter::new(
                        client.clone(),
                        SlackDefaults {
                            hook_url: self.slack.hook_url.clone(),
                            username: self.slack.username.clone(),
                            channel: self.slack.channel.clone(),
                            icon_emoji: self.slack.icon_emoji.clone(),
                            icon_url: self.slack.icon_url.clone(),
                        },
                    )
                    .context("cannot create slack reporter")?,
                ),
                "discord" => Arc::new(DiscordReporter::new(
                    client.clone(),
                    DiscordDefaults {
                        url: self.discord.url.clone(),
                        user_id: self.discord.user_id.clone(),
                    },
                )),
                "sentry" => Arc::new(
                    SentryReporter::new(client.clone(), self.sentry.dsn.clone())
                        .context("cannot create sentry reporter")?,
                ),
                other => bail!("unknown reporter {other:?}"),
            };

            reporters.insert(name.to_string(), reporter);
        }

        if reporters.is_empty() {
            bail!("no reporters configured");
        }

        trace!("configured reporters: {:?}", reporters.keys().collect::<Vec<_>>());
        Ok(reporters)
    }
}

/// HTTP client shared by reporters and uploaders
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

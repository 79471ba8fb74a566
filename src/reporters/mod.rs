//! Reporters deliver a failure to an external system.
//!
//! Every reporter is constructed once at startup from command line defaults
//! and is then invoked once per configured instance of a failed task, with the
//! instance's label configuration layered on top of those defaults.

pub mod discord;
pub mod file;
pub mod sentry;
pub mod slack;
pub mod template;

use async_trait::async_trait;

use crate::labels::ConfigProvider;
use crate::{Failure, LogUrls};

pub use discord::DiscordReporter;
pub use file::FileReporter;
pub use sentry::SentryReporter;
pub use slack::SlackReporter;

#[async_trait]
pub trait Reporter: Send + Sync {
    /// Deliver one failure.
    ///
    /// Reporters that lack a required setting for this instance succeed
    /// without sending anything, not every reporter has to be configured
    /// for every task.
    async fn report(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> anyhow::Result<()>;
}

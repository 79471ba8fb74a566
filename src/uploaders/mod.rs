//! Uploaders copy task logs somewhere durable before they are reported.
//!
//! Mesos agents garbage collect sandboxes, so links straight into a sandbox
//! stop working eventually. An uploader receives the sandbox URLs and returns
//! the URLs that reporters should link to instead.
//!
//! [`LocalUploader`] uses the key layout of an S3 bucket store and expects the
//! directory to be served by a static file server. There is no S3 backend.

pub mod local;
pub mod noop;

use async_trait::async_trait;

use crate::{Failure, LogUrls};

pub use local::LocalUploader;
pub use noop::NoopUploader;

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, failure: &Failure, logs: LogUrls) -> anyhow::Result<LogUrls>;
}

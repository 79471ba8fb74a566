use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use tracing::{debug, instrument, trace};
use url::Url;

use super::Uploader;
use crate::{Failure, LogUrls};

/// Stores logs below a local directory that is served under `base_url`
///
/// Layout: `<root>/complainer/<task name>/<finished>-<task id>/{stdout,stderr}`
#[derive(Debug, Clone)]
pub struct LocalUploader {
    client: Client,
    root: PathBuf,
    base_url: Url,
}

impl LocalUploader {
    pub fn new(client: Client, root: impl Into<PathBuf>, base_url: &str) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            bail!("local uploader needs a root directory");
        }
        if base_url.is_empty() {
            bail!("local uploader needs a base url");
        }

        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid base url {base_url:?}"))?;
        if base_url.cannot_be_a_base() {
            bail!("base url {base_url} cannot hold a path");
        }

        Ok(Self {
            client,
            root,
            base_url,
        })
    }

    /// Key segments of a task's log directory, each a single path component
    fn prefix(failure: &Failure) -> Vec<String> {
        vec![
            "complainer".to_string(),
            path_component(&failure.name),
            path_component(&format!(
                "{}-{}",
                failure.finished.to_rfc3339_opts(SecondsFormat::Secs, true),
                failure.id
            )),
        ]
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        trace!("downloading {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to download {url}"))?;

        if !response.status().is_success() {
            bail!("failed to download {url}: status {}", response.status());
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;

        Ok(body.to_vec())
    }

    fn url_for(&self, key: &[String]) -> Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("base url {} cannot hold a path", self.base_url))?
            .pop_if_empty()
            .extend(key);
        Ok(url.to_string())
    }

    async fn store(&self, key: &[String], source: &str) -> Result<String> {
        let content = self.download(source).await?;

        let path = key.iter().fold(self.root.clone(), |path, segment| path.join(segment));
        if let Some(parent) = path.parent() {
            create_dir(parent).await?;
        }

        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!("stored {source} at {}", path.display());
        self.url_for(key)
    }
}

/// Turn a task-provided value into one path component that stays below its parent.
fn path_component(value: &str) -> String {
    let component: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match component.as_str() {
        "" | "." | ".." => "_".repeat(component.len().max(1)),
        _ => component,
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))
}

#[async_trait]
impl Uploader for LocalUploader {
    async fn upload(&self, failure: &Failure, logs: LogUrls) -> Result<LogUrls> {
        let prefix = Self::prefix(failure);
        let key = |file: &str| {
            let mut key = prefix.clone();
            key.push(file.to_string());
            key
        };

        let stdout = self.store(&key("stdout"), &logs.stdout).await?;
        let stderr = self.store(&key("stderr"), &logs.stderr).await?;

        Ok(LogUrls { stdout, stderr })
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::Reporter;
use super::template::Template;
use crate::labels::ConfigProvider;
use crate::{Failure, LogUrls};

pub const DEFAULT_FILE: &str = "/dev/stderr";

pub const DEFAULT_FORMAT: &str =
    "Task {failure.name} ({failure.id}) died with status {failure.state}:{nl}  * {stdout}{nl}  * {stderr}{nl}";

/// Appends one rendered line per failure to a file
#[derive(Debug)]
pub struct FileReporter {
    path: PathBuf,
    file: Mutex<File>,
    template: Template,
}

impl FileReporter {
    pub async fn new(path: impl AsRef<Path>, format: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            template: Template::parse(format)?,
        })
    }
}

#[async_trait]
impl Reporter for FileReporter {
    #[instrument(skip_all, fields(task = %failure.id, file = %self.path.display()))]
    async fn report(
        &self,
        failure: &Failure,
        config: &ConfigProvider<'_>,
        logs: &LogUrls,
    ) -> Result<()> {
        let line = self.template.render(failure, config, logs);

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .context("failed to write report")?;
        file.flush().await.context("failed to flush report")?;

        debug!("wrote report");
        Ok(())
    }
}

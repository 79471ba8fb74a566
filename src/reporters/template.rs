//! Minimal placeholder templates for report text
//!
//! Supported placeholders: `{failure.<field>}`, `{stdout}`, `{stderr}`,
//! `{nl}` and `{config.<key>}`.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use chrono::SecondsFormat;
use regex::{Captures, Regex};

use crate::labels::ConfigProvider;
use crate::{Failure, LogUrls};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*([a-z_]+(?:\.[A-Za-z0-9_]+)?)\s*\}").unwrap());

const FAILURE_FIELDS: [&str; 8] = [
    "id",
    "name",
    "slave",
    "framework",
    "image",
    "state",
    "started",
    "finished",
];

#[derive(Debug, Clone)]
pub struct Template {
    format: String,
}

impl Template {
    /// Validate every placeholder in `format`
    pub fn parse(format: impl Into<String>) -> Result<Self> {
        let format = format.into();

        for captures in PLACEHOLDER.captures_iter(&format) {
            let placeholder = &captures[1];
            if !is_known(placeholder) {
                bail!("unknown template placeholder {{{placeholder}}} in {format:?}");
            }
        }

        Ok(Self { format })
    }

    pub fn render(&self, failure: &Failure, config: &ConfigProvider<'_>, logs: &LogUrls) -> String {
        PLACEHOLDER
            .replace_all(&self.format, |captures: &Captures| {
                let placeholder = &captures[1];
                match placeholder.split_once('.') {
                    Some(("failure", field)) => failure_field(failure, field),
                    Some(("config", key)) => config.get(key),
                    _ => match placeholder {
                        "stdout" => logs.stdout.clone(),
                        "stderr" => logs.stderr.clone(),
                        "nl" => "\n".to_string(),
                        // parse() rejects everything else
                        _ => captures[0].to_string(),
                    },
                }
            })
            .into_owned()
    }
}

fn is_known(placeholder: &str) -> bool {
    match placeholder.split_once('.') {
        Some(("failure", field)) => FAILURE_FIELDS.contains(&field),
        Some(("config", key)) => !key.is_empty(),
        Some(_) => false,
        None => matches!(placeholder, "stdout" | "stderr" | "nl"),
    }
}

fn failure_field(failure: &Failure, field: &str) -> String {
    match field {
        "id" => failure.id.clone(),
        "name" => failure.name.clone(),
        "slave" => failure.slave.clone(),
        "framework" => failure.framework.clone(),
        "image" => failure.image.clone(),
        "state" => failure.state.clone(),
        "started" => failure.started.to_rfc3339_opts(SecondsFormat::Secs, true),
        "finished" => failure.finished.to_rfc3339_opts(SecondsFormat::Secs, true),
        _ => String::new(),
    }
}

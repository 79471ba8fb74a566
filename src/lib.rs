pub mod api;
pub mod cluster;
pub mod config;
pub mod labels;
pub mod matcher;
pub mod monitor;
pub mod reporters;
pub mod uploaders;
pub mod util;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A failed Mesos task, as read from the leading master's state.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub id: String,
    pub name: String,
    pub slave: String,
    pub framework: String,
    pub image: String,
    pub state: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub labels: HashMap<String, String>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) from {}", self.name, self.id, self.slave)
    }
}

/// Locations of a task's stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogUrls {
    pub stdout: String,
    pub stderr: String,
}

impl LogUrls {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

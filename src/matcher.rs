//! Framework name filtering
//!
//! Deny patterns always win. When no allow pattern is configured every
//! framework that is not denied passes.

use anyhow::{Context, Result};
use regex::Regex;

/// Decides whether failures of a framework should be reported
pub trait FailureMatcher: Send + Sync {
    fn matches(&self, framework: &str) -> bool;
}

/// Matcher that lets everything through
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMatcher;

impl FailureMatcher for NoopMatcher {
    fn matches(&self, _framework: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegexMatcher {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl RegexMatcher {
    pub fn new(allow: Vec<Regex>, deny: Vec<Regex>) -> Self {
        Self { allow, deny }
    }

    /// Compile allow and deny patterns
    pub fn from_patterns<S: AsRef<str>>(allow: &[S], deny: &[S]) -> Result<Self> {
        Ok(Self::new(compile(allow)?, compile(deny)?))
    }
}

impl FailureMatcher for RegexMatcher {
    fn matches(&self, framework: &str) -> bool {
        if self.deny.iter().any(|regex| regex.is_match(framework)) {
            return false;
        }

        if self.allow.iter().any(|regex| regex.is_match(framework)) {
            return true;
        }

        self.allow.is_empty()
    }
}

/// Build the matcher for the configured patterns, falling back to
/// [`NoopMatcher`] when nothing is configured.
pub fn matcher_from_patterns<S: AsRef<str>>(
    allow: &[S],
    deny: &[S],
) -> Result<Box<dyn FailureMatcher>> {
    if allow.is_empty() && deny.is_empty() {
        return Ok(Box::new(NoopMatcher));
    }

    Ok(Box::new(RegexMatcher::from_patterns(allow, deny)?))
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern).with_context(|| format!("invalid framework pattern {pattern:?}"))
        })
        .collect()
}

//! Environment variable expansion in configuration strings.
//!
//! Supports `$NAME` and `${NAME}` where `NAME` matches
//! `[A-Za-z_][A-Za-z0-9_]*`. The environment is captured once when the
//! resolver is built and never re-read.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{ConfigError, Result};

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable pattern is a valid regex")
});

/// Expands `$VAR` references against a fixed environment snapshot.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    env: HashMap<String, String>,
}

impl EnvResolver {
    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        Self {
            env: std::env::vars().collect(),
        }
    }

    /// Use an explicit variable mapping.
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self { env }
    }

    /// Expand every reference in `value`.
    ///
    /// Fails if any referenced variable is undefined; the error lists each
    /// missing name once, in order of first appearance.
    pub fn resolve(&self, value: &str) -> Result<String> {
        if !value.contains('$') {
            return Ok(value.to_string());
        }

        let mut missing: Vec<String> = Vec::new();
        let expanded = VAR_PATTERN.replace_all(value, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            match self.env.get(name) {
                Some(v) => v.clone(),
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(ConfigError::UndefinedVariables(missing));
        }
        Ok(expanded.into_owned())
    }

    /// Like [`resolve`](Self::resolve), but yields an empty string on failure.
    pub fn resolve_or_empty(&self, value: &str) -> String {
        self.resolve(value).unwrap_or_default()
    }
}

//! Environment-derived server configuration.
//!
//! All knobs come from `WORKBOARD_*` environment variables; `.env` files
//! are honored by the binary before this runs. Missing credentials fail
//! fast at startup with a message naming the variable.

use thiserror::Error;

/// Default file-size ceiling: 1 MiB.
const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Default ceiling on caller-supplied traversal depth.
const DEFAULT_MAX_DEPTH_CEILING: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration, resolved once at startup and read-only after.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Organization base URL, e.g. `https://dev.example.com/org`.
    pub org_url: String,
    /// Default project scope for bare repository names.
    pub project: String,
    /// Opaque personal access token, handed to the backend client.
    pub token: String,
    /// Work-item types whose content must never be exposed.
    pub blocked_types: Vec<String>,
    /// Byte-size ceiling for file reads.
    pub max_file_bytes: u64,
    /// Ceiling applied to caller-supplied traversal depths.
    pub max_depth_ceiling: u32,
}

impl ServerConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through a lookup function; tests inject their own environment
    /// here instead of mutating the process one.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let org_url = require(&lookup, "WORKBOARD_ORG_URL")?;
        let project = require(&lookup, "WORKBOARD_PROJECT")?;
        let token = require(&lookup, "WORKBOARD_PAT")?;

        let blocked_types = lookup("WORKBOARD_BLOCKED_TYPES")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let max_file_bytes = parse_or(
            &lookup,
            "WORKBOARD_MAX_FILE_BYTES",
            DEFAULT_MAX_FILE_BYTES,
        )?;
        let max_depth_ceiling = parse_or(
            &lookup,
            "WORKBOARD_MAX_DEPTH_CEILING",
            DEFAULT_MAX_DEPTH_CEILING,
        )?;

        Ok(Self {
            org_url,
            project,
            token,
            blocked_types,
            max_file_bytes,
            max_depth_ceiling,
        })
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

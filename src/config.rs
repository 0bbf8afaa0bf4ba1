//! Settings loading.
//!
//! Layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `boardpulse.toml` in the working directory, or the file given with
//!    `--config`
//! 3. `BOARDPULSE_*` environment variables, nested keys separated by `__`
//!    (e.g. `BOARDPULSE_TRELLO__CONCURRENCY=4`)
//! 4. `TRELLO_API_KEY`, `TRELLO_TOKEN` and `TRELLO_BOARD_ID`
//!
//! ```toml
//! [trello]
//! board_id = "pOy2Ba0G"
//! concurrency = 8
//!
//! [metrics]
//! done_lists = ["Done", "Shipped"]
//! in_progress_lists = ["Doing"]
//!
//! [cache]
//! ttl_secs = 300
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use boardpulse_adapters::trello::{DEFAULT_BASE_URL, DEFAULT_CONCURRENCY};
use boardpulse_adapters::ConfigurationError;

use crate::data::names::{DEFAULT_DONE_LISTS, DEFAULT_IN_PROGRESS_LISTS};
use crate::data::ListMatcher;

const DEFAULT_FILE: &str = "boardpulse";
const ENV_PREFIX: &str = "BOARDPULSE";
const LIST_KEYS: [&str; 2] = ["metrics.done_lists", "metrics.in_progress_lists"];

/// Credential variables read straight from the environment.
const TRELLO_ENV: [(&str, &str); 3] = [
    ("TRELLO_API_KEY", "trello.api_key"),
    ("TRELLO_TOKEN", "trello.token"),
    ("TRELLO_BOARD_ID", "trello.board_id"),
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub trello: TrelloSettings,
    pub metrics: MetricSettings,
    pub cache: CacheSettings,
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrelloSettings {
    pub api_key: Option<String>,
    pub token: Option<String>,
    pub board_id: Option<String>,
    pub base_url: String,
    /// Per-card requests in flight at once.
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub include_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricSettings {
    pub done_lists: Vec<String>,
    pub in_progress_lists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// `0` disables caching.
    pub ttl_secs: u64,
}

/// Validated Trello connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub token: String,
    pub board_id: String,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for TrelloSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrelloSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("board_id", &self.board_id)
            .field("base_url", &self.base_url)
            .field("concurrency", &self.concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .field("include_closed", &self.include_closed)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &REDACTED)
            .field("token", &REDACTED)
            .field("board_id", &self.board_id)
            .finish()
    }
}

impl Default for TrelloSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            token: None,
            board_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout_secs: 30,
            include_closed: false,
        }
    }
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self {
            done_lists: DEFAULT_DONE_LISTS.iter().map(|s| s.to_string()).collect(),
            in_progress_lists: DEFAULT_IN_PROGRESS_LISTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl Settings {
    /// Load settings from the optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        Self::load_from(path, std::env::vars().collect())
    }

    /// Load settings with an explicit environment instead of the process one.
    pub fn load_from(
        path: Option<&Path>,
        env: HashMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };

        let mut environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .source(Some(env.clone()));
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }

        let mut builder = Config::builder().add_source(file).add_source(environment);
        for (var, key) in TRELLO_ENV {
            builder = builder
                .set_override_option(key, env.get(var).cloned())
                .map_err(|e| ConfigurationError::invalid(key, e.to_string()))?;
        }

        let settings: Settings = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigurationError::invalid(source_name(path), e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.trello.concurrency == 0 {
            return Err(ConfigurationError::invalid(
                "trello.concurrency",
                "must be at least 1",
            ));
        }
        if self.done_lists().is_empty() {
            return Err(ConfigurationError::invalid(
                "metrics.done_lists",
                "at least one list name is required",
            ));
        }
        Ok(())
    }

    /// Credentials for the Trello API. Fails before any request when one is
    /// missing or blank.
    pub fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        Ok(Credentials {
            api_key: required("TRELLO_API_KEY", &self.trello.api_key)?,
            token: required("TRELLO_TOKEN", &self.trello.token)?,
            board_id: required("TRELLO_BOARD_ID", &self.trello.board_id)?,
        })
    }

    pub fn done_lists(&self) -> ListMatcher {
        ListMatcher::new(&self.metrics.done_lists)
    }

    pub fn in_progress_lists(&self) -> ListMatcher {
        ListMatcher::new(&self.metrics.in_progress_lists)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.trello.timeout_secs)
    }

    /// `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache.ttl_secs > 0).then(|| Duration::from_secs(self.cache.ttl_secs))
    }
}

fn required(key: &str, value: &Option<String>) -> Result<String, ConfigurationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigurationError::missing(key)),
    }
}

fn source_name(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("{}.toml", DEFAULT_FILE))
}

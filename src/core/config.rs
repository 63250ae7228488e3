//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::labels::Locale;
use crate::core::errors::{AgdError, Result};

/// Env prefix for per-form webhook URLs (`AGD_WEBHOOK_URL_LEAD=https://...`).
const WEBHOOK_URL_ENV_PREFIX: &str = "AGD_WEBHOOK_URL_";

/// Full dashboard backend configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub webhooks: WebhookConfig,
    pub paths: PathsConfig,
}

/// Aggregation knobs. Window sizes are lower bounds; the aggregator widens
/// them so that `trend <= week <= month <= year` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Minutes the manual (non-automated) flow is assumed to take.
    pub manual_flow_minutes: f64,
    /// Number of calendar days reported in the trend series.
    pub trend_days: u32,
    /// Upper bound accepted for per-request trend overrides.
    pub max_trend_days: u32,
    pub week_window_days: u32,
    pub month_window_days: u32,
    pub year_window_days: u32,
    /// Maximum number of log documents fetched per aggregation.
    pub fetch_limit: u32,
    /// Language of the weekday labels in the trend series.
    pub locale: Locale,
}

/// Collection names inside the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub logs_collection: String,
    pub equipment_collection: String,
    pub antennas_collection: String,
}

/// HTTP boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Single shared dashboard password; `None` leaves dashboard routes open.
    pub dashboard_password: Option<String>,
    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
}

/// Form name → workflow webhook URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebhookConfig {
    pub timeout_ms: u64,
    pub endpoints: HashMap<String, String>,
}

/// Filesystem paths used by agd.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub sqlite_db: PathBuf,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            manual_flow_minutes: 30.0,
            trend_days: 7,
            max_trend_days: 90,
            week_window_days: 7,
            month_window_days: 30,
            year_window_days: 365,
            fetch_limit: 1_000,
            locale: Locale::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            logs_collection: "logs".to_string(),
            equipment_collection: "equipment".to_string(),
            antennas_collection: "antennas".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            dashboard_password: None,
            allowed_origin: "*".to_string(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            endpoints: HashMap::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                tracing::warn!("HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("agd").join("config.toml"),
            sqlite_db: home_dir
                .join(".local")
                .join("share")
                .join("agd")
                .join("documents.sqlite3"),
        }
    }
}

impl WebhookConfig {
    /// Resolve the webhook URL registered for `form` (case-insensitive).
    #[must_use]
    pub fn endpoint(&self, form: &str) -> Option<&str> {
        self.endpoints
            .get(&normalize_form_name(form))
            .map(String::as_str)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| AgdError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(AgdError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.apply_webhook_env_overrides_from(env::vars());
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, so the value is stable across
    /// processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_value(self)?;
        let canonical = serde_json::to_string(&sorted_json(canonical))?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // analytics
        if let Some(raw) = lookup("AGD_ANALYTICS_MANUAL_FLOW_MINUTES") {
            self.analytics.manual_flow_minutes =
                parse_env("AGD_ANALYTICS_MANUAL_FLOW_MINUTES", &raw)?;
        }
        for (name, slot) in [
            ("AGD_ANALYTICS_TREND_DAYS", &mut self.analytics.trend_days),
            (
                "AGD_ANALYTICS_MAX_TREND_DAYS",
                &mut self.analytics.max_trend_days,
            ),
            (
                "AGD_ANALYTICS_WEEK_WINDOW_DAYS",
                &mut self.analytics.week_window_days,
            ),
            (
                "AGD_ANALYTICS_MONTH_WINDOW_DAYS",
                &mut self.analytics.month_window_days,
            ),
            (
                "AGD_ANALYTICS_YEAR_WINDOW_DAYS",
                &mut self.analytics.year_window_days,
            ),
            ("AGD_ANALYTICS_FETCH_LIMIT", &mut self.analytics.fetch_limit),
        ] {
            if let Some(raw) = lookup(name) {
                *slot = parse_env(name, &raw)?;
            }
        }
        if let Some(raw) = lookup("AGD_ANALYTICS_LOCALE") {
            self.analytics.locale = parse_env("AGD_ANALYTICS_LOCALE", &raw)?;
        }

        // server
        if let Some(raw) = lookup("AGD_SERVER_BIND_ADDR") {
            self.server.bind_addr = raw;
        }
        if let Some(raw) = lookup("AGD_DASHBOARD_PASSWORD") {
            self.server.dashboard_password = Some(raw);
        }
        if let Some(raw) = lookup("AGD_SERVER_ALLOWED_ORIGIN") {
            self.server.allowed_origin = raw;
        }

        // webhooks
        if let Some(raw) = lookup("AGD_WEBHOOK_TIMEOUT_MS") {
            self.webhooks.timeout_ms = parse_env("AGD_WEBHOOK_TIMEOUT_MS", &raw)?;
        }

        // paths
        if let Some(raw) = lookup("AGD_SQLITE_DB") {
            self.paths.sqlite_db = PathBuf::from(raw);
        }

        Ok(())
    }

    /// Register `AGD_WEBHOOK_URL_<FORM>` variables as webhook endpoints.
    fn apply_webhook_env_overrides_from<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(form) = name.strip_prefix(WEBHOOK_URL_ENV_PREFIX) else {
                continue;
            };
            if form.is_empty() || value.trim().is_empty() {
                continue;
            }
            self.webhooks
                .endpoints
                .insert(form.to_string(), value.trim().to_string());
        }
    }

    /// Canonicalize free-form values so lookups and comparisons are stable.
    fn normalize(&mut self) {
        self.webhooks.endpoints = self
            .webhooks
            .endpoints
            .drain()
            .map(|(form, url)| (normalize_form_name(&form), url.trim().to_string()))
            .collect();

        for name in [
            &mut self.store.logs_collection,
            &mut self.store.equipment_collection,
            &mut self.store.antennas_collection,
        ] {
            *name = name.trim().to_string();
        }

        if self.server.dashboard_password.as_deref() == Some("") {
            self.server.dashboard_password = None;
        }
    }

    fn validate(&self) -> Result<()> {
        let a = &self.analytics;

        if !a.manual_flow_minutes.is_finite() || a.manual_flow_minutes < 0.0 {
            return Err(AgdError::InvalidConfig {
                details: format!(
                    "analytics.manual_flow_minutes must be a finite value >= 0, got {}",
                    a.manual_flow_minutes
                ),
            });
        }

        for (name, val) in [
            ("trend_days", a.trend_days),
            ("max_trend_days", a.max_trend_days),
            ("week_window_days", a.week_window_days),
            ("month_window_days", a.month_window_days),
            ("year_window_days", a.year_window_days),
            ("fetch_limit", a.fetch_limit),
        ] {
            if val == 0 {
                return Err(AgdError::InvalidConfig {
                    details: format!("analytics.{name} must be >= 1"),
                });
            }
        }

        if a.max_trend_days > 366 {
            return Err(AgdError::InvalidConfig {
                details: format!(
                    "analytics.max_trend_days must be <= 366, got {}",
                    a.max_trend_days
                ),
            });
        }

        if a.trend_days > a.max_trend_days {
            return Err(AgdError::InvalidConfig {
                details: format!(
                    "analytics.trend_days ({}) must be <= analytics.max_trend_days ({})",
                    a.trend_days, a.max_trend_days
                ),
            });
        }

        if a.fetch_limit > 100_000 {
            return Err(AgdError::InvalidConfig {
                details: format!(
                    "analytics.fetch_limit must be <= 100000, got {}",
                    a.fetch_limit
                ),
            });
        }

        for (name, val) in [
            ("logs_collection", &self.store.logs_collection),
            ("equipment_collection", &self.store.equipment_collection),
            ("antennas_collection", &self.store.antennas_collection),
        ] {
            if val.is_empty() {
                return Err(AgdError::InvalidConfig {
                    details: format!("store.{name} must not be empty"),
                });
            }
        }

        if self.store.equipment_collection == self.store.antennas_collection {
            return Err(AgdError::InvalidConfig {
                details: "store.equipment_collection and store.antennas_collection must differ"
                    .to_string(),
            });
        }

        self.server
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|error| AgdError::InvalidConfig {
                details: format!("server.bind_addr {:?}: {error}", self.server.bind_addr),
            })?;

        if self.server.allowed_origin.trim().is_empty() {
            return Err(AgdError::InvalidConfig {
                details: "server.allowed_origin must not be empty".to_string(),
            });
        }

        if self.webhooks.timeout_ms == 0 {
            return Err(AgdError::InvalidConfig {
                details: "webhooks.timeout_ms must be > 0".to_string(),
            });
        }

        for (form, url) in &self.webhooks.endpoints {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AgdError::InvalidConfig {
                    details: format!("webhooks.endpoints.{form} must be an http(s) URL, got {url:?}"),
                });
            }
        }

        Ok(())
    }
}

fn normalize_form_name(form: &str) -> String {
    form.trim().to_ascii_lowercase().replace('_', "-")
}

/// Recursively order object keys so hashing does not depend on map iteration.
fn sorted_json(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sorted_json(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sorted_json).collect())
        }
        other => other,
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| AgdError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

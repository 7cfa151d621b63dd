//! Configuration types for nostr-search.
//!
//! Loaded from `~/.nostr-search/config.toml` (or `--config`). Every
//! section is optional; a missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::replacements::RuleSource;

// ── Identity ────────────────────────────────────────────────────

/// Default config directory name under `$HOME`.
pub const APP_DIR_NAME: &str = ".nostr-search";

const RELAYS_ENV: &str = "NOSTR_SEARCH_RELAYS";
const REPLACEMENTS_ENV: &str = "NOSTR_SEARCH_REPLACEMENTS";

// ── Sections ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub relays: RelayConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub replacements: ReplacementsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relays queried for search results and profile lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Relay URLs (wss://). Should support NIP-50 search.
    #[serde(default = "default_relays")]
    pub urls: Vec<String>,
    /// Per-fetch timeout.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Result-count ceiling per search.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Kinds searched when the query has no `kind:` directive.
    #[serde(default = "default_kinds")]
    pub default_kinds: Vec<u16>,
    /// Commit unresolved-author results while resolution is in flight.
    #[serde(default = "default_true")]
    pub immediate_results: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Budget for resolving all author tokens of one search.
    #[serde(default = "default_resolver_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Resolve bare display names through a relay profile search.
    #[serde(default = "default_true")]
    pub profile_lookup: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplacementsConfig {
    /// URL or file path of the shortcut rule file.
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            urls: default_relays(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            default_kinds: default_kinds(),
            immediate_results: true,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_resolver_timeout_ms(),
            cache_capacity: default_cache_capacity(),
            profile_lookup: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub fn default_relays() -> Vec<String> {
    vec![
        "wss://relay.nostr.band".to_string(),
        "wss://search.nos.today".to_string(),
        "wss://relay.ditto.pub".to_string(),
    ]
}

fn default_fetch_timeout_secs() -> u64 {
    8
}
fn default_limit() -> usize {
    200
}
fn default_kinds() -> Vec<u16> {
    nostr_core::filter::DEFAULT_KINDS.to_vec()
}
fn default_resolver_timeout_ms() -> u64 {
    2500
}
fn default_cache_capacity() -> usize {
    4096
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

/// `~/.nostr-search/config.toml`, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().join(APP_DIR_NAME).join("config.toml"))
}

// ── Loading ─────────────────────────────────────────────────────

impl Config {
    /// Load from an explicit path, or from the default location when it
    /// exists, or fall back to defaults. Env overrides apply in all cases.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::load_from_file(&p.to_string_lossy())?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(path);
        let content = std::fs::read_to_string(expanded_path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path))?;

        toml::from_str(&content).with_context(|| "Failed to parse TOML config")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(relays) = std::env::var(RELAYS_ENV) {
            let urls: Vec<String> = relays
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !urls.is_empty() {
                self.relays.urls = urls;
            }
        }
        if let Ok(source) = std::env::var(REPLACEMENTS_ENV) {
            if !source.trim().is_empty() {
                self.replacements.source = Some(source.trim().to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for url in &self.relays.urls {
            if !url.starts_with("wss://") && !url.starts_with("ws://") {
                anyhow::bail!("Relay URL must start with ws:// or wss://: {url}");
            }
        }
        if self.relays.fetch_timeout_secs == 0 {
            anyhow::bail!("relays.fetch_timeout_secs must be greater than zero");
        }
        if self.search.limit == 0 {
            anyhow::bail!("search.limit must be greater than zero");
        }
        if self.resolver.timeout_ms == 0 {
            anyhow::bail!("resolver.timeout_ms must be greater than zero");
        }
        if self.resolver.cache_capacity == 0 {
            anyhow::bail!("resolver.cache_capacity must be greater than zero");
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.relays.fetch_timeout_secs)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver.timeout_ms)
    }

    /// Where shortcut rules come from, if configured.
    pub fn rule_source(&self) -> Option<RuleSource> {
        self.replacements.source.as_deref().map(RuleSource::from_location)
    }
}

//! Gatherer contract and concurrent scheduling.
//!
//! Every external system sits behind the [`Gatherer`] trait. A gatherer never
//! returns an error: each failure mode is mapped to a [`GatherResult`]
//! variant, so the scheduler can treat all sources alike.

pub mod scheduler;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{GatherResult, TimeWindow};

pub use scheduler::{run_all, GatherResults, CANCELLED, DEFAULT_SOURCE_TIMEOUT};

/// Default hard cap on items fetched per source.
pub const DEFAULT_PAGE_CAP: usize = 50;

fn default_page_cap() -> usize {
    DEFAULT_PAGE_CAP
}

/// Injected configuration for one source.
///
/// `settings` carries everything provider-specific (paths, repo names,
/// credentials). The core never reads the environment itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub source_id: String,
    #[serde(default = "default_page_cap")]
    pub page_cap: usize,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl ProviderConfig {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            page_cap: DEFAULT_PAGE_CAP,
            settings: BTreeMap::new(),
        }
    }

    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap;
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Look up a setting; blank values count as unset.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn setting_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.setting(key).unwrap_or(default)
    }

    /// Look up a required setting, producing the `Unavailable` result a
    /// gatherer should return when it is missing.
    pub fn require(&self, key: &str) -> Result<&str, GatherResult> {
        self.setting(key).ok_or_else(|| {
            GatherResult::unavailable(format!("source '{}' is not configured: missing '{key}'", self.source_id))
        })
    }
}

// Settings may hold credentials, so only their keys are printed.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("source_id", &self.source_id)
            .field("page_cap", &self.page_cap)
            .field("settings", &self.settings.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Uniform fetch contract implemented once per external system.
#[async_trait]
pub trait Gatherer: Send + Sync {
    /// Short name of the backing system (`github`, `linear`...).
    fn kind(&self) -> &'static str;

    /// Fetch current state. Must not panic or block the executor; every
    /// failure maps to `Unavailable` or `Error`.
    async fn fetch(&self, window: &TimeWindow, config: &ProviderConfig) -> GatherResult;
}

/// A configured source: its config plus the gatherer serving it.
#[derive(Clone)]
pub struct Source {
    pub config: ProviderConfig,
    pub gatherer: Arc<dyn Gatherer>,
}

impl Source {
    pub fn new(config: ProviderConfig, gatherer: Arc<dyn Gatherer>) -> Self {
        Self { config, gatherer }
    }

    pub fn id(&self) -> &str {
        &self.config.source_id
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("config", &self.config)
            .field("kind", &self.gatherer.kind())
            .finish()
    }
}

//! `sitrep.toml` loading and source construction.
//!
//! ```toml
//! window = "3d"
//! timeout_secs = 15
//!
//! [limits]
//! max_attention = 5
//!
//! [[sources]]
//! kind = "linear"
//! team = "PROJ"
//! api_key_env = "LINEAR_API_KEY"
//! ```
//!
//! Any source key ending in `_env` names an environment variable whose value
//! becomes the setting without the suffix. Explicit values win.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sitrep_core::{ProviderConfig, Source, DEFAULT_PAGE_CAP};
use sitrep_providers::{build_source, ProviderKind};
use tracing::debug;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sitrep.toml";

const ENV_SUFFIX: &str = "_env";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitrepConfig {
    #[serde(default)]
    pub window: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub id_pattern: Option<String>,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_attention: Option<usize>,
    pub max_per_section: Option<usize>,
}

/// One `[[sources]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceEntry {
    pub kind: ProviderKind,
    /// Defaults to the kind name.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub page_cap: Option<usize>,
    #[serde(flatten)]
    pub settings: BTreeMap<String, String>,
}

impl SourceEntry {
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(self.kind.as_str())
    }

    /// Resolve `*_env` indirections through `env` and build the provider config.
    pub fn provider_config(&self, env: impl Fn(&str) -> Option<String>) -> ProviderConfig {
        let mut config = ProviderConfig::new(self.id())
            .with_page_cap(self.page_cap.unwrap_or(DEFAULT_PAGE_CAP));

        for (key, value) in &self.settings {
            if let Some(target) = key.strip_suffix(ENV_SUFFIX) {
                if self.settings.contains_key(target) {
                    continue;
                }
                match env(value.as_str()) {
                    Some(resolved) => config = config.with_setting(target, resolved),
                    None => debug!(source = self.id(), var = %value, "environment variable not set"),
                }
            } else {
                config = config.with_setting(key, value);
            }
        }
        config
    }
}

impl SitrepConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid sitrep configuration")
    }

    /// Build one [`Source`] per `[[sources]]` entry, in file order.
    pub fn build_sources(&self, env: impl Fn(&str) -> Option<String>) -> Result<Vec<Source>> {
        self.sources
            .iter()
            .map(|entry| {
                build_source(entry.kind, entry.provider_config(&env))
                    .with_context(|| format!("failed to set up source '{}'", entry.id()))
            })
            .collect()
    }
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, `sitrep.toml` in the working
/// directory is used when present, otherwise defaults with no sources.
pub fn load(path: Option<&Path>) -> Result<SitrepConfig> {
    let path = match path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                debug!("no {DEFAULT_CONFIG_FILE} found, running without sources");
                return Ok(SitrepConfig::default());
            }
            default
        }
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    SitrepConfig::parse(&text).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
window = "3d"
timeout_secs = 15
id_pattern = '\b[A-Z]{3}-\d+\b'

[limits]
max_attention = 5

[[sources]]
kind = "github"
repo = "acme/web"

[[sources]]
kind = "linear"
id = "tracker"
page_cap = 20
team = "PROJ"
api_key_env = "SITREP_TEST_LINEAR_KEY"

[[sources]]
kind = "beads"
repo_dir = "/srv/web"
"#;

    fn env(var: &str) -> Option<String> {
        (var == "SITREP_TEST_LINEAR_KEY").then(|| "lin_api_secret".to_string())
    }

    #[test]
    fn test_parse_full_config() {
        let config = SitrepConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.window.as_deref(), Some("3d"));
        assert_eq!(config.timeout_secs, Some(15));
        assert_eq!(config.limits.max_attention, Some(5));
        assert_eq!(config.limits.max_per_section, None);
        assert_eq!(config.sources.len(), 3);

        let ids: Vec<_> = config.sources.iter().map(SourceEntry::id).collect();
        assert_eq!(ids, vec!["github", "tracker", "beads"]);
        assert_eq!(config.sources[0].settings["repo"], "acme/web");
    }

    #[test]
    fn test_env_indirection_resolved() {
        let config = SitrepConfig::parse(SAMPLE).unwrap();
        let linear = config.sources[1].provider_config(env);

        assert_eq!(linear.source_id, "tracker");
        assert_eq!(linear.page_cap, 20);
        assert_eq!(linear.setting("api_key"), Some("lin_api_secret"));
        assert_eq!(linear.setting("team"), Some("PROJ"));
        assert_eq!(linear.setting("api_key_env"), None);
    }

    #[test]
    fn test_unset_env_leaves_setting_missing() {
        let config = SitrepConfig::parse(SAMPLE).unwrap();
        let linear = config.sources[1].provider_config(|_| None);
        assert_eq!(linear.setting("api_key"), None);
    }

    #[test]
    fn test_explicit_value_beats_env() {
        let config = SitrepConfig::parse(
            r#"
[[sources]]
kind = "linear"
api_key = "inline"
api_key_env = "SITREP_TEST_LINEAR_KEY"
"#,
        )
        .unwrap();
        let linear = config.sources[0].provider_config(env);
        assert_eq!(linear.setting("api_key"), Some("inline"));
    }

    #[test]
    fn test_build_sources_in_file_order() {
        let config = SitrepConfig::parse(SAMPLE).unwrap();
        let sources = config.build_sources(env).unwrap();
        let ids: Vec<_> = sources.iter().map(Source::id).collect();
        assert_eq!(ids, vec!["github", "tracker", "beads"]);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = SitrepConfig::parse("[[sources]]\nkind = \"jira\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("jira"));
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        assert!(SitrepConfig::parse("windw = \"3d\"\n").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "window = \"2w\"\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.window.as_deref(), Some("2w"));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}

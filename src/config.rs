// src/config.rs
//! Watch configuration: sources, filter defaults and browser timeouts, read
//! from TOML. Channel credentials come from the environment instead (see
//! `notify`).

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::filter::FilterSpec;
use crate::source::{page_requests, Timeouts};

pub const DEFAULT_CONFIG_PATH: &str = "config/watcher.toml";
pub const ENV_CONFIG_PATH: &str = "WATCHER_CONFIG_PATH";

fn default_true() -> bool {
    true
}
fn default_navigation_secs() -> u64 {
    60
}
fn default_wait_secs() -> u64 {
    15
}
fn default_settle_secs() -> u64 {
    5
}
fn default_scroll_settle_secs() -> u64 {
    3
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchConfig {
    /// Default filter for sources without their own.
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_navigation_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_wait_secs")]
    pub wait_timeout_secs: u64,
    /// Pause before scrolling lazily rendered pages.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_scroll_settle_secs")]
    pub scroll_settle_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: default_navigation_secs(),
            wait_timeout_secs: default_wait_secs(),
            settle_secs: default_settle_secs(),
            scroll_settle_secs: default_scroll_settle_secs(),
            user_agent: None,
        }
    }
}

impl BrowserConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            navigation: Duration::from_secs(self.navigation_timeout_secs.max(1)),
            wait: Duration::from_secs(self.wait_timeout_secs.max(1)),
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_secs(self.scroll_settle_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    Microsoft,
    Apple,
    MicrosoftAi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    company: Option<String>,
    pub site: SiteKind,
    pub base_url: Url,
    /// May contain `{keyword}`, expanded once per entry of `keywords`.
    pub url_template: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Used when a record carries no location text.
    #[serde(default)]
    pub default_location: Option<String>,
    /// Replaces the global filter for this source.
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl SourceConfig {
    pub fn company(&self) -> &str {
        self.company.as_deref().unwrap_or(&self.name)
    }
}

impl WatchConfig {
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn filter_for<'a>(&'a self, source: &'a SourceConfig) -> &'a FilterSpec {
        source.filter.as_ref().unwrap_or(&self.filter)
    }

    fn validate(mut self) -> Result<Self> {
        for s in &mut self.sources {
            if s.name.trim().is_empty() {
                bail!("source with empty name");
            }
            s.keywords = clean_list(std::mem::take(&mut s.keywords));
            for req in page_requests(&s.url_template, &s.keywords) {
                Url::parse(&req.url)
                    .with_context(|| format!("source {:?}: bad url_template {:?}", s.name, req.url))?;
            }
        }
        Ok(self)
    }
}

pub fn parse_config(s: &str) -> Result<WatchConfig> {
    let cfg: WatchConfig = toml::from_str(s).context("parsing watch config")?;
    cfg.validate()
}

/// Load from an explicit path.
pub fn load_config_from(path: &Path) -> Result<WatchConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading watch config from {}", path.display()))?;
    parse_config(&content)
}

/// Load using env var + fallback:
/// 1) $WATCHER_CONFIG_PATH (must exist)
/// 2) config/watcher.toml
///
/// With neither present the config is empty, which the watcher reports as
/// "nothing to do".
pub fn load_config_default() -> Result<WatchConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return load_config_from(&default);
    }
    Ok(WatchConfig::default())
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const SAMPLE: &str = r#"
[filter]
exclude = ["senior", " ii"]

[browser]
wait_timeout_secs = 10

[[sources]]
name = "Apple"
site = "apple"
base_url = "https://jobs.apple.com"
url_template = "https://jobs.apple.com/en-us/search?search={keyword}&location=united-states-USA"
keywords = [" ML ", "", "Data", "ML"]
max_results = 20

[sources.filter]
include = ["software", "data"]

[[sources]]
name = "Microsoft"
site = "microsoft"
base_url = "https://apply.careers.microsoft.com"
url_template = "https://apply.careers.microsoft.com/careers?location=United+States"
default_location = "United States"
enabled = false
"#;

    #[test]
    fn parses_sources_with_defaults_and_overrides() {
        let cfg = parse_config(SAMPLE).unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.browser.wait_timeout_secs, 10);
        assert_eq!(cfg.browser.navigation_timeout_secs, 60);

        let apple = &cfg.sources[0];
        assert_eq!(apple.site, SiteKind::Apple);
        assert_eq!(apple.company(), "Apple");
        assert_eq!(apple.keywords, vec!["ML".to_string(), "Data".to_string()]);
        assert_eq!(cfg.filter_for(apple).include(), &["data".to_string(), "software".to_string()]);

        let ms = &cfg.sources[1];
        assert!(!ms.enabled);
        assert_eq!(cfg.filter_for(ms).exclude(), &[" ii".to_string(), "senior".to_string()]);
        assert_eq!(cfg.enabled_sources().count(), 1);
    }

    #[test]
    fn unknown_site_is_rejected() {
        let bad = r#"
[[sources]]
name = "X"
site = "linkedin"
base_url = "https://x.example.com"
url_template = "https://x.example.com"
"#;
        assert!(parse_config(bad).is_err());
    }

    #[test]
    fn bad_template_is_rejected() {
        let bad = r#"
[[sources]]
name = "X"
site = "apple"
base_url = "https://x.example.com"
url_template = "not a url {keyword}"
keywords = ["a"]
"#;
        assert!(parse_config(bad).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallback() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // Nothing on disk: empty config.
        assert!(load_config_default().unwrap().sources.is_empty());

        // Fallback file in ./config/
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_CONFIG_PATH), SAMPLE).unwrap();
        assert_eq!(load_config_default().unwrap().sources.len(), 2);

        // Env wins, and must exist.
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(load_config_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}

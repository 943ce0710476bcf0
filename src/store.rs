// src/store.rs
//! Seen-set persistence: a flat JSON array of listing ids.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_SEEN_PATH: &str = "seen_jobs.json";
pub const ENV_SEEN_PATH: &str = "SEEN_JOBS_PATH";

/// Append-only set of ids already notified, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    order: Vec<String>,
    index: HashSet<String>,
    added: usize,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from previously persisted ids. Does not count as additions.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for id in ids {
            let id = id.into();
            if set.index.insert(id.clone()) {
                set.order.push(id);
            }
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Returns false if the id was already present.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if !self.index.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        self.added += 1;
        true
    }

    /// Number of ids added since load.
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn is_dirty(&self) -> bool {
        self.added > 0
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }
}

#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$SEEN_JOBS_PATH`, else `seen_jobs.json` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_SEEN_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SEEN_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing, unreadable or malformed file yields an empty set.
    pub async fn load(&self) -> SeenSet {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no seen-set yet, starting fresh");
                return SeenSet::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "seen-set unreadable, starting fresh");
                return SeenSet::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => SeenSet::from_ids(ids),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "seen-set malformed, starting fresh");
                SeenSet::new()
            }
        }
    }

    /// Write through a sibling temp file so a crash never leaves a truncated store.
    pub async fn save(&self, set: &SeenSet) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let body = serde_json::to_vec(set.ids()).context("serializing seen-set")?;
        let tmp = self.tmp_path();
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_SEEN_PATH.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reports_new_ids_only() {
        let mut set = SeenSet::from_ids(["A"]);
        assert!(!set.is_dirty());
        assert!(!set.add("A"));
        assert!(set.add("B"));
        assert_eq!(set.added(), 1);
        assert_eq!(set.ids(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn from_ids_drops_duplicates() {
        let set = SeenSet::from_ids(["A", "B", "A"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.added(), 0);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("seen.json");
        std::fs::write(&p, "{not json").unwrap();
        assert!(SeenStore::new(&p).load().await.is_empty());
    }

    #[tokio::test]
    async fn non_array_json_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("seen.json");
        std::fs::write(&p, r#"{"ids": ["A"]}"#).unwrap();
        assert!(SeenStore::new(&p).load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_order_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("state").join("seen.json");
        let store = SeenStore::new(&p);

        let mut set = SeenSet::new();
        set.add("Z");
        set.add("A");
        store.save(&set).await.unwrap();

        let raw = std::fs::read_to_string(&p).unwrap();
        assert_eq!(raw, r#"["Z","A"]"#);
        assert!(!dir.path().join("state").join("seen.json.tmp").exists());

        let loaded = store.load().await;
        assert_eq!(loaded.ids(), &["Z".to_string(), "A".to_string()]);
        assert!(loaded.contains("A"));
    }

    #[serial_test::serial]
    #[test]
    fn from_env_prefers_env_path() {
        std::env::set_var(ENV_SEEN_PATH, "/tmp/elsewhere.json");
        assert_eq!(SeenStore::from_env().path(), Path::new("/tmp/elsewhere.json"));
        std::env::remove_var(ENV_SEEN_PATH);
        assert_eq!(SeenStore::from_env().path(), Path::new(DEFAULT_SEEN_PATH));
    }
}

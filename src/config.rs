use std::path::Path;

use anyhow::{Result, bail};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::search::{DEFAULT_LOOKAHEAD, DEFAULT_RECENT_SEARCH_LIMIT, DEFAULT_SEARCH_MARKER};
use crate::sessions::DEFAULT_GAP_MINUTES;
use crate::stats::DEFAULT_VISIT_THRESHOLD;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub run_id: String,
    #[serde(default = "default_gap_minutes")]
    pub gap_minutes: u32,
    #[serde(default = "default_visit_threshold")]
    pub visit_threshold: u64,
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    #[serde(default = "default_search_marker")]
    pub search_marker: String,
    #[serde(default)]
    pub search_case_sensitive: bool,
    #[serde(default = "default_recent_search_limit")]
    pub recent_search_limit: usize,
    #[serde(default = "default_top_domains")]
    pub top_domains: usize,
    #[serde(default)]
    pub max_input_rows: Option<u64>,
}

fn default_gap_minutes() -> u32 {
    DEFAULT_GAP_MINUTES
}

fn default_visit_threshold() -> u64 {
    DEFAULT_VISIT_THRESHOLD
}

fn default_lookahead() -> usize {
    DEFAULT_LOOKAHEAD
}

fn default_search_marker() -> String {
    DEFAULT_SEARCH_MARKER.to_string()
}

fn default_recent_search_limit() -> usize {
    DEFAULT_RECENT_SEARCH_LIMIT
}

fn default_top_domains() -> usize {
    1000
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p)?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }
    validate(&config)?;

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig { config, config_hash })
}

pub fn validate(config: &Config) -> Result<()> {
    if config.search_marker.trim().is_empty() {
        bail!("search_marker must not be empty");
    }
    if config.visit_threshold == 0 {
        bail!("visit_threshold must be at least 1");
    }
    if config.run_id.contains(['/', '\\']) {
        bail!("run_id must not contain path separators: {}", config.run_id);
    }
    Ok(())
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", now.format("%Y%m%dT%H%M%SZ"), rand_suffix())
}

fn rand_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{:08x}", nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_embedded_defaults() {
        let loaded = load_config(None).expect("config");
        let cfg = loaded.config;
        assert_eq!(cfg.gap_minutes, 30);
        assert_eq!(cfg.visit_threshold, 10);
        assert_eq!(cfg.lookahead, 5);
        assert_eq!(cfg.search_marker, "Google Search");
        assert!(!cfg.search_case_sensitive);
        assert_eq!(cfg.max_input_rows, Some(5_000_000));
        assert!(!cfg.run_id.is_empty());
        assert_eq!(loaded.config_hash.len(), 64);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("cfg.yml");
        std::fs::write(&path, "run_id: fixed\ngap_minutes: 15\n").expect("write");
        let cfg = load_config(Some(&path)).expect("config").config;
        assert_eq!(cfg.run_id, "fixed");
        assert_eq!(cfg.gap_minutes, 15);
        assert_eq!(cfg.lookahead, 5);
        assert_eq!(cfg.top_domains, 1000);
        assert_eq!(cfg.max_input_rows, None);
    }

    #[test]
    fn rejects_empty_marker() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("cfg.yml");
        std::fs::write(&path, "search_marker: \"\"\n").expect("write");
        assert!(load_config(Some(&path)).is_err());
    }
}

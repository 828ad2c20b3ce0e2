//! # Utility Module
//!
//! Glue between CLI options, configuration and the output directory.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Result, anyhow};
#[cfg(unix)]
use tracing::warn;
use tracing::info;

use crate::cli::CliOptions;
use crate::config::Config;
use crate::metadata::MetadataBackendKind;

/// Convert CLI metadata backend to internal enum
pub fn backend_from_cli(backend: crate::cli::MetadataBackend) -> MetadataBackendKind {
    match backend {
        crate::cli::MetadataBackend::Jsonl => MetadataBackendKind::Jsonl,
        crate::cli::MetadataBackend::Csv => MetadataBackendKind::Csv,
    }
}

/// Apply CLI overrides on top of the loaded configuration.
pub fn apply_cli_overrides(cfg: &mut Config, opts: &CliOptions) {
    if let Some(gap) = opts.gap_minutes {
        info!("session gap overridden by CLI: {gap} minutes");
        cfg.gap_minutes = gap;
    }
    if let Some(threshold) = opts.visit_threshold {
        cfg.visit_threshold = threshold;
    }
    if let Some(lookahead) = opts.lookahead {
        cfg.lookahead = lookahead;
    }
}

/// Ensure output directory exists and is writable, warning on unsafe permissions.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_dir() {
            return Err(anyhow!(
                "output path is not a directory: {}",
                path.display()
            ));
        }
    } else {
        std::fs::create_dir_all(path)?;
    }

    let probe_path = path.join(".history_sessions_write_probe");
    match OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe_path)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe_path);
        }
        Err(err) => {
            return Err(anyhow!(
                "output directory is not writable: {} ({})",
                path.display(),
                err
            ));
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        if mode & 0o002 != 0 {
            warn!("output directory is world-writable: {}", path.display());
        }
    }
    Ok(())
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Two-tier loading: the TOML file provides base values, then environment
//! variables apply runtime overrides.

use crate::{ConfigError, ConfigResult, RtDecodeConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file searched for on disk
pub const CONFIG_FILE_NAME: &str = "rtdecode_configuration.toml";

/// Find the rtdecode configuration file
///
/// Search order:
/// 1. `RTDECODE_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Parent directories (up to 5 levels, workspace root)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any
/// location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("RTDECODE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by RTDECODE_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "rtdecode configuration file '{}' not found in any of these locations:\n{}\n\nSet RTDECODE_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file and apply environment overrides
///
/// # Arguments
///
/// * `config_path` - Optional explicit path. If `None`, searches for the file.
///
/// # Errors
///
/// Returns an error if the file is missing, contains invalid TOML, or fails
/// validation
pub fn load_config(config_path: Option<&Path>) -> ConfigResult<RtDecodeConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: RtDecodeConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    crate::validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `RTDECODE_DATA_DIR` -> `session.data_dir`
/// - `RTDECODE_TRAIN_COUNT` -> `session.train_count`
/// - `RTDECODE_TOTAL_COUNT` -> `session.total_count`
/// - `RTDECODE_LABEL_SHIFT` -> `session.label_shift`
/// - `RTDECODE_INCREMENTAL_BATCH` -> `session.incremental_batch`
/// - `RTDECODE_POLL_INTERVAL_MS` -> `watcher.poll_interval_ms`
/// - `RTDECODE_SCAN_INTERVAL_MS` -> `watcher.scan_interval_ms`
/// - `RTDECODE_READ_RETRIES` -> `watcher.read_retries`
/// - `RTDECODE_RETRY_BACKOFF_MS` -> `watcher.retry_backoff_ms`
/// - `RTDECODE_WAIT_TIMEOUT_MS` -> `watcher.wait_timeout_ms`
/// - `RTDECODE_MODEL_KIND` -> `model.kind`
/// - `RTDECODE_SEED` -> `model.seed`
pub fn apply_environment_overrides(config: &mut RtDecodeConfig) {
    // Session settings
    if let Ok(value) = env::var("RTDECODE_DATA_DIR") {
        config.session.data_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("RTDECODE_TRAIN_COUNT") {
        if let Ok(count) = value.parse::<u32>() {
            config.session.train_count = count;
        }
    }
    if let Ok(value) = env::var("RTDECODE_TOTAL_COUNT") {
        if let Ok(count) = value.parse::<u32>() {
            config.session.total_count = count;
        }
    }
    if let Ok(value) = env::var("RTDECODE_LABEL_SHIFT") {
        if let Ok(shift) = value.parse::<u32>() {
            config.session.label_shift = shift;
        }
    }
    if let Ok(value) = env::var("RTDECODE_INCREMENTAL_BATCH") {
        if let Ok(batch) = value.parse::<u32>() {
            config.session.incremental_batch = batch;
        }
    }

    // Watcher settings
    if let Ok(value) = env::var("RTDECODE_POLL_INTERVAL_MS") {
        if let Ok(interval) = value.parse::<u64>() {
            config.watcher.poll_interval_ms = interval;
        }
    }
    if let Ok(value) = env::var("RTDECODE_SCAN_INTERVAL_MS") {
        if let Ok(interval) = value.parse::<u64>() {
            config.watcher.scan_interval_ms = interval;
        }
    }
    if let Ok(value) = env::var("RTDECODE_READ_RETRIES") {
        if let Ok(retries) = value.parse::<u32>() {
            config.watcher.read_retries = retries;
        }
    }
    if let Ok(value) = env::var("RTDECODE_RETRY_BACKOFF_MS") {
        if let Ok(backoff) = value.parse::<u64>() {
            config.watcher.retry_backoff_ms = backoff;
        }
    }
    if let Ok(value) = env::var("RTDECODE_WAIT_TIMEOUT_MS") {
        if let Ok(timeout) = value.parse::<u64>() {
            config.watcher.wait_timeout_ms = timeout;
        }
    }

    // Model settings
    if let Ok(value) = env::var("RTDECODE_MODEL_KIND") {
        config.model.kind = value;
    }
    if let Ok(value) = env::var("RTDECODE_SEED") {
        if let Ok(seed) = value.parse::<u64>() {
            config.model.seed = seed;
        }
    }
}

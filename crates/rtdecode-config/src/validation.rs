// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cross-field validation applied after all overrides.

use crate::{ConfigError, ConfigResult, RtDecodeConfig};

/// Model kinds a session can be configured with.
pub const MODEL_KINDS: [&str; 2] = ["batch", "incremental"];

/// Validate a fully resolved configuration.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` or `ConfigError::MissingRequired`
/// on the first violated constraint.
pub fn validate_config(config: &RtDecodeConfig) -> ConfigResult<()> {
    let session = &config.session;
    if session.volume_prefix.is_empty() {
        return Err(ConfigError::MissingRequired(
            "session.volume_prefix".to_string(),
        ));
    }
    if session.index_pad_width == 0 || session.index_pad_width > 9 {
        return Err(ConfigError::InvalidValue(format!(
            "session.index_pad_width must be 1..=9, got {}",
            session.index_pad_width
        )));
    }
    if session.train_count == 0 {
        return Err(ConfigError::InvalidValue(
            "session.train_count must be at least 1".to_string(),
        ));
    }
    if session.train_count >= session.total_count {
        return Err(ConfigError::InvalidValue(format!(
            "session.train_count {} must be below session.total_count {}",
            session.train_count, session.total_count
        )));
    }
    if session.label_shift > session.train_count {
        return Err(ConfigError::InvalidValue(format!(
            "session.label_shift {} must not exceed session.train_count {}",
            session.label_shift, session.train_count
        )));
    }

    if config.watcher.poll_interval_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "watcher.poll_interval_ms must be at least 1".to_string(),
        ));
    }
    if config.watcher.scan_interval_ms == 0 {
        return Err(ConfigError::InvalidValue(
            "watcher.scan_interval_ms must be at least 1".to_string(),
        ));
    }

    let model = &config.model;
    if !MODEL_KINDS.contains(&model.kind.as_str()) {
        return Err(ConfigError::InvalidValue(format!(
            "model.kind must be one of {:?}, got '{}'",
            MODEL_KINDS, model.kind
        )));
    }
    if session.incremental_batch > 0 && model.kind != "incremental" {
        return Err(ConfigError::InvalidValue(format!(
            "session.incremental_batch {} requires model.kind = \"incremental\"",
            session.incremental_batch
        )));
    }
    if model.learning_rate <= 0.0 || !model.learning_rate.is_finite() {
        return Err(ConfigError::InvalidValue(format!(
            "model.learning_rate must be a positive finite number, got {}",
            model.learning_rate
        )));
    }
    if model.fit_epochs == 0 {
        return Err(ConfigError::InvalidValue(
            "model.fit_epochs must be at least 1".to_string(),
        ));
    }
    if model.kind == "incremental" && model.update_epochs == 0 {
        return Err(ConfigError::InvalidValue(
            "model.update_epochs must be at least 1 for incremental models".to_string(),
        ));
    }

    Ok(())
}

//! Processor configuration module.
//!
//! Handles loading, validating, and merging `airbrush.toml`. Stock defaults
//! are overridden by whatever the user file specifies; everything else keeps
//! its default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [encoding]
//! quality = 90              # JPEG quality (1-100)
//! # format = "png"          # Output format override (jpeg, png, tiff, webp)
//!
//! [resize]
//! filter = "lanczos3"       # nearest, triangle, catmull-rom, gaussian, lanczos3
//!
//! [previews.sizes]          # Default preview set for the `previews` command
//! small = [200, 100]        # Exact width x height (center-crop then scale)
//! large = [500, 250]
//! # thumb = 150             # Single number bounds the longer edge
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want. The one
//! exception is `[previews.sizes]`: a user table replaces the default set
//! instead of adding to it, so unwanted stock labels don't leak into output.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::SizeSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Processor configuration loaded from `airbrush.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Output encoding settings (quality, format override).
    pub encoding: EncodingConfig,
    /// Resampling settings.
    pub resize: ResizeConfig,
    /// Default preview set.
    pub previews: PreviewsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ProcessorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.encoding.quality) {
            return Err(ConfigError::Validation(
                "encoding.quality must be 1-100".into(),
            ));
        }
        for (label, spec) in &self.previews.sizes {
            let positive = match *spec {
                SizeSpec::Max(n) => n > 0,
                SizeSpec::Exact(w, h) => w > 0 && h > 0,
            };
            if !positive {
                return Err(ConfigError::Validation(format!(
                    "previews.sizes.{label} must be positive"
                )));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// Lossy encoding quality, 1 (worst) to 100 (best). Only JPEG output uses it.
    pub quality: u32,
    /// Re-encode everything in this format instead of the source format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            format: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Tiff,
    Webp,
}

/// Resampling settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub filter: ResizeFilter,
}

/// Resampling filter, from fastest to sharpest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

/// Default preview set used when the CLI gets no `--size` flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewsConfig {
    pub sizes: BTreeMap<String, SizeSpec>,
}

impl Default for PreviewsConfig {
    fn default() -> Self {
        Self {
            sizes: BTreeMap::from([
                ("large".to_string(), SizeSpec::Exact(500, 250)),
                ("small".to_string(), SizeSpec::Exact(200, 100)),
            ]),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ProcessorConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Drop the stock preview set when the overlay brings its own.
fn clear_replaced_sizes(base: &mut toml::Value, overlay: &toml::Value) {
    let overlay_has_sizes = overlay
        .get("previews")
        .and_then(|p| p.get("sizes"))
        .is_some();
    if !overlay_has_sizes {
        return;
    }
    if let Some(previews) = base.get_mut("previews").and_then(|p| p.as_table_mut()) {
        previews.remove("sizes");
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    mut base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ProcessorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => {
            clear_replaced_sizes(&mut base, &ov);
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: ProcessorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file path.
///
/// A missing file yields the stock defaults. Otherwise merges user values on
/// top of stock defaults, rejects unknown keys, and validates the result.
pub fn load_config(path: &Path) -> Result<ProcessorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `airbrush.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Airbrush Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (1 = worst, 100 = best). Other formats are lossless.
quality = 90

# Re-encode every output in this format instead of the source format.
# One of: "jpeg", "png", "tiff", "webp".
# format = "jpeg"

# ---------------------------------------------------------------------------
# Resampling
# ---------------------------------------------------------------------------
[resize]
# One of: "nearest", "triangle", "catmull-rom", "gaussian", "lanczos3".
filter = "lanczos3"

# ---------------------------------------------------------------------------
# Previews
# ---------------------------------------------------------------------------
# Default preview set for `airbrush previews` when no --size flag is given.
# [w, h] produces exactly w x h (center-crop, then scale).
# A single number bounds the longer edge and keeps the aspect ratio.
# Defining this table replaces the defaults below entirely.
[previews.sizes]
small = [200, 100]
large = [500, 250]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers when processing several files.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

//! Configuration loading from auditmod.toml.
//!
//! Every field is optional; anything left out falls back to the built-in
//! defaults in [`Thresholds`] and [`ReportOptions`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::classify::Thresholds;
use crate::error::AuditError;
use crate::report::ReportOptions;

/// Name of the configuration file looked up at the corpus root.
pub const CONFIG_FILE: &str = "auditmod.toml";

/// Main configuration structure for auditmod.toml.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct AuditConfig {
    /// Extra directory names to exclude from the corpus.
    pub exclude: Option<Vec<String>>,
    /// Classifier threshold overrides.
    pub thresholds: Option<ThresholdsConfig>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
}

/// Threshold overrides. See [`Thresholds`] for meaning and defaults.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ThresholdsConfig {
    pub high_min_issues: Option<usize>,
    pub maybe_remove_max_keep: Option<usize>,
    pub maybe_remove_min_remove: Option<usize>,
    pub bound_use_keep_above: Option<usize>,
    pub clone_hotspot: Option<usize>,
    pub read_heavy_ratio: Option<f64>,
}

/// Output format configuration.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct OutputConfig {
    /// Output format: "plain" or "json".
    pub format: Option<String>,
    /// Lines of context captured on each side of an occurrence.
    pub context_lines: Option<usize>,
    /// Number of files in the top-files ranking.
    pub top_files: Option<usize>,
    /// Findings shown per severity/category group in plain output.
    pub preview: Option<usize>,
    /// Rows in the by-type / by-name breakdown.
    pub top_groups: Option<usize>,
}

impl AuditConfig {
    /// Resolve classifier thresholds over the defaults.
    pub fn thresholds(&self) -> Thresholds {
        let defaults = Thresholds::default();
        let Some(t) = &self.thresholds else {
            return defaults;
        };
        Thresholds {
            high_min_issues: t.high_min_issues.unwrap_or(defaults.high_min_issues),
            maybe_remove_max_keep: t
                .maybe_remove_max_keep
                .unwrap_or(defaults.maybe_remove_max_keep),
            maybe_remove_min_remove: t
                .maybe_remove_min_remove
                .unwrap_or(defaults.maybe_remove_min_remove),
            bound_use_keep_above: t
                .bound_use_keep_above
                .unwrap_or(defaults.bound_use_keep_above),
            clone_hotspot: t.clone_hotspot.unwrap_or(defaults.clone_hotspot),
            read_heavy_ratio: t.read_heavy_ratio.unwrap_or(defaults.read_heavy_ratio),
        }
    }

    /// Resolve report limits over the defaults.
    pub fn report_options(&self) -> ReportOptions {
        let defaults = ReportOptions::default();
        let Some(o) = &self.output else {
            return defaults;
        };
        ReportOptions {
            top_files: o.top_files.unwrap_or(defaults.top_files),
            preview: o.preview.unwrap_or(defaults.preview),
            top_groups: o.top_groups.unwrap_or(defaults.top_groups),
        }
    }

    /// Context window radius for occurrences.
    pub fn context_lines(&self) -> Option<usize> {
        self.output.as_ref().and_then(|o| o.context_lines)
    }

    /// Whether JSON output was requested in the file.
    pub fn wants_json(&self) -> bool {
        self.output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }

    /// Extra excluded directory names.
    pub fn excluded_dirs(&self) -> Vec<String> {
        self.exclude.clone().unwrap_or_default()
    }
}

/// Loads configuration from auditmod.toml if it exists.
pub fn load_config(root: &Path) -> Result<Option<AuditConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content)
        .map_err(|e| AuditError::config(&path, e.to_string()))
        .context("Invalid auditmod.toml")?;
    Ok(Some(cfg))
}

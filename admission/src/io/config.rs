//! Admission configuration stored in `admission.toml`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::broker::BROKER_CLASS_ANNOTATION;
use crate::core::context::{CheckContext, Operation};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "admission.toml";

/// Admission configuration (TOML).
///
/// Missing fields default to the values the broker webhook ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Annotation keys that may not change once a broker exists.
    pub immutable_annotations: Vec<String>,

    /// Per-request check deadline in milliseconds. Unset means no deadline.
    ///
    /// Only rules that block (remote lookups and the like) observe it. A rule
    /// past the deadline is skipped, not failed. The built-in broker rules are
    /// pure and never read it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,

    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered violations, one per line.
    #[default]
    Text,
    /// Wire records as JSON.
    Json,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            immutable_annotations: vec![BROKER_CLASS_ANNOTATION.to_string()],
            deadline_ms: None,
            output: OutputConfig::default(),
        }
    }
}

impl AdmissionConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for key in &self.immutable_annotations {
            if key.trim().is_empty() {
                return Err(anyhow!("immutable_annotations must not contain empty keys"));
            }
            if !seen.insert(key.as_str()) {
                return Err(anyhow!("immutable_annotations contains duplicate key '{key}'"));
            }
        }
        if self.deadline_ms == Some(0) {
            return Err(anyhow!("deadline_ms must be > 0"));
        }
        Ok(())
    }

    /// Build the check context for one request.
    pub fn context(&self, operation: Operation) -> CheckContext {
        let ctx = CheckContext::new(operation)
            .with_immutable_annotations(self.immutable_annotations.iter().cloned());
        match self.deadline_ms {
            Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
            None => ctx,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AdmissionConfig::default()`.
pub fn load_config(path: &Path) -> Result<AdmissionConfig> {
    if !path.exists() {
        let cfg = AdmissionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AdmissionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AdmissionConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

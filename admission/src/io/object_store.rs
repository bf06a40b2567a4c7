//! Load brokers and admission requests from JSON files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::admission::AdmissionRequest;
use crate::broker::Broker;

/// Load a broker object from a JSON file.
pub fn load_broker(path: &Path) -> Result<Broker> {
    load_json(path)
}

/// Load an admission request from a JSON file.
pub fn load_request(path: &Path) -> Result<AdmissionRequest> {
    load_json(path)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "loading json");
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

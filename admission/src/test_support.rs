//! Test-only helpers for constructing brokers and their parts.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::TempDir;

use crate::broker::{BROKER_CLASS_ANNOTATION, Broker, DeliverySpec, ObjectReference};

/// Create a reference with explicit fields (empty strings mean "missing").
pub fn reference(namespace: &str, name: &str, kind: &str, api_version: &str) -> ObjectReference {
    ObjectReference {
        namespace: namespace.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        api_version: api_version.to_string(),
    }
}

/// A complete, valid config reference.
pub fn valid_reference() -> ObjectReference {
    reference("namespace", "name", "kind", "apiversion")
}

/// Delivery options with only `backoffDelay` set.
pub fn delivery_with_delay(delay: &str) -> DeliverySpec {
    DeliverySpec {
        backoff_delay: Some(delay.to_string()),
        ..DeliverySpec::default()
    }
}

/// Broker with the class annotation set and an empty spec.
pub fn broker_with_class(class: &str) -> Broker {
    let mut broker = Broker::default();
    broker.metadata.name = "default".to_string();
    broker
        .metadata
        .annotations
        .insert(BROKER_CLASS_ANNOTATION.to_string(), class.to_string());
    broker
}

/// Temporary directory for on-disk fixtures.
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `value` as pretty JSON to `name` and return its path.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<std::path::PathBuf> {
        let path = self.dir.path().join(name);
        let mut buf = serde_json::to_string_pretty(value).context("serialize fixture")?;
        buf.push('\n');
        std::fs::write(&path, buf).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

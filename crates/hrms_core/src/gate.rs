//! Access gate persistence.
//!
//! The gate is a pre-login step that records a display name locally. It
//! lives outside the record service and survives restarts.

use crate::error::{HrmsError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Locally persisted outcome of the access gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRecord {
    pub completed: bool,
    /// Empty when the gate was never completed.
    #[serde(default)]
    pub display_name: String,
}

impl GateRecord {
    /// Returns the stored display name, if there is one.
    pub fn display_name(&self) -> Option<&str> {
        let name = self.display_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Joins first and last name the way the gate form does.
pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// Durable key-value storage for the gate record.
pub trait GateStore: Send + Sync {
    /// Reads the record. A store that was never written reads as not completed.
    fn load(&self) -> Result<GateRecord>;

    /// Replaces the stored record.
    fn save(&self, record: &GateRecord) -> Result<()>;

    /// Removes the stored record.
    fn reset(&self) -> Result<()>;

    /// Marks the gate completed with the given name.
    fn complete(&self, first: &str, last: &str) -> Result<GateRecord> {
        let name = full_name(first, last);
        if name.is_empty() {
            return Err(HrmsError::Validation(
                "a first or last name is required to continue".to_string(),
            ));
        }
        let record = GateRecord {
            completed: true,
            display_name: name,
        };
        self.save(&record)?;
        Ok(record)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GateFile {
    #[serde(default)]
    gate: GateRecord,
}

/// Gate store backed by a toml file.
///
/// Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileGateStore {
    path: PathBuf,
}

impl FileGateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GateStore for FileGateStore {
    fn load(&self) -> Result<GateRecord> {
        if !self.path.exists() {
            return Ok(GateRecord::default());
        }
        let content = fs::read_to_string(&self.path)?;
        let file: GateFile = toml::from_str(&content).map_err(|e| {
            HrmsError::Serialization(format!(
                "invalid gate file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(file.gate)
    }

    fn save(&self, record: &GateRecord) -> Result<()> {
        let content = toml::to_string_pretty(&GateFile {
            gate: record.clone(),
        })
        .map_err(|e| HrmsError::Serialization(format!("failed to encode gate record: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-process gate store.
#[derive(Debug, Default)]
pub struct MemoryGateStore {
    record: Mutex<GateRecord>,
}

impl MemoryGateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts out with a completed gate.
    pub fn completed(display_name: &str) -> Self {
        Self {
            record: Mutex::new(GateRecord {
                completed: true,
                display_name: display_name.to_string(),
            }),
        }
    }
}

impl GateStore for MemoryGateStore {
    fn load(&self) -> Result<GateRecord> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &GateRecord) -> Result<()> {
        *self.record.lock() = record.clone();
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        *self.record.lock() = GateRecord::default();
        Ok(())
    }
}

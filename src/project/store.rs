// State stores - Where the persisted entry map lives

use crate::project::manager::ProjectError;
use crate::project::types::Entries;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persistent key-value storage for the sequencer state
pub trait StateStore {
    /// Read every stored entry. `Ok(None)` means nothing was ever saved.
    fn load(&self) -> Result<Option<Entries>, ProjectError>;

    /// Replace the stored entries
    fn store(&mut self, entries: &Entries) -> Result<(), ProjectError>;
}

/// JSON object in a single file
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<Entries>, ProjectError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&text)? {
            Value::Object(entries) => Ok(Some(entries)),
            other => Err(ProjectError::InvalidStructure(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn store(&mut self, entries: &Entries) -> Result<(), ProjectError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// In-memory store for tests and for running without a writable data dir
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Option<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Entries) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    pub fn entries(&self) -> Option<&Entries> {
        self.entries.as_ref()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<Entries>, ProjectError> {
        Ok(self.entries.clone())
    }

    fn store(&mut self, entries: &Entries) -> Result<(), ProjectError> {
        self.entries = Some(entries.clone());
        Ok(())
    }
}

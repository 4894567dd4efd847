//! Register of raw statement files that have already been ingested
//!
//! Deduplication is by filename only: a registered file is never re-read,
//! even if its contents changed on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::error::{Error, Result};

/// When a file was ingested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterEntry {
    /// ISO-8601 local timestamp
    pub timestamp: String,
}

/// Filename to ingestion record, persisted as a JSON object of objects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRegister {
    entries: BTreeMap<String, RegisterEntry>,
}

impl FileRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the register file; a missing file is an empty register
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No register at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Parse(format!("Malformed register {}: {}", path.display(), e))
        })
    }

    /// Overwrite the register file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&RegisterEntry> {
        self.entries.get(filename)
    }

    pub fn insert(&mut self, filename: impl Into<String>, entry: RegisterEntry) {
        self.entries.insert(filename.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Files in `raw_dir` that have not been ingested yet, plus the register
///
/// With `reprocess`, every file is pending and the returned register is
/// empty. Only regular files are considered; names are sorted.
pub fn list_pending(
    raw_dir: &Path,
    register_path: &Path,
    reprocess: bool,
) -> Result<(Vec<String>, FileRegister)> {
    let register = if reprocess {
        FileRegister::new()
    } else {
        FileRegister::load(register_path)?
    };

    let mut pending = Vec::new();
    for entry in fs::read_dir(raw_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !register.contains(&name) {
            pending.push(name);
        }
    }
    pending.sort();

    debug!(
        "{} pending file(s) in {}, {} already registered",
        pending.len(),
        raw_dir.display(),
        register.len()
    );
    Ok((pending, register))
}

/// Record `processed` with the current timestamp and overwrite the register
pub fn commit(
    mut register: FileRegister,
    processed: &[String],
    register_path: &Path,
) -> Result<FileRegister> {
    let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    for filename in processed {
        register.insert(
            filename.clone(),
            RegisterEntry {
                timestamp: timestamp.clone(),
            },
        );
    }
    register.save(register_path)?;
    info!(
        "Registered {} file(s) in {}",
        processed.len(),
        register_path.display()
    );
    Ok(register)
}

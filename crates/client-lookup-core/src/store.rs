//! Durable table storage
//!
//! Two read paths feed resolution: the shared store an admin may overwrite,
//! and the bundled default shipped with the deployment. The shared store is
//! re-read on every resolution; the bundled default is loaded once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tempfile::NamedTempFile;

use crate::error::{LoadError, StoreError};
use crate::normalize::{canonicalize, normalize, NormalizeOptions};
use crate::types::{DataSource, Record, SourceKind, Table};

/// A table read back from the shared store.
#[derive(Debug, Clone)]
pub struct StoredTable {
    pub table: Table,
    pub filename: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl StoredTable {
    pub fn into_source(self) -> DataSource {
        let mut source = DataSource::new(SourceKind::PersistedShared, self.table, self.filename);
        if let Some(saved_at) = self.saved_at {
            source.loaded_at = saved_at;
        }
        source
    }
}

/// The persisted shared store.
///
/// Implementations must give readers either the fully-old or the fully-new
/// table, never a mix.
pub trait TableStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<StoredTable>, LoadError>;

    fn save(&self, table: &Table, filename: Option<&str>) -> Result<(), StoreError>;

    /// Remove the persisted table. Returns whether anything was removed.
    fn clear(&self) -> Result<bool, StoreError>;

    /// Where this store lives, for diagnostics.
    fn location(&self) -> String;

    /// Whether writes are accepted at all.
    fn is_durable(&self) -> bool {
        true
    }
}

// ─── File store ───────────────────────────────────────────────

/// On-disk layout of the shared store: provenance and rows in one document,
/// so a single rename commits both.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument<T> {
    filename: Option<String>,
    saved_at: DateTime<Utc>,
    rows: usize,
    records: T,
}

/// JSON document holding the canonical table and its provenance.
///
/// Written to a temporary sibling and renamed into place, so a reader sees
/// either the previous document or the new one.
#[derive(Debug, Clone)]
pub struct FileTableStore {
    path: PathBuf,
}

impl FileTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn unreadable(&self, reason: impl ToString) -> LoadError {
        LoadError::Unreadable {
            location: self.location(),
            reason: reason.to_string(),
        }
    }
}

impl TableStore for FileTableStore {
    fn load(&self) -> Result<Option<StoredTable>, LoadError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.unreadable(e)),
        };

        let doc: StoreDocument<Vec<Record>> =
            serde_json::from_slice(&raw).map_err(|e| self.unreadable(e))?;
        if doc.rows != doc.records.len() {
            return Err(self.unreadable(format!(
                "expected {} rows, found {}",
                doc.rows,
                doc.records.len()
            )));
        }

        Ok(Some(StoredTable {
            table: canonicalize(doc.records),
            filename: doc.filename,
            saved_at: Some(doc.saved_at),
        }))
    }

    fn save(&self, table: &Table, filename: Option<&str>) -> Result<(), StoreError> {
        let doc = StoreDocument {
            filename: filename.map(str::to_string),
            saved_at: Utc::now(),
            rows: table.len(),
            records: table,
        };
        let bytes = serde_json::to_vec(&doc)?;

        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        tracing::info!(path = %self.path.display(), rows = table.len(), "Shared store replaced");
        Ok(())
    }

    fn clear(&self) -> Result<bool, StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Shared store cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ─── In-memory store ──────────────────────────────────────────

/// Process-local store, shared by every session of this process.
#[derive(Debug, Default, Clone)]
pub struct MemoryTableStore {
    inner: Arc<RwLock<Option<StoredTable>>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryTableStore {
    fn load(&self) -> Result<Option<StoredTable>, LoadError> {
        let guard = self.inner.read().map_err(|_| LoadError::Unreadable {
            location: self.location(),
            reason: "lock poisoned".to_string(),
        })?;
        Ok(guard.clone())
    }

    fn save(&self, table: &Table, filename: Option<&str>) -> Result<(), StoreError> {
        let stored = StoredTable {
            table: table.clone(),
            filename: filename.map(str::to_string),
            saved_at: Some(Utc::now()),
        };
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(stored),
            Err(poisoned) => *poisoned.into_inner() = Some(stored),
        }
        Ok(())
    }

    fn clear(&self) -> Result<bool, StoreError> {
        let previous = match self.inner.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        Ok(previous.is_some())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// A store that never holds anything (session-override deployments).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPersistence;

impl TableStore for NoPersistence {
    fn load(&self) -> Result<Option<StoredTable>, LoadError> {
        Ok(None)
    }

    fn save(&self, _table: &Table, _filename: Option<&str>) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "persistence disabled",
        )))
    }

    fn clear(&self) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn location(&self) -> String {
        "none".to_string()
    }

    fn is_durable(&self) -> bool {
        false
    }
}

// ─── Bundled default ──────────────────────────────────────────

/// The table shipped with the deployment, loaded lazily and cached.
#[derive(Debug)]
pub struct BundledDefault {
    path: PathBuf,
    opts: NormalizeOptions,
    cached: Mutex<Option<DataSource>>,
}

impl BundledDefault {
    pub fn new(path: impl Into<PathBuf>, opts: NormalizeOptions) -> Self {
        Self {
            path: path.into(),
            opts,
            cached: Mutex::new(None),
        }
    }

    /// Build from an already-normalized table (tests, embedded defaults).
    pub fn preloaded(path: impl Into<PathBuf>, table: Table) -> Self {
        let path = path.into();
        let source = DataSource::new(SourceKind::BundledDefault, table, file_name(&path));
        Self {
            path,
            opts: NormalizeOptions::default(),
            cached: Mutex::new(Some(source)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load on first call; later calls return the cached source. Failures are
    /// not cached.
    pub fn load(&self) -> Result<DataSource, LoadError> {
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(source) = cached.as_ref() {
            return Ok(source.clone());
        }

        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::MissingBundledDefault {
                    path: self.path.clone(),
                })
            }
            Err(e) => {
                return Err(LoadError::Unreadable {
                    location: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let table = normalize(&raw, self.opts).map_err(|e| LoadError::Unreadable {
            location: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!(path = %self.path.display(), rows = table.len(), "Bundled default loaded");
        let source = DataSource::new(SourceKind::BundledDefault, table, file_name(&self.path));
        *cached = Some(source.clone());
        Ok(source)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

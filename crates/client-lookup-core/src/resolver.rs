//! Dataset resolution
//!
//! Exactly one table is authoritative for a session at any instant. The
//! candidates are checked in a fixed order, highest priority first:
//!
//! ```text
//! session override ──► persisted shared store ──► bundled default
//!   (this session)       (every session)           (deployment file)
//! ```
//!
//! An unreadable shared store is stepped past, logged, and recorded on the
//! resulting [`DataSource`]. A missing bundled default with nothing above it
//! is fatal for the request.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ConfigError, IngestError, LoadError};
use crate::normalize::{normalize, NormalizeOptions};
use crate::store::{BundledDefault, TableStore};
use crate::types::{DataSource, Fallback, Session, SourceKind};

/// What an admin upload replaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Upload is visible only to the uploading session, until reverted.
    #[default]
    SessionOverride,
    /// Upload replaces the durable shared store for every session.
    PersistedShared,
}

impl FromStr for IngestMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" | "session_override" | "session-override" => Ok(Self::SessionOverride),
            "shared" | "persisted" | "persisted_shared" | "persisted-shared" => {
                Ok(Self::PersistedShared)
            }
            other => Err(ConfigError::UnknownIngestMode(other.to_string())),
        }
    }
}

/// State of the shared store as observed for one resolution.
#[derive(Debug, Clone)]
pub enum PersistedState {
    Absent,
    Present(DataSource),
    Unreadable(LoadError),
}

impl PersistedState {
    /// Observe `store` once.
    pub fn observe(store: &dyn TableStore) -> Self {
        match store.load() {
            Ok(Some(stored)) => Self::Present(stored.into_source()),
            Ok(None) => Self::Absent,
            Err(e) => Self::Unreadable(e),
        }
    }
}

/// Pick the authoritative source for `session`.
///
/// The bundled default is only touched when neither higher-priority source
/// is usable.
pub fn resolve(
    session: &Session,
    persisted: PersistedState,
    bundled: &BundledDefault,
) -> Result<DataSource, LoadError> {
    if let Some(source) = session.override_source() {
        return Ok(source.clone());
    }

    let fallback = match persisted {
        PersistedState::Present(source) => return Ok(source),
        PersistedState::Absent => None,
        PersistedState::Unreadable(e) => {
            tracing::warn!(error = %e, "Shared store unreadable, falling back to bundled default");
            Some(Fallback {
                skipped: SourceKind::PersistedShared,
                reason: e.to_string(),
            })
        }
    };

    let source = bundled.load().map_err(|e| {
        tracing::error!(error = %e, "No resolvable table");
        e
    })?;

    Ok(match fallback {
        Some(fallback) => source.with_fallback(fallback),
        None => source,
    })
}

/// Resolution plus the admin mutation paths.
pub struct DatasetResolver {
    store: Arc<dyn TableStore>,
    bundled: BundledDefault,
    mode: IngestMode,
    max_upload_bytes: usize,
    has_header: bool,
}

impl DatasetResolver {
    pub fn new(store: Arc<dyn TableStore>, bundled: BundledDefault, mode: IngestMode) -> Self {
        Self {
            store,
            bundled,
            mode,
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
            has_header: false,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Treat the first row of uploads as a header.
    pub fn with_header_row(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    pub fn resolve(&self, session: &Session) -> Result<DataSource, LoadError> {
        let persisted = if session.override_source().is_some() {
            // Shadowed anyway; skip the disk read.
            PersistedState::Absent
        } else {
            PersistedState::observe(self.store.as_ref())
        };
        resolve(session, persisted, &self.bundled)
    }

    /// Validate, normalize and install an uploaded table.
    ///
    /// Returns the successor session and the new authoritative source. On any
    /// error the caller keeps its previous session and nothing is written.
    pub fn ingest(
        &self,
        session: &Session,
        raw: &[u8],
        filename: &str,
    ) -> Result<(Session, DataSource), IngestError> {
        if !session.is_admin() {
            tracing::warn!(session_id = %session.id(), role = %session.role(), "Upload rejected: not admin");
            return Err(IngestError::Forbidden);
        }
        if raw.len() > self.max_upload_bytes {
            return Err(IngestError::TooLarge {
                size: raw.len(),
                limit: self.max_upload_bytes,
            });
        }

        let opts = NormalizeOptions::for_filename(filename, self.has_header);
        let table = normalize(raw, opts).map_err(|e| {
            tracing::warn!(session_id = %session.id(), filename, error = %e, "Upload rejected");
            e
        })?;
        let filename = Some(filename.to_string()).filter(|f| !f.is_empty());

        match self.mode {
            IngestMode::SessionOverride => {
                let source = DataSource::new(SourceKind::SessionOverride, table, filename);
                tracing::info!(
                    session_id = %session.id(),
                    rows = source.row_count(),
                    "Session override installed"
                );
                let next = session.clone().with_override(Some(source.clone()));
                Ok((next, source))
            }
            IngestMode::PersistedShared => {
                if !self.store.is_durable() {
                    return Err(IngestError::NotPersisted);
                }
                self.store.save(&table, filename.as_deref())?;
                tracing::info!(
                    session_id = %session.id(),
                    rows = table.len(),
                    location = %self.store.location(),
                    "Shared table replaced"
                );
                let next = session.clone().with_override(None);
                let source = self.resolve(&next)?;
                Ok((next, source))
            }
        }
    }

    /// Drop the session's override and resolve again.
    pub fn revert(&self, session: &Session) -> Result<(Session, DataSource), LoadError> {
        if session.override_source().is_some() {
            tracing::info!(session_id = %session.id(), "Session override reverted");
        }
        let next = session.clone().with_override(None);
        let source = self.resolve(&next)?;
        Ok((next, source))
    }

    /// Remove the shared table so every session falls back to the bundled
    /// default. Admin only.
    pub fn reset_shared(&self, session: &Session) -> Result<DataSource, IngestError> {
        if !session.is_admin() {
            return Err(IngestError::Forbidden);
        }
        if !self.store.is_durable() {
            return Err(IngestError::NotPersisted);
        }
        if self.store.clear()? {
            tracing::info!(session_id = %session.id(), location = %self.store.location(), "Shared table reset");
        }
        Ok(self.resolve(session)?)
    }
}

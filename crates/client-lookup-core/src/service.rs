//! LookupService - the callable surface for presentation layers
//!
//! Bundles the access controller, the dataset resolver and the search engine
//! behind the five operations a front end needs. Every method takes the
//! caller's [`Session`] by reference and, where state changes, returns the
//! successor session alongside the result.

use serde::{Deserialize, Serialize};

use crate::access::AccessController;
use crate::config::LookupConfig;
use crate::error::{AuthError, ConfigError, IngestError, LoadError};
use crate::resolver::{DatasetResolver, IngestMode};
use crate::search::{search, SearchOutcome};
use crate::types::{DataSource, Provenance, Record, Session};

/// What the presentation layer shows for the current query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LookupView {
    /// No query typed: the first rows of the table.
    Preview {
        source: Provenance,
        rows: Vec<Record>,
    },
    /// Full match set for a non-blank query.
    Results {
        source: Provenance,
        #[serde(flatten)]
        outcome: SearchOutcome,
    },
}

impl LookupView {
    pub fn source(&self) -> &Provenance {
        match self {
            LookupView::Preview { source, .. } | LookupView::Results { source, .. } => source,
        }
    }

    pub fn rows(&self) -> &[Record] {
        match self {
            LookupView::Preview { rows, .. } => rows,
            LookupView::Results { outcome, .. } => &outcome.matches,
        }
    }
}

pub struct LookupService {
    access: AccessController,
    resolver: DatasetResolver,
    preview_rows: usize,
}

impl LookupService {
    pub fn new(access: AccessController, resolver: DatasetResolver, preview_rows: usize) -> Self {
        Self {
            access,
            resolver,
            preview_rows: preview_rows.max(1),
        }
    }

    pub fn from_config(config: &LookupConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.access_controller(),
            config.dataset_resolver()?,
            config.preview_rows,
        ))
    }

    pub fn ingest_mode(&self) -> IngestMode {
        self.resolver.mode()
    }

    pub fn preview_rows(&self) -> usize {
        self.preview_rows
    }

    pub fn authenticate(&self, session: &Session, credential: &str) -> Result<Session, AuthError> {
        self.access.login(session, credential)
    }

    pub fn resolve(&self, session: &Session) -> Result<DataSource, LoadError> {
        self.resolver.resolve(session)
    }

    pub fn ingest(
        &self,
        session: &Session,
        raw: &[u8],
        filename: &str,
    ) -> Result<(Session, DataSource), IngestError> {
        self.resolver.ingest(session, raw, filename)
    }

    pub fn revert(&self, session: &Session) -> Result<(Session, DataSource), LoadError> {
        self.resolver.revert(session)
    }

    pub fn reset_shared(&self, session: &Session) -> Result<DataSource, IngestError> {
        self.resolver.reset_shared(session)
    }

    /// Search the session's authoritative table.
    pub fn search(&self, session: &Session, query: &str) -> Result<Vec<Record>, LoadError> {
        let source = self.resolve(session)?;
        Ok(search(&source.table, query))
    }

    /// Preview for a blank query, full results otherwise.
    pub fn lookup(&self, session: &Session, query: &str) -> Result<LookupView, LoadError> {
        let source = self.resolve(session)?;
        let provenance = source.provenance();
        if query.trim().is_empty() {
            return Ok(LookupView::Preview {
                source: provenance,
                rows: source.table.preview(self.preview_rows).to_vec(),
            });
        }
        Ok(LookupView::Results {
            source: provenance,
            outcome: SearchOutcome::run(&source.table, query),
        })
    }
}

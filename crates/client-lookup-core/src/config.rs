//! Deployment configuration
//!
//! Populated by the binary (CLI flags / environment) and validated once at
//! startup. The core never reads the environment itself.

use std::path::PathBuf;
use std::sync::Arc;

use crate::access::{AccessController, Secrets};
use crate::error::ConfigError;
use crate::normalize::NormalizeOptions;
use crate::resolver::{DatasetResolver, IngestMode};
use crate::search::DEFAULT_PREVIEW_ROWS;
use crate::store::{BundledDefault, FileTableStore, NoPersistence, TableStore};

/// Default location of the bundled default table
pub const DEFAULT_BUNDLED_PATH: &str = "data/crm_contacts.csv";

/// Default upload size limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub secrets: Secrets,
    pub bundled_default: PathBuf,
    /// Shared store file. Required in persisted mode; when set in
    /// session-override mode it is still honoured as a read-only tier.
    pub persisted_path: Option<PathBuf>,
    pub ingest_mode: IngestMode,
    pub preview_rows: usize,
    pub max_upload_bytes: usize,
    /// Whether tabular files start with a header row
    pub has_header: bool,
}

impl LookupConfig {
    pub fn new(secrets: Secrets) -> Self {
        Self {
            secrets,
            bundled_default: PathBuf::from(DEFAULT_BUNDLED_PATH),
            persisted_path: None,
            ingest_mode: IngestMode::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            has_header: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest_mode == IngestMode::PersistedShared && self.persisted_path.is_none() {
            return Err(ConfigError::MissingPersistedPath);
        }
        if self.preview_rows == 0 {
            return Err(ConfigError::ZeroPreviewRows);
        }
        Ok(())
    }

    pub fn access_controller(&self) -> AccessController {
        AccessController::new(self.secrets.clone())
    }

    pub fn table_store(&self) -> Arc<dyn TableStore> {
        match &self.persisted_path {
            Some(path) => Arc::new(FileTableStore::new(path)),
            None => Arc::new(NoPersistence),
        }
    }

    /// Validate and build the resolver for this deployment.
    pub fn dataset_resolver(&self) -> Result<DatasetResolver, ConfigError> {
        self.validate()?;
        let bundled = BundledDefault::new(
            &self.bundled_default,
            NormalizeOptions::for_filename(
                &self.bundled_default.to_string_lossy(),
                self.has_header,
            ),
        );
        Ok(
            DatasetResolver::new(self.table_store(), bundled, self.ingest_mode)
                .with_max_upload_bytes(self.max_upload_bytes)
                .with_header_row(self.has_header),
        )
    }
}

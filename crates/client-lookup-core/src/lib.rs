//! Client Lookup Core
//!
//! Decision logic for a shared, password-gated client lookup: which table is
//! authoritative for a session, how uploaded tables are normalized, how
//! substring queries are answered, and which role a credential grants.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  Presentation layer (HTTP server, CLI, ...)              │
//! └──────────────────────────────────────────────────────────┘
//!          │ authenticate   │ resolve / ingest / revert   │ search
//!          ▼                ▼                             ▼
//! ┌──────────────┐  ┌──────────────────────┐   ┌──────────────────┐
//! │ Access       │  │ Dataset Resolver     │──►│ Search Engine    │
//! │ Controller   │  │ override > shared >  │   │ any-column,      │
//! │ user / admin │  │ bundled default      │   │ case-insensitive │
//! └──────────────┘  └──────────────────────┘   └──────────────────┘
//!                            │
//!                            ▼
//!                   TableStore (file / memory)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use client_lookup_core::{LookupConfig, LookupService, Secrets, Session};
//!
//! let config = LookupConfig::new(Secrets::new("user-pw", "admin-pw")?);
//! let service = LookupService::from_config(&config)?;
//!
//! let session = service.authenticate(&Session::new(), "user-pw")?;
//! let matches = service.search(&session, "smith")?;
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod normalize;
pub mod resolver;
pub mod search;
pub mod service;
pub mod store;
pub mod types;

// Re-export main types
pub use access::{AccessController, Secrets};
pub use config::LookupConfig;
pub use error::{AuthError, ConfigError, IngestError, LoadError, LookupError, StoreError};
pub use normalize::{normalize, InputFormat, NormalizeOptions};
pub use resolver::{resolve, DatasetResolver, IngestMode, PersistedState};
pub use search::{preview, search, SearchOutcome};
pub use service::{LookupService, LookupView};
pub use store::{BundledDefault, FileTableStore, MemoryTableStore, NoPersistence, TableStore};
pub use types::{DataSource, Fallback, Provenance, Record, Role, Session, SourceKind, Table};

//! Command-line and environment configuration
//!
//! Every flag can also be supplied through its `LOOKUP_*` variable, and a
//! `.env` file in the working directory is read before parsing.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use client_lookup_core::config::{DEFAULT_BUNDLED_PATH, DEFAULT_MAX_UPLOAD_BYTES};
use client_lookup_core::search::DEFAULT_PREVIEW_ROWS;
use client_lookup_core::{ConfigError, IngestMode, LookupConfig, Secrets};

use crate::state::DEFAULT_SESSION_TTL_MINS;

#[derive(Parser, Debug)]
#[command(name = "client-lookup")]
#[command(about = "Password-gated client lookup over a shared CRM table")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LOOKUP_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Credential granting read access
    #[arg(long, env = "LOOKUP_ACCESS_PASSWORD", hide_env_values = true)]
    pub access_password: String,

    /// Credential granting admin access (upload, revert, reset)
    #[arg(long, env = "LOOKUP_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// Bundled default table shipped with the deployment
    #[arg(long, env = "LOOKUP_BUNDLED_DEFAULT", default_value = DEFAULT_BUNDLED_PATH)]
    pub bundled_default: PathBuf,

    /// Shared store file (required for --ingest-mode shared)
    #[arg(long, env = "LOOKUP_PERSISTED_PATH")]
    pub persisted_path: Option<PathBuf>,

    /// What an admin upload replaces: "session" or "shared"
    #[arg(long, env = "LOOKUP_INGEST_MODE", default_value = "session")]
    pub ingest_mode: IngestMode,

    /// Rows shown when the query is blank
    #[arg(long, env = "LOOKUP_PREVIEW_ROWS", default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "LOOKUP_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Treat the first row of every table as a header
    #[arg(long, env = "LOOKUP_HAS_HEADER")]
    pub has_header: bool,

    /// Minutes a session stays valid after login
    #[arg(
        long,
        env = "LOOKUP_SESSION_TTL_MINS",
        default_value_t = DEFAULT_SESSION_TTL_MINS,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub session_ttl_mins: i64,
}

impl Args {
    pub fn into_config(self) -> Result<LookupConfig, ConfigError> {
        let mut config = LookupConfig::new(Secrets::new(self.access_password, self.admin_password)?);
        config.bundled_default = self.bundled_default;
        config.persisted_path = self.persisted_path;
        config.ingest_mode = self.ingest_mode;
        config.preview_rows = self.preview_rows;
        config.max_upload_bytes = self.max_upload_bytes;
        config.has_header = self.has_header;
        config.validate()?;
        Ok(config)
    }
}

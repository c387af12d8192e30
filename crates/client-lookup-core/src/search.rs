//! Case-insensitive substring search across all three columns
//!
//! Query and fields are compared after Unicode lowercasing
//! ([`str::to_lowercase`]). That is not full case folding: one-to-many
//! folds such as `ß` / `SS` do not match each other.

use serde::{Deserialize, Serialize};

use crate::types::{Record, Table};

/// Rows shown when no query has been typed.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Records where any field contains `query`, ignoring case, in table order.
///
/// Callers are expected to show [`preview`] for a blank query instead; if a
/// blank query does arrive the whole table is returned.
pub fn search(table: &Table, query: &str) -> Vec<Record> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return table.records().to_vec();
    }
    table
        .rows()
        .filter(|(_, folded)| folded.contains(&needle))
        .map(|(record, _)| record.clone())
        .collect()
}

/// First `n` records of `table`.
pub fn preview(table: &Table, n: usize) -> Vec<Record> {
    table.preview(n).to_vec()
}

/// A query together with its full match set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub total_rows: usize,
    pub matches: Vec<Record>,
}

impl SearchOutcome {
    pub fn run(table: &Table, query: &str) -> Self {
        Self {
            query: query.trim().to_string(),
            total_rows: table.len(),
            matches: search(table, query),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

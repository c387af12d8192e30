use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ─── Record / Table ───────────────────────────────────────────

/// One normalized row. Fields are trimmed and never carry a null marker.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub category: String,
    pub advisor: String,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        advisor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            advisor: advisor.into(),
        }
    }

    pub fn fields(&self) -> [&str; 3] {
        [&self.name, &self.category, &self.advisor]
    }
}

/// Lowercased copy of a record's fields, built once per table. Simple
/// lowercasing only, not full Unicode case folding.
#[derive(Clone, Debug)]
pub(crate) struct FoldedRecord(pub(crate) [String; 3]);

impl FoldedRecord {
    fn of(record: &Record) -> Self {
        Self(record.fields().map(str::to_lowercase))
    }

    pub(crate) fn contains(&self, folded_query: &str) -> bool {
        self.0.iter().any(|field| field.contains(folded_query))
    }
}

/// Ordered, immutable sequence of records in source order.
///
/// Serializes as the plain record list.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "Vec<Record>")]
pub struct Table {
    records: Vec<Record>,
    folded: Vec<FoldedRecord>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        let folded = records.iter().map(FoldedRecord::of).collect();
        Self { records, folded }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First `n` records, for the "nothing typed yet" view.
    pub fn preview(&self, n: usize) -> &[Record] {
        &self.records[..n.min(self.records.len())]
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = (&Record, &FoldedRecord)> {
        self.records.iter().zip(self.folded.iter())
    }
}

impl From<Vec<Record>> for Table {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for Table {}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}

// ─── DataSource ───────────────────────────────────────────────

/// Where an authoritative table came from, lowest priority first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    BundledDefault,
    PersistedShared,
    SessionOverride,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SourceKind::BundledDefault => "bundled-default",
            SourceKind::PersistedShared => "persisted-shared",
            SourceKind::SessionOverride => "session-override",
        };
        f.write_str(tag)
    }
}

/// A higher-priority source that resolution had to step past.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub skipped: SourceKind,
    pub reason: String,
}

/// A table plus its provenance.
#[derive(Clone, Debug)]
pub struct DataSource {
    pub kind: SourceKind,
    pub table: Arc<Table>,
    pub filename: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub fallback: Option<Fallback>,
}

impl DataSource {
    pub fn new(kind: SourceKind, table: impl Into<Arc<Table>>, filename: Option<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            filename,
            loaded_at: Utc::now(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn row_count(&self) -> usize {
        self.table.len()
    }

    /// Human-readable provenance, e.g. `Uploaded file clients.csv (120 rows)`.
    pub fn label(&self) -> String {
        let origin = match self.kind {
            SourceKind::BundledDefault => "Default file",
            SourceKind::PersistedShared => "Shared file",
            SourceKind::SessionOverride => "Uploaded file",
        };
        match &self.filename {
            Some(name) => format!("{origin} {name} ({} rows)", self.row_count()),
            None => format!("{origin} ({} rows)", self.row_count()),
        }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance {
            kind: self.kind,
            label: self.label(),
            filename: self.filename.clone(),
            rows: self.row_count(),
            loaded_at: self.loaded_at,
            fallback: self.fallback.clone(),
        }
    }
}

/// Serializable summary of a [`DataSource`] without its rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub kind: SourceKind,
    pub label: String,
    pub filename: Option<String>,
    pub rows: usize,
    pub loaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
}

// ─── Session ──────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Anonymous,
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Per-connection state. Operations never mutate a session in place; they
/// return the successor value.
///
/// Fields are private: a role is only ever granted by
/// [`AccessController::login`](crate::access::AccessController::login), and an
/// override only ever installed by an admin ingest.
#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    role: Role,
    override_source: Option<DataSource>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Anonymous,
            override_source: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The table this session uploaded, if it has not been reverted.
    pub fn override_source(&self) -> Option<&DataSource> {
        self.override_source.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Anonymous
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub(crate) fn with_role(self, role: Role) -> Self {
        Self { role, ..self }
    }

    pub(crate) fn with_override(self, source: Option<DataSource>) -> Self {
        Self {
            override_source: source,
            ..self
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

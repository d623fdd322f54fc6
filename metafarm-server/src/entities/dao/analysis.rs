use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

/// Lifecycle state of an analysis record.
///
/// A record starts `Pending` and moves exactly once to `Completed` or
/// `Failed`. The store itself does not police the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Completed,
    Failed,
}

/// A row in the `analysis` table.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: i64,
    /// Plant name; empty until completed.
    pub name: String,
    pub days_between_water: i64,
    pub days_to_maturity: i64,
    pub status: AnalysisStatus,
    /// Diagnostic text; only populated when `status` is `Failed`.
    pub error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use crate::entities::{
    dao::{AnalysisRecord, AnalysisStatus},
    SqliteStore,
};

use chrono::{DateTime, Utc};
use std::future::Future;
use std::str::FromStr;

pub trait AnalysisStore: Send + Sync + 'static {
    /// Insert a new `pending` record and return its id.
    fn create_analysis(&self) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// Mark a record `completed` with the parsed result.
    ///
    /// Succeeds without effect when `id` does not exist.
    fn update_analysis(
        &self,
        id: i64,
        name: &str,
        days_between_water: i64,
        days_to_maturity: i64,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Overwrite `status` and `error`. Used for failure transitions.
    ///
    /// Succeeds without effect when `id` does not exist.
    fn update_analysis_status(
        &self,
        id: i64,
        status: AnalysisStatus,
        error: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Fetch a record. `Ok(None)` means no such id.
    fn get_analysis(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<AnalysisRecord>, sqlx::Error>> + Send;

    /// Fail every record still `pending`; returns the number touched.
    fn fail_pending_analyses(
        &self,
        error: &str,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

type AnalysisRow = (i64, String, i64, i64, String, String, String, String);

impl AnalysisStore for SqliteStore {
    async fn create_analysis(&self) -> Result<i64, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO analysis (status, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(AnalysisStatus::Pending.as_ref())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn update_analysis(
        &self,
        id: i64,
        name: &str,
        days_between_water: i64,
        days_to_maturity: i64,
    ) -> Result<(), sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE analysis SET name = ?1, days_between_water = ?2, days_to_maturity = ?3, \
             status = ?4, updated_at = ?5 WHERE id = ?6",
        )
        .bind(name)
        .bind(days_between_water)
        .bind(days_to_maturity)
        .bind(AnalysisStatus::Completed.as_ref())
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_analysis_status(
        &self,
        id: i64,
        status: AnalysisStatus,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();
        sqlx::query("UPDATE analysis SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(status.as_ref())
            .bind(error)
            .bind(&updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisRecord>, sqlx::Error> {
        let row: Option<AnalysisRow> = sqlx::query_as(
            "SELECT id, name, days_between_water, days_to_maturity, status, error, created_at, updated_at \
             FROM analysis WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(to_record).transpose()
    }

    async fn fail_pending_analyses(&self, error: &str) -> Result<u64, sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE analysis SET status = ?1, error = ?2, updated_at = ?3 WHERE status = ?4",
        )
        .bind(AnalysisStatus::Failed.as_ref())
        .bind(error)
        .bind(&updated_at)
        .bind(AnalysisStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn to_record(
    (id, name, days_between_water, days_to_maturity, status, error, created_at, updated_at): AnalysisRow,
) -> Result<AnalysisRecord, sqlx::Error> {
    let status = AnalysisStatus::from_str(&status).map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_owned(),
        source: Box::new(e),
    })?;
    Ok(AnalysisRecord {
        id,
        name,
        days_between_water,
        days_to_maturity,
        status,
        error,
        created_at: parse_timestamp(&created_at, "created_at"),
        updated_at: parse_timestamp(&updated_at, "updated_at"),
    })
}

fn parse_timestamp(raw: &str, column: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse analysis timestamp; using now");
        Utc::now()
    })
}

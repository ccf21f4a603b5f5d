use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

pub const REPORT_TYPES: [&str; 2] = ["csv", "pdf"];

pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Serialize, FromRow)]
pub struct Report {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub file_path: String,
    pub report_type: String,
    #[serde(skip_serializing)]
    pub filters: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Report {
    /// The filter snapshot is stored as opaque JSON text.
    pub fn filters_json(&self) -> Option<serde_json::Value> {
        self.filters
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Fetch a report scoped to its owner.
pub async fn find_report_for_user(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

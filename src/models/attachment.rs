use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Serialize, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub task_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub thumbnail_path: Option<String>,
    pub uploaded_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Attachment row joined with its uploader.
#[derive(Debug, FromRow)]
pub struct AttachmentRow {
    pub id: i64,
    pub task_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub thumbnail_path: Option<String>,
    pub uploaded_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub uploader_name: String,
    pub uploader_email: String,
}

pub const ATTACHMENT_ROW_SELECT: &str = "SELECT a.id, a.task_id, a.file_name, a.file_path, \
     a.file_size, a.mime_type, a.thumbnail_path, a.uploaded_by, a.created_at, a.updated_at, \
     u.name AS uploader_name, u.email AS uploader_email \
     FROM task_attachments a \
     JOIN users u ON a.uploaded_by = u.id";

pub async fn find_attachment(pool: &SqlitePool, id: i64) -> Result<Option<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>("SELECT * FROM task_attachments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_attachment_row(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<AttachmentRow>, sqlx::Error> {
    let sql = format!("{ATTACHMENT_ROW_SELECT} WHERE a.id = ?");
    sqlx::query_as::<_, AttachmentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::attachment::AttachmentRow;
use crate::models::user::UserSummary;

#[derive(Serialize)]
pub struct AttachmentResponse {
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
    pub uploader: UserSummary,
}

impl From<AttachmentRow> for AttachmentResponse {
    fn from(row: AttachmentRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            file_name: row.file_name,
            file_path: row.file_path,
            file_size: row.file_size,
            mime_type: row.mime_type,
            thumbnail_path: row.thumbnail_path,
            uploaded_by: row.uploaded_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            uploader: UserSummary {
                id: row.uploaded_by,
                name: row.uploader_name,
                email: row.uploader_email,
            },
        }
    }
}

#[derive(Serialize)]
pub struct AttachmentEnvelope {
    pub message: String,
    pub attachment: AttachmentResponse,
}

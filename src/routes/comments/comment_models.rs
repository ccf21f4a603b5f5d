use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::comment::CommentRow;
use crate::models::user::UserSummary;

#[derive(Deserialize)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub user: UserSummary,
}

impl From<CommentRow> for CommentResponse {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            user_id: row.user_id,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSummary {
                id: row.user_id,
                name: row.author_name,
                email: row.author_email,
            },
        }
    }
}

#[derive(Serialize)]
pub struct CommentEnvelope {
    pub message: String,
    pub comment: CommentResponse,
}

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Comment row joined with its author.
#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub author_name: String,
    pub author_email: String,
}

pub const COMMENT_ROW_SELECT: &str = "SELECT c.id, c.task_id, c.user_id, c.comment, \
     c.created_at, c.updated_at, u.name AS author_name, u.email AS author_email \
     FROM task_comments c \
     JOIN users u ON c.user_id = u.id";

pub async fn find_comment(pool: &SqlitePool, id: i64) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>("SELECT * FROM task_comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_comment_row(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<CommentRow>, sqlx::Error> {
    let sql = format!("{COMMENT_ROW_SELECT} WHERE c.id = ?");
    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

pub const STATUSES: [&str; 3] = ["pending", "in_progress", "completed"];
pub const PRIORITIES: [&str; 3] = ["low", "medium", "high"];

#[derive(Debug, Serialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<NaiveDate>,
    pub user_id: i64,
    pub assigned_to: Option<i64>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Creator and assignee are the only users who may see or modify a task.
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.user_id == user_id || self.assigned_to == Some(user_id)
    }
}

/// Task row joined with its creator and (optional) assignee.
#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<NaiveDate>,
    pub user_id: i64,
    pub assigned_to: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub creator_name: String,
    pub creator_email: String,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

pub const TASK_ROW_SELECT: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, \
     t.due_date, t.user_id, t.assigned_to, t.created_at, t.updated_at, \
     cu.name AS creator_name, cu.email AS creator_email, \
     au.name AS assignee_name, au.email AS assignee_email \
     FROM tasks t \
     JOIN users cu ON t.user_id = cu.id \
     LEFT JOIN users au ON t.assigned_to = au.id";

/// Fetch a live (not soft-deleted) task by id.
pub async fn find_task(pool: &SqlitePool, id: i64) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND deleted_at IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_task_row(pool: &SqlitePool, id: i64) -> Result<Option<TaskRow>, sqlx::Error> {
    let sql = format!("{TASK_ROW_SELECT} WHERE t.id = ? AND t.deleted_at IS NULL");
    sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use super::notify::NotifyTask;
use super::{Job, JobContext, JobError};
use crate::models::task::find_task;

/// Apply one status/priority change across many tasks.
///
/// `user_id` is the acting user captured when the request was accepted;
/// per-task authorization is re-checked against that capture, not against
/// whatever the user's session looks like by the time the job runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateTasks {
    pub task_ids: Vec<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub user_id: i64,
}

impl BulkUpdateTasks {
    pub async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        info!(
            "Starting bulk update for user {} ({} tasks)",
            self.user_id,
            self.task_ids.len()
        );

        let mut updated_count = 0;

        for &task_id in &self.task_ids {
            let task = match find_task(&ctx.pool, task_id).await? {
                Some(task) => task,
                None => continue,
            };

            // Tasks the captured user may not modify are silently skipped.
            if !task.is_visible_to(self.user_id) {
                continue;
            }

            let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
            let mut fields = qb.separated(", ");
            if let Some(status) = &self.status {
                fields.push("status = ").push_bind_unseparated(status.clone());
            }
            if let Some(priority) = &self.priority {
                fields
                    .push("priority = ")
                    .push_bind_unseparated(priority.clone());
            }
            fields
                .push("updated_at = ")
                .push_bind_unseparated(Utc::now().naive_utc());
            qb.push(" WHERE id = ").push_bind(task_id);

            qb.build().execute(&ctx.pool).await?;
            updated_count += 1;

            ctx.queue
                .dispatch(Job::Notify(NotifyTask::new(task_id, "updated")));
        }

        info!("Bulk update completed: {} tasks updated", updated_count);
        Ok(())
    }

    pub fn failed(&self, error: &JobError) {
        error!("Bulk update job failed for user {}: {}", self.user_id, error);
    }
}

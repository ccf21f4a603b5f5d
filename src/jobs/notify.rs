use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{JobContext, JobError};
use crate::models::task::{find_task, Task};
use crate::models::user::UserSummary;

/// Email the users involved with a task after a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyTask {
    pub task_id: i64,
    pub action: String,
}

impl NotifyTask {
    pub fn new(task_id: i64, action: &str) -> Self {
        Self {
            task_id,
            action: action.to_string(),
        }
    }

    pub async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        let task = match find_task(&ctx.pool, self.task_id).await? {
            Some(task) => task,
            None => {
                // The task was deleted between enqueue and execution.
                warn!("Skipping notification for missing task {}", self.task_id);
                return Ok(());
            }
        };

        let recipients = self.recipients(&ctx.pool, &task).await?;
        for user in &recipients {
            let subject = self.subject(&task);
            let body = self.body(user, &task);
            info!("Sending task notification to {}: {}", user.email, subject);
            // One recipient failing must not abort the others.
            if let Err(e) = ctx.mailer.send(&user.email, &subject, &body).await {
                error!("Failed to send email to {}: {}", user.email, e);
            }
        }

        info!(
            "Task notification processed for task {} (action {}, {} recipients)",
            task.id,
            self.action,
            recipients.len()
        );
        Ok(())
    }

    pub fn failed(&self, error: &JobError) {
        error!(
            "Notify job failed for task {}: {}",
            self.task_id, error
        );
    }

    /// Creator, plus the assignee when distinct from the creator.
    async fn recipients(
        &self,
        pool: &SqlitePool,
        task: &Task,
    ) -> Result<Vec<UserSummary>, JobError> {
        let mut ids = vec![task.user_id];
        if let Some(assignee_id) = task.assigned_to {
            if assignee_id != task.user_id {
                ids.push(assignee_id);
            }
        }

        let mut users = Vec::new();
        for id in ids {
            let user =
                sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = ?")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
            if let Some(user) = user {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn subject(&self, task: &Task) -> String {
        match self.action.as_str() {
            "created" => format!("New Task Assigned: {}", task.title),
            "updated" => format!("Task Updated: {}", task.title),
            "status_updated" => format!("Task Status Changed: {}", task.title),
            _ => format!("Task Notification: {}", task.title),
        }
    }

    fn body(&self, user: &UserSummary, task: &Task) -> String {
        let action_text = match self.action.as_str() {
            "created" => "a new task has been assigned to you",
            "updated" => "a task has been updated",
            "status_updated" => "the task status has been changed",
            _ => "there is an update",
        };
        format!(
            "Hello {}, {} for task: '{}'",
            user.name, action_text, task.title
        )
    }
}

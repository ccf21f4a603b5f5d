use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{JobContext, JobError};
use crate::models::report::{STATUS_COMPLETED, STATUS_FAILED, STATUS_PROCESSING};
use crate::models::task::{TaskRow, TASK_ROW_SELECT};

pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "Title",
    "Description",
    "Status",
    "Priority",
    "Due Date",
    "Created By",
    "Assigned To",
    "Created At",
    "Updated At",
];

/// Filter snapshot captured when the report was requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<chrono::NaiveDate>,
}

/// Render the requesting user's filtered task list to a file in storage
/// and move the report row out of `processing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTaskReport {
    pub user_id: i64,
    pub filters: ReportFilters,
    pub report_type: String,
    pub report_id: Option<i64>,
}

impl GenerateTaskReport {
    pub async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        info!(
            "Starting {} report generation for user {} (report {:?})",
            self.report_type, self.user_id, self.report_id
        );

        let report_id = self.resolve_report(&ctx.pool).await?;

        match self.generate(ctx).await {
            Ok((file_path, filename)) => {
                sqlx::query(
                    "UPDATE reports SET status = ?, file_path = ?, filename = ?, updated_at = ? \
                     WHERE id = ?",
                )
                .bind(STATUS_COMPLETED)
                .bind(&file_path)
                .bind(&filename)
                .bind(Utc::now().naive_utc())
                .bind(report_id)
                .execute(&ctx.pool)
                .await?;

                info!("Report generated successfully: {}", file_path);
                Ok(())
            }
            Err(e) => {
                error!("Failed to generate report {}: {}", report_id, e);
                sqlx::query(
                    "UPDATE reports SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
                )
                .bind(STATUS_FAILED)
                .bind(e.to_string())
                .bind(Utc::now().naive_utc())
                .bind(report_id)
                .execute(&ctx.pool)
                .await?;

                // Re-raise so the queue's retry and failure accounting fire.
                Err(e)
            }
        }
    }

    pub async fn failed(&self, ctx: &JobContext, error: &JobError) {
        error!(
            "Report generation job failed for user {}: {}",
            self.user_id, error
        );
        if let Some(report_id) = self.report_id {
            let result = sqlx::query(
                "UPDATE reports SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
            )
            .bind(STATUS_FAILED)
            .bind(error.to_string())
            .bind(Utc::now().naive_utc())
            .bind(report_id)
            .execute(&ctx.pool)
            .await;
            if let Err(e) = result {
                error!("Failed to mark report {} as failed: {}", report_id, e);
            }
        }
    }

    /// Reports are normally pre-created by the request handler; create one
    /// here when a job was dispatched without a row.
    async fn resolve_report(&self, pool: &SqlitePool) -> Result<i64, JobError> {
        if let Some(report_id) = self.report_id {
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports WHERE id = ?")
                .bind(report_id)
                .fetch_one(pool)
                .await?;
            if exists == 0 {
                return Err(JobError::Other(format!("report {} not found", report_id)));
            }
            return Ok(report_id);
        }

        let now = Utc::now().naive_utc();
        let filters = serde_json::to_string(&self.filters).unwrap_or_else(|_| "{}".to_string());
        let result = sqlx::query(
            "INSERT INTO reports (user_id, filename, file_path, report_type, filters, status, \
             created_at, updated_at) VALUES (?, 'processing', 'processing', ?, ?, ?, ?, ?)",
        )
        .bind(self.user_id)
        .bind(&self.report_type)
        .bind(filters)
        .bind(STATUS_PROCESSING)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn generate(&self, ctx: &JobContext) -> Result<(String, String), JobError> {
        let tasks = self.filtered_tasks(&ctx.pool).await?;

        match self.report_type.as_str() {
            "csv" => self.generate_csv(ctx, &tasks).await,
            "pdf" => self.generate_text(ctx, &tasks).await,
            other => Err(JobError::Other(format!("Unsupported report type: {}", other))),
        }
    }

    /// Tasks visible to the requesting user, with the captured filters
    /// applied, newest first.
    async fn filtered_tasks(&self, pool: &SqlitePool) -> Result<Vec<TaskRow>, JobError> {
        let mut qb = QueryBuilder::<Sqlite>::new(TASK_ROW_SELECT);
        qb.push(" WHERE (t.user_id = ")
            .push_bind(self.user_id)
            .push(" OR t.assigned_to = ")
            .push_bind(self.user_id)
            .push(") AND t.deleted_at IS NULL");

        if let Some(status) = &self.filters.status {
            qb.push(" AND t.status = ").push_bind(status.clone());
        }
        if let Some(priority) = &self.filters.priority {
            qb.push(" AND t.priority = ").push_bind(priority.clone());
        }
        if let Some(start_date) = self.filters.start_date {
            qb.push(" AND t.created_at >= ").push_bind(start_date);
        }
        if let Some(end_date) = self.filters.end_date {
            qb.push(" AND t.created_at <= ").push_bind(end_date);
        }
        qb.push(" ORDER BY t.created_at DESC, t.id DESC");

        Ok(qb.build_query_as::<TaskRow>().fetch_all(pool).await?)
    }

    async fn generate_csv(
        &self,
        ctx: &JobContext,
        tasks: &[TaskRow],
    ) -> Result<(String, String), JobError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for task in tasks {
            writer.write_record([
                task.id.to_string(),
                task.title.clone(),
                task.description.clone().unwrap_or_default(),
                task.status.clone(),
                task.priority.clone(),
                task.due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                task.creator_name.clone(),
                task.assignee_name
                    .clone()
                    .unwrap_or_else(|| "Unassigned".to_string()),
                task.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                task.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])?;
        }

        let data = writer
            .into_inner()
            .map_err(|e| JobError::Other(e.to_string()))?;

        let file_path = self.report_path("csv");
        ctx.storage.put(&file_path, &data).await?;

        Ok((file_path.clone(), basename(&file_path)))
    }

    /// The "pdf" report type produces a plain-text placeholder, not a real
    /// PDF. Deliberately kept that way.
    async fn generate_text(
        &self,
        ctx: &JobContext,
        tasks: &[TaskRow],
    ) -> Result<(String, String), JobError> {
        let mut content = String::from("TASK REPORT\n");
        content.push_str(&format!(
            "Generated on: {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ));
        content.push_str(&format!("Total tasks: {}\n\n", tasks.len()));

        for task in tasks {
            content.push_str(&format!("ID: {}\n", task.id));
            content.push_str(&format!("Title: {}\n", task.title));
            content.push_str(&format!("Status: {}\n", task.status));
            content.push_str(&format!("Priority: {}\n", task.priority));
            content.push_str(&format!(
                "Due Date: {}\n",
                task.due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "N/A".to_string())
            ));
            content.push_str("------------------------\n");
        }

        let file_path = self.report_path("txt");
        ctx.storage.put(&file_path, content.as_bytes()).await?;

        Ok((file_path.clone(), basename(&file_path)))
    }

    fn report_path(&self, extension: &str) -> String {
        format!(
            "reports/task_report_{}_{}.{}",
            self.user_id,
            Utc::now().format("%Y-%m-%d_%H-%M-%S"),
            extension
        )
    }
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

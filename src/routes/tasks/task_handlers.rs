use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::{NaiveDate, Utc};
use log::{error, info};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::task_models::{
    BulkUpdateRequest, CreateTaskRequest, GenerateReportRequest, ListTasksQuery, TaskEnvelope,
    TaskResponse, UpdateTaskRequest,
};
use crate::auth::authenticate;
use crate::jobs::bulk_update::BulkUpdateTasks;
use crate::jobs::notify::NotifyTask;
use crate::jobs::report::{GenerateTaskReport, ReportFilters};
use crate::jobs::{Job, JobQueue};
use crate::models::pagination::{page_offset, Paginated, PER_PAGE};
use crate::models::report::{REPORT_TYPES, STATUS_PROCESSING};
use crate::models::task::{find_task, find_task_row, TaskRow, PRIORITIES, STATUSES, TASK_ROW_SELECT};
use crate::validation::FieldErrors;

const SORT_FIELDS: [&str; 7] = [
    "id",
    "title",
    "status",
    "priority",
    "due_date",
    "created_at",
    "updated_at",
];

pub async fn list_tasks(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    query: web::Query<ListTasksQuery>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tasks t");
    push_task_filters(&mut count_qb, user.id, &query);
    let total = match count_qb
        .build_query_scalar::<i64>()
        .fetch_one(pool.get_ref())
        .await
    {
        Ok(total) => total,
        Err(e) => {
            error!("Failed to count tasks for user {}: {}", user.id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch tasks" }));
        }
    };

    // Sort field and direction come from the caller; only whitelisted
    // values reach the SQL text.
    let sort_field = query
        .sort_field
        .as_deref()
        .filter(|field| SORT_FIELDS.contains(field))
        .unwrap_or("created_at");
    let sort_direction = match query.sort_direction.as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    let (page, offset) = page_offset(query.page);

    let mut qb = QueryBuilder::<Sqlite>::new(TASK_ROW_SELECT);
    push_task_filters(&mut qb, user.id, &query);
    qb.push(format!(
        " ORDER BY t.{} {}, t.id DESC",
        sort_field, sort_direction
    ));
    qb.push(" LIMIT ").push_bind(PER_PAGE);
    qb.push(" OFFSET ").push_bind(offset);

    match qb.build_query_as::<TaskRow>().fetch_all(pool.get_ref()).await {
        Ok(rows) => {
            let data: Vec<TaskResponse> = rows.into_iter().map(TaskResponse::from).collect();
            HttpResponse::Ok().json(Paginated::new(data, page, total))
        }
        Err(e) => {
            error!("Failed to fetch tasks for user {}: {}", user.id, e);
            HttpResponse::InternalServerError().json(json!({ "message": "Failed to fetch tasks" }))
        }
    }
}

pub async fn create_task(
    pool: web::Data<SqlitePool>,
    queue: web::Data<JobQueue>,
    req: HttpRequest,
    request: web::Json<CreateTaskRequest>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let title = request.title.as_deref().unwrap_or("").trim().to_string();
    let mut errors = FieldErrors::new();
    if title.is_empty() {
        errors.add("title", "The title field is required.");
    } else if title.len() > 255 {
        errors.add("title", "The title may not be greater than 255 characters.");
    }
    validate_task_fields(
        &mut errors,
        request.status.as_deref(),
        request.priority.as_deref(),
        request.due_date,
    );
    if let Some(assigned_to) = request.assigned_to {
        if let Err(response) =
            check_assignee_exists(pool.get_ref(), assigned_to, &mut errors).await
        {
            return response;
        }
    }
    if !errors.is_empty() {
        return errors.into_response();
    }

    let status = request.status.as_deref().unwrap_or("pending");
    let priority = request.priority.as_deref().unwrap_or("medium");
    let now = Utc::now().naive_utc();

    let result = sqlx::query(
        "INSERT INTO tasks (title, description, status, priority, due_date, user_id, \
         assigned_to, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&title)
    .bind(&request.description)
    .bind(status)
    .bind(priority)
    .bind(request.due_date)
    .bind(user.id)
    .bind(request.assigned_to)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let task_id = match result {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            error!("Failed to create task for user {}: {}", user.id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to create task" }));
        }
    };

    queue.dispatch(Job::Notify(NotifyTask::new(task_id, "created")));

    match find_task_row(pool.get_ref(), task_id).await {
        Ok(Some(row)) => {
            info!("Task {} created by user {}", task_id, user.id);
            HttpResponse::Created().json(TaskEnvelope {
                message: "Task created successfully".to_string(),
                task: TaskResponse::from(row),
            })
        }
        Ok(None) | Err(_) => HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to load created task" })),
    }
}

pub async fn get_task(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let task_id = path.into_inner();

    match find_task_row(pool.get_ref(), task_id).await {
        Ok(Some(row)) => {
            if row.user_id != user.id && row.assigned_to != Some(user.id) {
                return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
            }
            HttpResponse::Ok().json(TaskResponse::from(row))
        }
        Ok(None) => HttpResponse::NotFound().json(json!({ "message": "Task not found" })),
        Err(e) => {
            error!("Failed to fetch task {}: {}", task_id, e);
            HttpResponse::InternalServerError().json(json!({ "message": "Failed to fetch task" }))
        }
    }
}

pub async fn update_task(
    pool: web::Data<SqlitePool>,
    queue: web::Data<JobQueue>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateTaskRequest>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let task_id = path.into_inner();

    let task = match find_task(pool.get_ref(), task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Task not found" }));
        }
        Err(e) => {
            error!("Failed to fetch task {}: {}", task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch task" }));
        }
    };

    if !task.is_visible_to(user.id) {
        return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
    }

    let mut errors = FieldErrors::new();
    if let Some(title) = &request.title {
        let title = title.trim();
        if title.is_empty() {
            errors.add("title", "The title field is required.");
        } else if title.len() > 255 {
            errors.add("title", "The title may not be greater than 255 characters.");
        }
    }
    validate_task_fields(
        &mut errors,
        request.status.as_deref(),
        request.priority.as_deref(),
        request.due_date,
    );
    if let Some(assigned_to) = request.assigned_to {
        if let Err(response) =
            check_assignee_exists(pool.get_ref(), assigned_to, &mut errors).await
        {
            return response;
        }
    }
    if !errors.is_empty() {
        return errors.into_response();
    }

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE tasks SET ");
    let mut fields = qb.separated(", ");
    if let Some(title) = &request.title {
        fields
            .push("title = ")
            .push_bind_unseparated(title.trim().to_string());
    }
    if let Some(description) = &request.description {
        fields
            .push("description = ")
            .push_bind_unseparated(description.clone());
    }
    if let Some(status) = &request.status {
        fields.push("status = ").push_bind_unseparated(status.clone());
    }
    if let Some(priority) = &request.priority {
        fields
            .push("priority = ")
            .push_bind_unseparated(priority.clone());
    }
    if let Some(due_date) = request.due_date {
        fields.push("due_date = ").push_bind_unseparated(due_date);
    }
    if let Some(assigned_to) = request.assigned_to {
        fields
            .push("assigned_to = ")
            .push_bind_unseparated(assigned_to);
    }
    fields
        .push("updated_at = ")
        .push_bind_unseparated(Utc::now().naive_utc());
    qb.push(" WHERE id = ").push_bind(task_id);

    if let Err(e) = qb.build().execute(pool.get_ref()).await {
        error!("Failed to update task {}: {}", task_id, e);
        return HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to update task" }));
    }

    // A status change gets its own notification flavor
    let action = match &request.status {
        Some(status) if *status != task.status => "status_updated",
        _ => "updated",
    };
    queue.dispatch(Job::Notify(NotifyTask::new(task_id, action)));

    match find_task_row(pool.get_ref(), task_id).await {
        Ok(Some(row)) => {
            info!("Task {} updated by user {}", task_id, user.id);
            HttpResponse::Ok().json(TaskEnvelope {
                message: "Task updated successfully".to_string(),
                task: TaskResponse::from(row),
            })
        }
        Ok(None) | Err(_) => HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to load updated task" })),
    }
}

pub async fn delete_task(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let task_id = path.into_inner();

    let task = match find_task(pool.get_ref(), task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Task not found" }));
        }
        Err(e) => {
            error!("Failed to fetch task {}: {}", task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch task" }));
        }
    };

    // Only the creator may delete, assignees included
    if task.user_id != user.id {
        return HttpResponse::Forbidden()
            .json(json!({ "message": "Unauthorized - Only task creator can delete task" }));
    }

    let result = sqlx::query("UPDATE tasks SET deleted_at = ?, updated_at = ? WHERE id = ?")
        .bind(Utc::now().naive_utc())
        .bind(Utc::now().naive_utc())
        .bind(task_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!("Task {} deleted by user {}", task_id, user.id);
            HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" }))
        }
        Err(e) => {
            error!("Failed to delete task {}: {}", task_id, e);
            HttpResponse::InternalServerError().json(json!({ "message": "Failed to delete task" }))
        }
    }
}

pub async fn bulk_update(
    pool: web::Data<SqlitePool>,
    queue: web::Data<JobQueue>,
    req: HttpRequest,
    request: web::Json<BulkUpdateRequest>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut errors = FieldErrors::new();
    let task_ids = request.task_ids.clone().unwrap_or_default();
    if task_ids.is_empty() {
        errors.add("task_ids", "The task ids field is required.");
    }
    validate_task_fields(
        &mut errors,
        request.status.as_deref(),
        request.priority.as_deref(),
        None,
    );
    if !errors.is_empty() {
        return errors.into_response();
    }

    if request.status.is_none() && request.priority.is_none() {
        return HttpResponse::UnprocessableEntity()
            .json(json!({ "message": "No update data provided" }));
    }

    info!(
        "Bulk update requested by user {} for {} tasks",
        user.id,
        task_ids.len()
    );

    queue.dispatch(Job::BulkUpdate(BulkUpdateTasks {
        task_ids,
        status: request.status.clone(),
        priority: request.priority.clone(),
        user_id: user.id,
    }));

    HttpResponse::Ok()
        .json(json!({ "message": "Bulk update started. You will be notified when completed." }))
}

pub async fn generate_report(
    pool: web::Data<SqlitePool>,
    queue: web::Data<JobQueue>,
    req: HttpRequest,
    request: web::Json<GenerateReportRequest>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let report_type = request.report_type.as_deref().unwrap_or("csv").to_string();
    let mut errors = FieldErrors::new();
    if !REPORT_TYPES.contains(&report_type.as_str()) {
        errors.add("report_type", "The selected report type is invalid.");
    }
    validate_task_fields(
        &mut errors,
        request.status.as_deref(),
        request.priority.as_deref(),
        None,
    );
    if let (Some(start_date), Some(end_date)) = (request.start_date, request.end_date) {
        if end_date < start_date {
            errors.add(
                "end_date",
                "The end date must be a date after or equal to start date.",
            );
        }
    }
    if !errors.is_empty() {
        return errors.into_response();
    }

    let filters = ReportFilters {
        status: request.status.clone(),
        priority: request.priority.clone(),
        start_date: request.start_date,
        end_date: request.end_date,
    };
    let filters_json = serde_json::to_string(&filters).unwrap_or_else(|_| "{}".to_string());

    // The report row is created up front so the response never waits on
    // generation.
    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        "INSERT INTO reports (user_id, filename, file_path, report_type, filters, status, \
         created_at, updated_at) VALUES (?, 'processing', 'processing', ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&report_type)
    .bind(&filters_json)
    .bind(STATUS_PROCESSING)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let report_id = match result {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            error!("Failed to create report row for user {}: {}", user.id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to create report" }));
        }
    };

    queue.dispatch(Job::GenerateReport(GenerateTaskReport {
        user_id: user.id,
        filters,
        report_type,
        report_id: Some(report_id),
    }));

    HttpResponse::Ok().json(json!({
        "message": "Report generation started. You will be notified when ready.",
        "report_id": report_id,
    }))
}

fn push_task_filters(qb: &mut QueryBuilder<Sqlite>, user_id: i64, query: &ListTasksQuery) {
    qb.push(" WHERE (t.user_id = ")
        .push_bind(user_id)
        .push(" OR t.assigned_to = ")
        .push_bind(user_id)
        .push(") AND t.deleted_at IS NULL");

    if let Some(status) = &query.status {
        if !status.is_empty() && status != "all" {
            qb.push(" AND t.status = ").push_bind(status.clone());
        }
    }
    if let Some(priority) = &query.priority {
        if !priority.is_empty() && priority != "all" {
            qb.push(" AND t.priority = ").push_bind(priority.clone());
        }
    }
    if let Some(search) = &query.search {
        if !search.is_empty() {
            // SQLite LIKE is case-insensitive for ASCII
            let pattern = format!("%{}%", search);
            qb.push(" AND (t.title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description LIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

fn validate_task_fields(
    errors: &mut FieldErrors,
    status: Option<&str>,
    priority: Option<&str>,
    due_date: Option<NaiveDate>,
) {
    if let Some(status) = status {
        if !STATUSES.contains(&status) {
            errors.add("status", "The selected status is invalid.");
        }
    }
    if let Some(priority) = priority {
        if !PRIORITIES.contains(&priority) {
            errors.add("priority", "The selected priority is invalid.");
        }
    }
    if let Some(due_date) = due_date {
        if due_date < Utc::now().date_naive() {
            errors.add(
                "due_date",
                "The due date must be a date after or equal to today.",
            );
        }
    }
}

async fn check_assignee_exists(
    pool: &SqlitePool,
    assigned_to: i64,
    errors: &mut FieldErrors,
) -> Result<(), HttpResponse> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(assigned_to)
        .fetch_one(pool)
        .await;

    match exists {
        Ok(0) => {
            errors.add("assigned_to", "The selected assigned to is invalid.");
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) => {
            error!("Failed to check assignee {}: {}", assigned_to, e);
            Err(HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to validate assignee" })))
        }
    }
}

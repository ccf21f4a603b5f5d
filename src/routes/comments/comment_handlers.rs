use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::{error, info};
use serde_json::json;
use sqlx::SqlitePool;

use super::comment_models::{CommentEnvelope, CommentRequest, CommentResponse};
use crate::auth::authenticate;
use crate::models::comment::{find_comment, find_comment_row, CommentRow, COMMENT_ROW_SELECT};
use crate::models::task::find_task;
use crate::validation::FieldErrors;

const MAX_COMMENT_LENGTH: usize = 1000;

fn validate_comment(body: Option<&str>) -> Result<String, FieldErrors> {
    let comment = body.unwrap_or("").trim().to_string();
    let mut errors = FieldErrors::new();
    if comment.is_empty() {
        errors.add("comment", "The comment field is required.");
    } else if comment.len() > MAX_COMMENT_LENGTH {
        errors.add(
            "comment",
            "The comment may not be greater than 1000 characters.",
        );
    }
    if errors.is_empty() {
        Ok(comment)
    } else {
        Err(errors)
    }
}

pub async fn list_comments(
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
        Ok(None) => return HttpResponse::NotFound().json(json!({ "message": "Task not found" })),
        Err(e) => {
            error!("Failed to fetch task {}: {}", task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch task" }));
        }
    };
    if !task.is_visible_to(user.id) {
        return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
    }

    // Newest first
    let sql = format!("{COMMENT_ROW_SELECT} WHERE c.task_id = ? ORDER BY c.created_at DESC, c.id DESC");
    match sqlx::query_as::<_, CommentRow>(&sql)
        .bind(task_id)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let comments: Vec<CommentResponse> =
                rows.into_iter().map(CommentResponse::from).collect();
            HttpResponse::Ok().json(comments)
        }
        Err(e) => {
            error!("Failed to fetch comments for task {}: {}", task_id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch comments" }))
        }
    }
}

pub async fn create_comment(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<CommentRequest>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let task_id = path.into_inner();

    let task = match find_task(pool.get_ref(), task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => return HttpResponse::NotFound().json(json!({ "message": "Task not found" })),
        Err(e) => {
            error!("Failed to fetch task {}: {}", task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch task" }));
        }
    };
    if !task.is_visible_to(user.id) {
        return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
    }

    let comment = match validate_comment(request.comment.as_deref()) {
        Ok(comment) => comment,
        Err(errors) => return errors.into_response(),
    };

    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        "INSERT INTO task_comments (task_id, user_id, comment, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(user.id)
    .bind(&comment)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let comment_id = match result {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            error!("Failed to add comment to task {}: {}", task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to add comment" }));
        }
    };

    match find_comment_row(pool.get_ref(), comment_id).await {
        Ok(Some(row)) => {
            info!("Comment {} added to task {}", comment_id, task_id);
            HttpResponse::Created().json(CommentEnvelope {
                message: "Comment added successfully".to_string(),
                comment: CommentResponse::from(row),
            })
        }
        Ok(None) | Err(_) => HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to load created comment" })),
    }
}

pub async fn update_comment(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<CommentRequest>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let comment_id = path.into_inner();

    let comment = match find_comment(pool.get_ref(), comment_id).await {
        Ok(Some(comment)) => comment,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Comment not found" }))
        }
        Err(e) => {
            error!("Failed to fetch comment {}: {}", comment_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch comment" }));
        }
    };

    // Only the author may edit
    if comment.user_id != user.id {
        return HttpResponse::Forbidden()
            .json(json!({ "message": "Unauthorized - Only comment author can update" }));
    }

    let body = match validate_comment(request.comment.as_deref()) {
        Ok(body) => body,
        Err(errors) => return errors.into_response(),
    };

    let result = sqlx::query("UPDATE task_comments SET comment = ?, updated_at = ? WHERE id = ?")
        .bind(&body)
        .bind(Utc::now().naive_utc())
        .bind(comment_id)
        .execute(pool.get_ref())
        .await;

    if let Err(e) = result {
        error!("Failed to update comment {}: {}", comment_id, e);
        return HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to update comment" }));
    }

    match find_comment_row(pool.get_ref(), comment_id).await {
        Ok(Some(row)) => HttpResponse::Ok().json(CommentEnvelope {
            message: "Comment updated successfully".to_string(),
            comment: CommentResponse::from(row),
        }),
        Ok(None) | Err(_) => HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to load updated comment" })),
    }
}

pub async fn delete_comment(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let comment_id = path.into_inner();

    let comment = match find_comment(pool.get_ref(), comment_id).await {
        Ok(Some(comment)) => comment,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Comment not found" }))
        }
        Err(e) => {
            error!("Failed to fetch comment {}: {}", comment_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch comment" }));
        }
    };

    // Author, or the owning task's creator
    let mut allowed = comment.user_id == user.id;
    if !allowed {
        allowed = match find_task(pool.get_ref(), comment.task_id).await {
            Ok(Some(task)) => task.user_id == user.id,
            Ok(None) => false,
            Err(e) => {
                error!("Failed to fetch task {}: {}", comment.task_id, e);
                return HttpResponse::InternalServerError()
                    .json(json!({ "message": "Failed to fetch task" }));
            }
        };
    }
    if !allowed {
        return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
    }

    let result = sqlx::query("DELETE FROM task_comments WHERE id = ?")
        .bind(comment_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!("Comment {} deleted by user {}", comment_id, user.id);
            HttpResponse::Ok().json(json!({ "message": "Comment deleted successfully" }))
        }
        Err(e) => {
            error!("Failed to delete comment {}: {}", comment_id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to delete comment" }))
        }
    }
}

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde_json::json;
use sqlx::SqlitePool;

use crate::auth::authenticate;
use crate::models::user::UserSummary;

/// Assignment candidate list: every user except the caller.
pub async fn list_users(pool: web::Data<SqlitePool>, req: HttpRequest) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let result = sqlx::query_as::<_, UserSummary>(
        "SELECT id, name, email FROM users WHERE id != ? ORDER BY name",
    )
    .bind(user.id)
    .fetch_all(pool.get_ref())
    .await;

    match result {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => {
            error!("Failed to fetch users: {}", e);
            HttpResponse::InternalServerError().json(json!({ "message": "Failed to fetch users" }))
        }
    }
}

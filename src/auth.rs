use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, HttpResponse};
use chrono::{Duration, NaiveDateTime, Utc};
use log::{error, info};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

const TOKEN_TTL_DAYS: i64 = 30;

/// The caller resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    name: String,
    email: String,
    expires_at: NaiveDateTime,
}

// Issue a new bearer token for a user
pub async fn issue_token(pool: &SqlitePool, user_id: i64) -> Result<String, sqlx::Error> {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let expires_at = now + Duration::days(TOKEN_TTL_DAYS);

    sqlx::query("INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

pub fn unauthenticated() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "message": "Unauthenticated." }))
}

/// Resolve the caller from the Authorization header. The `Err` branch
/// carries the response to return as-is.
pub async fn authenticate(pool: &SqlitePool, req: &HttpRequest) -> Result<AuthUser, HttpResponse> {
    let token = match bearer_token(req) {
        Some(token) => token,
        None => return Err(unauthenticated()),
    };

    let result = sqlx::query_as::<_, SessionRow>(
        "SELECT u.id, u.name, u.email, s.expires_at
         FROM sessions s
         JOIN users u ON s.user_id = u.id
         WHERE s.token = ?",
    )
    .bind(&token)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(session)) => {
            if session.expires_at < Utc::now().naive_utc() {
                // Remove expired session
                let _ = sqlx::query("DELETE FROM sessions WHERE token = ?")
                    .bind(&token)
                    .execute(pool)
                    .await;
                info!("Session expired for token {}", token);
                return Err(unauthenticated());
            }
            Ok(AuthUser {
                id: session.id,
                name: session.name,
                email: session.email,
            })
        }
        Ok(None) => Err(unauthenticated()),
        Err(e) => {
            error!("Failed to validate token: {}", e);
            Err(HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to validate session" })))
        }
    }
}

pub async fn revoke_token(pool: &SqlitePool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

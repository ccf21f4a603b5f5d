use actix_web::{web, HttpRequest, HttpResponse, Responder};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use log::{error, info};
use serde_json::json;
use sqlx::SqlitePool;

use super::auth_models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::auth;
use crate::models::user::{find_user, find_user_by_email};
use crate::validation::FieldErrors;

pub async fn register(
    pool: web::Data<SqlitePool>,
    request: web::Json<RegisterRequest>,
) -> impl Responder {
    let name = request.name.as_deref().unwrap_or("").trim().to_string();
    let email = request.email.as_deref().unwrap_or("").trim().to_string();
    let password = request.password.as_deref().unwrap_or("");

    info!("Received registration request for {}", email);

    let mut errors = FieldErrors::new();
    if name.is_empty() {
        errors.add("name", "The name field is required.");
    }
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !email.contains('@') {
        errors.add("email", "The email must be a valid email address.");
    }
    if password.is_empty() {
        errors.add("password", "The password field is required.");
    } else if password.len() < 8 {
        errors.add("password", "The password must be at least 8 characters.");
    }
    if !errors.is_empty() {
        return errors.into_response();
    }

    // Email must be unique
    match find_user_by_email(pool.get_ref(), &email).await {
        Ok(None) => {}
        Ok(Some(_)) => {
            let mut errors = FieldErrors::new();
            errors.add("email", "The email has already been taken.");
            return errors.into_response();
        }
        Err(e) => {
            error!("Failed to check email uniqueness: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to register user" }));
        }
    }

    let password_hash = match hash(password, DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to hash password: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to hash password" }));
        }
    };

    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        "INSERT INTO users (name, email, password_hash, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let user_id = match result {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            error!("Failed to register user {}: {}", email, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to register user" }));
        }
    };

    let token = match auth::issue_token(pool.get_ref(), user_id).await {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to issue token for user {}: {}", user_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to create session" }));
        }
    };

    match find_user(pool.get_ref(), user_id).await {
        Ok(Some(user)) => {
            info!("User {} registered successfully", user.email);
            HttpResponse::Created().json(RegisterResponse {
                message: "User registered successfully".to_string(),
                user,
                token,
            })
        }
        Ok(None) | Err(_) => HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to load registered user" })),
    }
}

pub async fn login(pool: web::Data<SqlitePool>, request: web::Json<LoginRequest>) -> impl Responder {
    info!("Received login request for {}", request.email);

    let user = match find_user_by_email(pool.get_ref(), &request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Unknown email: {}", request.email);
            return HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));
        }
        Err(e) => {
            error!("Failed to fetch user {}: {}", request.email, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to log in" }));
        }
    };

    let valid = match verify(&request.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            error!("Error when checking password for {}: {}", request.email, e);
            return HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));
        }
    };

    if !valid {
        info!("Invalid password for {}", request.email);
        return HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));
    }

    let token = match auth::issue_token(pool.get_ref(), user.id).await {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to issue token for user {}: {}", user.id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to create session" }));
        }
    };

    info!("User {} logged in successfully", user.email);
    HttpResponse::Ok().json(LoginResponse { user, token })
}

pub async fn logout(pool: web::Data<SqlitePool>, req: HttpRequest) -> impl Responder {
    if let Err(response) = auth::authenticate(pool.get_ref(), &req).await {
        return response;
    }
    let token = match auth::bearer_token(&req) {
        Some(token) => token,
        None => return auth::unauthenticated(),
    };

    match auth::revoke_token(pool.get_ref(), &token).await {
        Ok(()) => {
            info!("Token revoked");
            HttpResponse::Ok().json(json!({ "message": "Logged out successfully" }))
        }
        Err(e) => {
            error!("Failed to revoke token: {}", e);
            HttpResponse::InternalServerError().json(json!({ "message": "Failed to log out" }))
        }
    }
}

pub async fn me(pool: web::Data<SqlitePool>, req: HttpRequest) -> impl Responder {
    let user = match auth::authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match find_user(pool.get_ref(), user.id).await {
        Ok(Some(user)) => HttpResponse::Ok().json(user),
        Ok(None) => auth::unauthenticated(),
        Err(e) => {
            error!("Failed to fetch user {}: {}", user.id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch user information" }))
        }
    }
}

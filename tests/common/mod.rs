#![allow(dead_code)]

use std::time::Duration;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

use taskhub_backend::db;
use taskhub_backend::jobs::{self, JobContext, JobQueue};
use taskhub_backend::mailer::Mailer;
use taskhub_backend::routes;
use taskhub_backend::storage::LocalStorage;

/// Shared fixture: in-memory database, tempdir-backed storage, disabled
/// mailer, and a live job worker.
pub struct TestApp {
    pub pool: SqlitePool,
    pub storage: LocalStorage,
    pub queue: JobQueue,
    _storage_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        db::init_schema(&pool).await.expect("failed to apply schema");

        let storage_dir = tempfile::tempdir().expect("failed to create storage dir");
        let storage = LocalStorage::new(storage_dir.path());

        let (queue, job_rx) = JobQueue::new();
        let _worker = jobs::spawn_worker(
            job_rx,
            JobContext {
                pool: pool.clone(),
                storage: storage.clone(),
                mailer: Mailer::disabled(),
                queue: queue.clone(),
            },
        );

        Self {
            pool,
            storage,
            queue,
            _storage_dir: storage_dir,
        }
    }

    /// App wiring shared by every test service.
    pub fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let pool = self.pool.clone();
        let storage = self.storage.clone();
        let queue = self.queue.clone();
        move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(web::Data::new(pool))
                .app_data(web::Data::new(storage))
                .app_data(web::Data::new(queue));
            routes::routes::auth_configure(cfg);
            routes::routes::task_configure(cfg);
            routes::routes::attachment_configure(cfg);
            routes::routes::comment_configure(cfg);
            routes::routes::user_configure(cfg);
            routes::routes::report_configure(cfg);
        }
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// Register a user and return their bearer token.
pub async fn register<S, B>(app: &S, name: &str, email: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "name": name, "email": email, "password": "password123" }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status().as_u16(), 201, "registration failed");
    let body: Value = test::read_body_json(resp).await;
    body["token"].as_str().expect("token missing").to_string()
}

/// Create a task and return the task object from the response envelope.
pub async fn create_task<S, B>(app: &S, token: &str, payload: Value) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = test::TestRequest::post()
        .uri("/tasks")
        .insert_header(bearer(token))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status().as_u16(), 201, "task creation failed");
    let body: Value = test::read_body_json(resp).await;
    body["task"].clone()
}

/// Resolve the caller's user id via `/auth/me`.
pub async fn user_id<S, B>(app: &S, token: &str) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(token))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = test::read_body_json(resp).await;
    body["id"].as_i64().expect("user id")
}

/// Raw multipart body with a single file field; returns the content-type
/// header value and the body bytes.
pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----taskhub-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

/// A small valid JPEG, for upload fixtures.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new(&mut out);
    encoder
        .encode(
            img.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .expect("failed to encode fixture jpeg");
    out
}

/// Poll until the report reaches the wanted status; panics on timeout.
pub async fn wait_for_report_status(pool: &SqlitePool, report_id: i64, status: &str) {
    for _ in 0..250 {
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM reports WHERE id = ?")
                .bind(report_id)
                .fetch_optional(pool)
                .await
                .expect("failed to fetch report status");
        if current.as_deref() == Some(status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("report {} never reached status {}", report_id, status);
}

/// Poll until the task reaches the wanted status; panics on timeout.
pub async fn wait_for_task_status(pool: &SqlitePool, task_id: i64, status: &str) {
    for _ in 0..250 {
        let current: Option<String> = sqlx::query_scalar("SELECT status FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(pool)
            .await
            .expect("failed to fetch task status");
        if current.as_deref() == Some(status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {} never reached status {}", task_id, status);
}

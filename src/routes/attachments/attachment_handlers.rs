use actix_multipart::{Multipart, MultipartError};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use futures_util::TryStreamExt;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use log::{error, info};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;

use super::attachment_models::{AttachmentEnvelope, AttachmentResponse};
use crate::auth::authenticate;
use crate::models::attachment::{
    find_attachment, find_attachment_row, AttachmentRow, ATTACHMENT_ROW_SELECT,
};
use crate::models::task::find_task;
use crate::storage::{LocalStorage, StorageError};
use crate::validation::FieldErrors;

const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 13] = [
    "jpg", "jpeg", "png", "gif", "webp", "pdf", "doc", "docx", "txt", "zip", "rar", "mp4", "mpeg",
];

const IMAGE_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Error)]
enum ThumbnailError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    data: Vec<u8>,
    truncated: bool,
}

pub async fn list_attachments(
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

    let sql = format!("{ATTACHMENT_ROW_SELECT} WHERE a.task_id = ? ORDER BY a.id");
    match sqlx::query_as::<_, AttachmentRow>(&sql)
        .bind(task_id)
        .fetch_all(pool.get_ref())
        .await
    {
        Ok(rows) => {
            let attachments: Vec<AttachmentResponse> =
                rows.into_iter().map(AttachmentResponse::from).collect();
            HttpResponse::Ok().json(attachments)
        }
        Err(e) => {
            error!("Failed to fetch attachments for task {}: {}", task_id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch attachments" }))
        }
    }
}

pub async fn upload_attachment(
    pool: web::Data<SqlitePool>,
    storage: web::Data<LocalStorage>,
    req: HttpRequest,
    path: web::Path<i64>,
    payload: Multipart,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let task_id = path.into_inner();

    info!("File upload started for task {} by user {}", task_id, user.id);

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

    let upload = match read_file_field(payload).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            let mut errors = FieldErrors::new();
            errors.add("file", "The file field is required.");
            return errors.into_response();
        }
        Err(e) => {
            error!("Failed to read upload for task {}: {}", task_id, e);
            return HttpResponse::BadRequest()
                .json(json!({ "message": format!("Invalid upload: {}", e) }));
        }
    };

    if upload.truncated {
        let mut errors = FieldErrors::new();
        errors.add(
            "file",
            "The file may not be greater than 10240 kilobytes.",
        );
        return errors.into_response();
    }

    let extension = upload
        .file_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        let mut errors = FieldErrors::new();
        errors.add(
            "file",
            format!(
                "The file must be a file of type: {}.",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        );
        return errors.into_response();
    }

    let mime_type = upload.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&upload.file_name)
            .first_or_octet_stream()
            .to_string()
    });

    info!(
        "File details: name={} size={} mime={}",
        upload.file_name,
        upload.data.len(),
        mime_type
    );

    let timestamp = Utc::now().timestamp();
    let stored_name = sanitize_file_name(&upload.file_name);
    let file_path = format!("attachments/{}_{}", timestamp, stored_name);

    if let Err(e) = storage.put(&file_path, &upload.data).await {
        error!("Failed to store upload for task {}: {}", task_id, e);
        return HttpResponse::InternalServerError()
            .json(json!({ "message": format!("File upload failed: {}", e) }));
    }

    // Thumbnail failure must never fail the upload itself
    let mut thumbnail_path = None;
    if IMAGE_MIME_TYPES.contains(&mime_type.as_str()) {
        match create_thumbnail(storage.get_ref(), timestamp, &stored_name, &upload.data).await {
            Ok(path) => {
                info!("Thumbnail created at {}", path);
                thumbnail_path = Some(path);
            }
            Err(e) => {
                error!("Thumbnail creation failed for {}: {}", upload.file_name, e);
            }
        }
    }

    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        "INSERT INTO task_attachments (task_id, file_name, file_path, file_size, mime_type, \
         thumbnail_path, uploaded_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(&upload.file_name)
    .bind(&file_path)
    .bind(upload.data.len() as i64)
    .bind(&mime_type)
    .bind(&thumbnail_path)
    .bind(user.id)
    .bind(now)
    .bind(now)
    .execute(pool.get_ref())
    .await;

    let attachment_id = match result {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            error!("Failed to record attachment for task {}: {}", task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to record attachment" }));
        }
    };

    match find_attachment_row(pool.get_ref(), attachment_id).await {
        Ok(Some(row)) => {
            info!("Attachment {} created for task {}", attachment_id, task_id);
            HttpResponse::Created().json(AttachmentEnvelope {
                message: "File uploaded successfully".to_string(),
                attachment: AttachmentResponse::from(row),
            })
        }
        Ok(None) | Err(_) => HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to load uploaded attachment" })),
    }
}

pub async fn download_attachment(
    pool: web::Data<SqlitePool>,
    storage: web::Data<LocalStorage>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let attachment_id = path.into_inner();

    let attachment = match find_attachment(pool.get_ref(), attachment_id).await {
        Ok(Some(attachment)) => attachment,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Attachment not found" }))
        }
        Err(e) => {
            error!("Failed to fetch attachment {}: {}", attachment_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch attachment" }));
        }
    };

    let task = match find_task(pool.get_ref(), attachment.task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => return HttpResponse::NotFound().json(json!({ "message": "Task not found" })),
        Err(e) => {
            error!("Failed to fetch task {}: {}", attachment.task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch task" }));
        }
    };
    if !task.is_visible_to(user.id) {
        return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
    }

    // A row without a backing blob is treated the same as no row at all
    if !storage.exists(&attachment.file_path).await {
        return HttpResponse::NotFound().json(json!({ "error": "File not found" }));
    }

    match storage.read(&attachment.file_path).await {
        Ok(data) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, attachment.mime_type.clone()))
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", attachment.file_name),
            ))
            .body(data),
        Err(e) => {
            error!("Failed to read attachment {}: {}", attachment_id, e);
            HttpResponse::NotFound().json(json!({ "error": "File not found" }))
        }
    }
}

pub async fn delete_attachment(
    pool: web::Data<SqlitePool>,
    storage: web::Data<LocalStorage>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let attachment_id = path.into_inner();

    let attachment = match find_attachment(pool.get_ref(), attachment_id).await {
        Ok(Some(attachment)) => attachment,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Attachment not found" }))
        }
        Err(e) => {
            error!("Failed to fetch attachment {}: {}", attachment_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch attachment" }));
        }
    };

    let task = match find_task(pool.get_ref(), attachment.task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => return HttpResponse::NotFound().json(json!({ "message": "Task not found" })),
        Err(e) => {
            error!("Failed to fetch task {}: {}", attachment.task_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch task" }));
        }
    };
    if !task.is_visible_to(user.id) {
        return HttpResponse::Forbidden().json(json!({ "message": "Unauthorized" }));
    }

    // Blob deletes tolerate files that are already gone
    if let Err(e) = storage.delete(&attachment.file_path).await {
        error!("Failed to delete blob {}: {}", attachment.file_path, e);
        return HttpResponse::InternalServerError()
            .json(json!({ "message": "Failed to delete attachment" }));
    }
    if let Some(thumbnail_path) = &attachment.thumbnail_path {
        if let Err(e) = storage.delete(thumbnail_path).await {
            error!("Failed to delete thumbnail {}: {}", thumbnail_path, e);
        }
    }

    let result = sqlx::query("DELETE FROM task_attachments WHERE id = ?")
        .bind(attachment_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!("Attachment {} deleted by user {}", attachment_id, user.id);
            HttpResponse::Ok().json(json!({ "message": "Attachment deleted successfully" }))
        }
        Err(e) => {
            error!("Failed to delete attachment {}: {}", attachment_id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to delete attachment" }))
        }
    }
}

/// Pull the first file field out of a multipart payload, bounding the
/// bytes kept in memory at `MAX_FILE_SIZE`.
async fn read_file_field(mut payload: Multipart) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(mut field) = payload.try_next().await? {
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.to_string());
        let file_name = match file_name {
            Some(name) => name,
            None => continue,
        };
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = field.try_next().await? {
            if truncated || data.len() + chunk.len() > MAX_FILE_SIZE {
                // Keep draining the field so the connection stays usable
                truncated = true;
                continue;
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            data,
            truncated,
        }));
    }
    Ok(None)
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn create_thumbnail(
    storage: &LocalStorage,
    timestamp: i64,
    file_name: &str,
    data: &[u8],
) -> Result<String, ThumbnailError> {
    let image = image::load_from_memory(data)?;

    // Bounded at 150x150, aspect ratio preserved. Encoded as JPEG, so
    // alpha channels are flattened first.
    let thumbnail = image.thumbnail(150, 150).to_rgb8();

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, 80);
    encoder.write_image(
        thumbnail.as_raw(),
        thumbnail.width(),
        thumbnail.height(),
        ExtendedColorType::Rgb8,
    )?;

    let thumbnail_path = format!("thumbnails/thumb_{}_{}", timestamp, file_name);
    storage.put(&thumbnail_path, &encoded).await?;

    Ok(thumbnail_path)
}

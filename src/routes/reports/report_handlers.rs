use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;
use sqlx::SqlitePool;

use super::report_models::{ListReportsQuery, ReportResponse};
use crate::auth::authenticate;
use crate::models::pagination::{page_offset, Paginated, PER_PAGE};
use crate::models::report::{find_report_for_user, Report, STATUS_COMPLETED};
use crate::storage::LocalStorage;

pub async fn list_reports(
    pool: web::Data<SqlitePool>,
    req: HttpRequest,
    query: web::Query<ListReportsQuery>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let total = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports WHERE user_id = ?")
        .bind(user.id)
        .fetch_one(pool.get_ref())
        .await
    {
        Ok(total) => total,
        Err(e) => {
            error!("Failed to count reports for user {}: {}", user.id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch reports" }));
        }
    };

    let (page, offset) = page_offset(query.page);
    let result = sqlx::query_as::<_, Report>(
        "SELECT * FROM reports WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(user.id)
    .bind(PER_PAGE)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await;

    match result {
        Ok(reports) => {
            let data: Vec<ReportResponse> =
                reports.into_iter().map(ReportResponse::from).collect();
            HttpResponse::Ok().json(Paginated::new(data, page, total))
        }
        Err(e) => {
            error!("Failed to fetch reports for user {}: {}", user.id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch reports" }))
        }
    }
}

pub async fn download_report(
    pool: web::Data<SqlitePool>,
    storage: web::Data<LocalStorage>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let report_id = path.into_inner();

    let report = match find_report_for_user(pool.get_ref(), report_id, user.id).await {
        Ok(Some(report)) => report,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Report not found" }))
        }
        Err(e) => {
            error!("Failed to fetch report {}: {}", report_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch report" }));
        }
    };

    if report.status != STATUS_COMPLETED {
        return HttpResponse::BadRequest()
            .json(json!({ "message": "Report is not ready for download" }));
    }

    if !storage.exists(&report.file_path).await {
        return HttpResponse::NotFound().json(json!({ "message": "Report file not found" }));
    }

    let content_type = if report.file_path.ends_with(".csv") {
        "text/csv"
    } else {
        "text/plain"
    };

    match storage.read(&report.file_path).await {
        Ok(data) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, content_type))
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename),
            ))
            .body(data),
        Err(e) => {
            error!("Failed to read report file {}: {}", report.file_path, e);
            HttpResponse::NotFound().json(json!({ "message": "Report file not found" }))
        }
    }
}

pub async fn delete_report(
    pool: web::Data<SqlitePool>,
    storage: web::Data<LocalStorage>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> impl Responder {
    let user = match authenticate(pool.get_ref(), &req).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let report_id = path.into_inner();

    let report = match find_report_for_user(pool.get_ref(), report_id, user.id).await {
        Ok(Some(report)) => report,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({ "message": "Report not found" }))
        }
        Err(e) => {
            error!("Failed to fetch report {}: {}", report_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to fetch report" }));
        }
    };

    // The row disappears even when the blob is already gone
    if report.file_path != "processing" {
        if let Err(e) = storage.delete(&report.file_path).await {
            error!("Failed to delete report file {}: {}", report.file_path, e);
        }
    }

    let result = sqlx::query("DELETE FROM reports WHERE id = ?")
        .bind(report_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!("Report {} deleted by user {}", report_id, user.id);
            HttpResponse::Ok().json(json!({ "message": "Report deleted successfully" }))
        }
        Err(e) => {
            error!("Failed to delete report {}: {}", report_id, e);
            HttpResponse::InternalServerError()
                .json(json!({ "message": "Failed to delete report" }))
        }
    }
}

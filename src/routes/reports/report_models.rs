use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::report::Report;

#[derive(Deserialize)]
pub struct ListReportsQuery {
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub file_path: String,
    pub report_type: String,
    pub filters: Option<serde_json::Value>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        let filters = report.filters_json();
        Self {
            id: report.id,
            user_id: report.user_id,
            filename: report.filename,
            file_path: report.file_path,
            report_type: report.report_type,
            filters,
            status: report.status,
            error_message: report.error_message,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

use std::collections::BTreeMap;

use actix_web::HttpResponse;
use serde::Serialize;

/// Field-level validation errors, returned as a 422 with the
/// `{"errors": {field: [messages]}}` envelope the API uses everywhere.
#[derive(Debug, Default, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::UnprocessableEntity().json(self)
    }
}

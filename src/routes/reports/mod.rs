pub mod report_handlers;
pub mod report_models;

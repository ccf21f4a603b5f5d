//! Backend for the Taskhub task-management application.
//!
//! REST API over SQLite with an asynchronous job queue for notifications,
//! bulk task updates, and report generation.

pub mod auth;
pub mod config;
pub mod db;
pub mod jobs;
pub mod mailer;
pub mod models;
pub mod routes;
pub mod storage;
pub mod validation;

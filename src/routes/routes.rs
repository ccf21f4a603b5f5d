use actix_web::web;

use super::attachments::attachment_handlers;
use super::auth::auth_handlers;
use super::comments::comment_handlers;
use super::reports::report_handlers;
use super::tasks::task_handlers;
use super::users::user_handlers;

pub fn auth_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(auth_handlers::register))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/me", web::get().to(auth_handlers::me)),
    );
}

pub fn task_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(task_handlers::list_tasks))
            .route("", web::post().to(task_handlers::create_task))
            .route("/bulk-update", web::post().to(task_handlers::bulk_update))
            .route(
                "/generate-report",
                web::post().to(task_handlers::generate_report),
            )
            .route("/{id}", web::get().to(task_handlers::get_task))
            .route("/{id}", web::put().to(task_handlers::update_task))
            .route("/{id}", web::delete().to(task_handlers::delete_task))
            .route(
                "/{id}/attachments",
                web::get().to(attachment_handlers::list_attachments),
            )
            .route(
                "/{id}/attachments",
                web::post().to(attachment_handlers::upload_attachment),
            )
            .route(
                "/{id}/comments",
                web::get().to(comment_handlers::list_comments),
            )
            .route(
                "/{id}/comments",
                web::post().to(comment_handlers::create_comment),
            ),
    );
}

pub fn attachment_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attachments")
            .route(
                "/{id}/download",
                web::get().to(attachment_handlers::download_attachment),
            )
            .route(
                "/{id}",
                web::delete().to(attachment_handlers::delete_attachment),
            ),
    );
}

pub fn comment_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .route("/{id}", web::put().to(comment_handlers::update_comment))
            .route("/{id}", web::delete().to(comment_handlers::delete_comment)),
    );
}

pub fn user_configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/users", web::get().to(user_handlers::list_users));
}

pub fn report_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reports")
            .route("", web::get().to(report_handlers::list_reports))
            .route(
                "/{id}/download",
                web::get().to(report_handlers::download_report),
            )
            .route("/{id}", web::delete().to(report_handlers::delete_report)),
    );
}

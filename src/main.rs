use actix_web::{web, App, HttpResponse, HttpServer};
use dotenv::dotenv;
use log::info;

use taskhub_backend::config::Config;
use taskhub_backend::jobs::{self, JobContext, JobQueue};
use taskhub_backend::mailer::Mailer;
use taskhub_backend::storage::LocalStorage;
use taskhub_backend::{db, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to create pool");
    db::init_schema(&pool).await.expect("Failed to apply schema");

    let storage = LocalStorage::new(&config.storage_root);
    let mailer = Mailer::from_config(&config);

    let (queue, job_rx) = JobQueue::new();
    let _worker = jobs::spawn_worker(
        job_rx,
        JobContext {
            pool: pool.clone(),
            storage: storage.clone(),
            mailer,
            queue: queue.clone(),
        },
    );

    info!("Server running at http://{}", config.bind_addr);

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(queue.clone()))
            .route(
                "/",
                web::get().to(|| async { HttpResponse::Ok().body("Taskhub API") }),
            )
            .configure(routes::routes::auth_configure)
            .configure(routes::routes::task_configure)
            .configure(routes::routes::attachment_configure)
            .configure(routes::routes::comment_configure)
            .configure(routes::routes::user_configure)
            .configure(routes::routes::report_configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}

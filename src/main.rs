use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod config;
mod db;
mod docs;
mod model;
mod routes;
mod stats;
mod store;
mod utils;

use config::Config;
use db::{ensure_schema, init_db};
use store::{InMemoryStore, MySqlStore, Store};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Youth group attendance service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // log file rotates daily under LOG_DIR
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = init_db(url, config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            if config.db_bootstrap_schema {
                ensure_schema(&pool)
                    .await
                    .context("failed to create database schema")?;
            }
            Arc::new(MySqlStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(InMemoryStore::new())
        }
    };
    info!(backend = store.backend(), "Store ready");

    let store = Data::from(store);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}

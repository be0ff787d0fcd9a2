// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod session;

use crate::config::Config;
use crate::services::{LLMService, PreviewStore, SessionController};

#[derive(Clone)]
pub struct AppState {
    controller: Arc<SessionController>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting prompt-architect service...");

    let config = Config::from_env().context("loading configuration")?;
    info!(
        "Using analysis model {} and regeneration model {}",
        config.analysis_model, config.regeneration_model
    );

    let llm_service = Arc::new(LLMService::new(&config));
    let previews = Arc::new(PreviewStore::new());
    let controller = Arc::new(SessionController::new(llm_service, previews));

    let app_state = AppState { controller };

    info!("Starting HTTP server on {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
            .route("/health", web::get().to(health_check))
    })
    .bind(&config.bind_address)
    .with_context(|| format!("binding {}", config.bind_address))?
    .run()
    .await
    .context("running HTTP server")?;

    Ok(())
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    let previews = data.controller.previews();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "prompt-architect",
        "version": env!("CARGO_PKG_VERSION"),
        "previews": {
            "live": previews.live_count(),
            "created": previews.created_count(),
            "released": previews.released_count()
        }
    }))
}

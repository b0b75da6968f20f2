//! Recommender Service - personalized product recommendations over HTTP
//!
//! Port: 50051 (override with RECOMMENDER_SERVICE_PORT)

use actix_web::{web, App, HttpServer};
use recommender_core::{
    init_tracing, load_dotenv, ConfigLoader, DatabaseConfig, DatabasePool, ServiceConfig,
    TracingConfig,
};
use recommender_engine::server::{self, AppState};
use recommender_engine::{
    spawn_retrain_task, PostgresInteractionStore, RecommendationService, RecommenderConfig,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let service_config = ServiceConfig::load()?;
    init_tracing(&TracingConfig::from_env().with_level(service_config.log_level.clone()))?;

    let database_config = DatabaseConfig::load()?;
    let recommender_config = RecommenderConfig::load()?;

    info!(
        solver = ?recommender_config.model.factorization.solver,
        factors = recommender_config.model.factorization.latent_factors,
        "Starting recommender service"
    );

    // All store access is read-only
    let db = DatabasePool::read_replica(&database_config).await?;
    let store = Arc::new(PostgresInteractionStore::from_database(&db));
    let service = Arc::new(RecommendationService::new(store, &recommender_config));

    if recommender_config.train_on_startup {
        if let Err(e) = service.train().await {
            warn!(error = %e, "Initial training failed; serving 503 until a pass succeeds");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let retrain_handle = recommender_config
        .retrain_interval
        .map(|interval| spawn_retrain_task(service.clone(), interval, shutdown_rx));

    let bind_addr = format!("{}:{}", service_config.host, service_config.port);
    info!("Recommender service listening on {}", bind_addr);

    let state = web::Data::new(AppState {
        service: service.clone(),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(server::configure_routes)
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(service_config.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = retrain_handle {
        let _ = handle.await;
    }

    info!("Recommender service stopped");
    Ok(())
}

use std::io;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use post_recommendation_service::config::Config;
use post_recommendation_service::db::FeatureRepository;
use post_recommendation_service::handlers::{get_post_recommendations, RecommendationHandlerState};
use post_recommendation_service::services::experiment::ExpGroup;
use post_recommendation_service::services::ranking::{LikeModel, OnnxLikeModel};
use post_recommendation_service::services::recommendation::RecommendationService;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!(
        "Starting post-recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to create database pool");

    // Startup is a one-time blocking load: tables and both models must be
    // resident before the server accepts traffic, and any failure is fatal.
    let repository = FeatureRepository::new(db_pool);
    let tables = repository
        .load_all(&config.tables)
        .await
        .map_err(|e| io::Error::other(format!("Failed to load feature tables: {e}")))?;

    let model_control = load_model(&config, ExpGroup::Control)?;
    let model_test = load_model(&config, ExpGroup::Test)?;

    let service = Arc::new(RecommendationService::new(
        tables,
        model_control,
        model_test,
        config.experiment.salt.clone(),
    ));
    tracing::info!("Recommendation service initialized");

    let state = web::Data::new(RecommendationHandlerState { service });
    let port = config.app.port;

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .service(get_post_recommendations)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

fn load_model(config: &Config, group: ExpGroup) -> io::Result<Box<dyn LikeModel>> {
    let path = config.model.path_for(group);
    tracing::info!(group = %group, path = %path.display(), "loading model");
    let feature_count = group.schema().columns.len();
    OnnxLikeModel::load(&path, feature_count)
        .map(|model| Box::new(model) as Box<dyn LikeModel>)
        .map_err(|e| io::Error::other(format!("Failed to load {group} model: {e}")))
}

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, docbuilder::HttpDocBuilder},
    config::Config,
    error::ApiError,
    uploads::UploadArea,
    web::{
        auth::{login_handler, me_handler, signup_handler},
        delete_history_handler, download_handler, generate_handler, list_history_handler,
        middleware::require_auth,
        rest::ApiDoc,
        state::AppState,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(format!("Migration failure: {e}")))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters & Upload Area ---
    let doc_builder = Arc::new(
        HttpDocBuilder::new(config.doc_builder_url.clone(), config.doc_builder_timeout)
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?,
    );

    let uploads = UploadArea::new(config.uploads_dir.clone());
    uploads.ensure_exists().await?;

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        doc_builder,
        uploads,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/generate", post(generate_handler))
        .route("/history", get(list_history_handler))
        .route("/history/{id}", delete(delete_history_handler))
        .route("/download/{filetype}/{filename}", get(download_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Civica server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use civica_api::{
    ConnectionRegistry, middleware::AppState, router as api_router, streaming_handler,
};
use civica_common::Config;
use civica_core::{
    BallotService, CommentService, FanoutService, NotificationService, SubjectService, UserService,
};
use civica_db::repositories::{
    BallotRepository, CommentRepository, NotificationRepository, SubjectRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civica=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting civica server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = civica_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    civica_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let subject_repo = SubjectRepository::new(Arc::clone(&db));
    let ballot_repo = BallotRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Live connection registry doubles as the fan-out push sink
    let registry = Arc::new(ConnectionRegistry::new());

    // Initialize services
    let notification_service = NotificationService::new(notification_repo);
    let fanout = FanoutService::new(
        notification_service.clone(),
        user_repo.clone(),
        Arc::clone(&registry) as _,
    );

    let state = AppState {
        user_service: UserService::new(user_repo),
        subject_service: SubjectService::new(subject_repo.clone()),
        ballot_service: BallotService::new(ballot_repo, fanout.clone()),
        comment_service: CommentService::new(comment_repo, subject_repo, fanout),
        notification_service,
        registry,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            civica_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

//! Web API module for TaskFlow

pub mod handlers;
pub mod state;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use state::SharedState;

/// Create the API router
pub fn create_api_router() -> Router<SharedState> {
    Router::new()
        // Board API
        .route("/columns", get(handlers::tasks::list_columns))
        // Tasks API
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/{id}",
            patch(handlers::tasks::update_task).delete(handlers::tasks::delete_task),
        )
        // Chat API
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::chat_stream))
}

/// Create the full router with CORS
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", create_api_router())
        .layer(cors)
        .with_state(state)
}

/// Start the web server
pub async fn start_server(host: &str, port: u16, state: SharedState) -> std::io::Result<()> {
    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    println!("TaskFlow API server: http://{}/api/v1", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(std::io::Error::other)
}

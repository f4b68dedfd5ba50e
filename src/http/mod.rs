//! JSON HTTP API over the services.
//!
//! Every `/api` route requires `Authorization: Bearer <token>`; `/health` does
//! not. Errors are `{"error": <message>, "code": <code>}`.

mod auth;
mod error;
mod handlers;

use std::{future::Future, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    ai_provider::StructuredProvider,
    evaluation::SelectionSource,
    identity::{IdentityProvider, SessionTokenIdentity},
    service::{Services, TaskLimits},
    store::RecordStore,
};

pub use error::{json_error, status_for};

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

pub struct AppState {
    pub services: Services,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wires the services and session-token identity over one store.
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn StructuredProvider>,
        limits: TaskLimits,
    ) -> Self {
        Self {
            services: Services::new(store.clone(), provider, limits),
            identity: Arc::new(SessionTokenIdentity::new(store)),
        }
    }

    pub fn with_selection(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn StructuredProvider>,
        limits: TaskLimits,
        selection: Arc<dyn SelectionSource>,
    ) -> Self {
        Self {
            services: Services::with_selection(store.clone(), provider, limits, selection),
            identity: Arc::new(SessionTokenIdentity::new(store)),
        }
    }
}

pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::handle_health))
        .route(
            "/api/tasks",
            post(handlers::handle_create_task).get(handlers::handle_list_tasks),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::handle_get_task)
                .put(handlers::handle_update_task)
                .delete(handlers::handle_delete_task),
        )
        .route("/api/ai/evaluate", post(handlers::handle_evaluate))
        .route("/api/ai/feedback", post(handlers::handle_feedback))
        .route("/api/evaluations", get(handlers::handle_list_evaluations))
        .route("/api/evaluations/{id}", get(handlers::handle_get_evaluation))
        .route("/api/payments", post(handlers::handle_create_payment))
        .route(
            "/api/payments/{id}",
            get(handlers::handle_get_payment).patch(handlers::handle_update_payment),
        )
        .route(
            "/api/subscription/status",
            get(handlers::handle_subscription_status),
        )
        .route(
            "/api/subscription/activate",
            post(handlers::handle_activate_subscription),
        )
        .fallback(handlers::handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state)
}

/// Serves `router` on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    tracing::info!(target: "http", addr = %local_addr, "http_server_listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")?;

    tracing::info!(target: "http", "http_server_stopped");
    Ok(())
}

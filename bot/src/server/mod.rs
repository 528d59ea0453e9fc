//! # docqa-bot HTTP Listener
//!
//! File: bot/src/server/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Binds the configured address and routes `POST /api/messages` into the
//! transport adapter. Requests are traced with `tower-http`; the server stops
//! accepting connections on Ctrl+C or SIGTERM and lets in-flight turns finish.
//!
//! ## Status Codes
//!
//! | Outcome                              | Status |
//! |--------------------------------------|--------|
//! | Turn handled, replies delivered      | 200    |
//! | `expectReplies` turn                 | 200 + `{"activities":[...]}` |
//! | Missing / malformed bearer token     | 401    |
//! | Body is not an activity              | 400    |
//! | Connector or token endpoint failure  | 502    |
//! | Anything else                        | 500    |
//!
use crate::core::config::BotConfig;
use crate::core::context::AppContext;
use crate::core::error::{BotError, Result};
use crate::transport::{self, TurnOutcome};
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

/// The single route the channel posts activities to.
pub const MESSAGES_ROUTE: &str = "/api/messages";

/// # Run HTTP Server (`run_server`)
///
/// Binds `config.host:config.port`, serves the bot until a shutdown signal
/// arrives, then returns.
///
/// ## Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server(config: &BotConfig, app: Arc<AppContext>) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    let router = create_app(app);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener to address {}", addr))?;
    let local_addr = listener.local_addr().unwrap_or(addr);

    info!(
        "docqa-bot listening on http://{}{}",
        local_addr, MESSAGES_ROUTE
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shutdown complete.");
    Ok(())
}

/// # Create Router (`create_app`)
///
/// The `POST /api/messages` route with request tracing.
pub fn create_app(app: Arc<AppContext>) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route(MESSAGES_ROUTE, post(handle_messages))
        .layer(ServiceBuilder::new().layer(trace_layer))
        .with_state(app)
}

async fn handle_messages(
    State(app): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match transport::process_activity(&app, authorization, &body).await {
        Ok(TurnOutcome::Delivered) => StatusCode::OK.into_response(),
        Ok(TurnOutcome::ExpectedReplies(activities)) => {
            (StatusCode::OK, Json(json!({ "activities": activities }))).into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Turn failed: {:#}", e);
            } else {
                warn!("Rejected request: {:#}", e);
            }
            status.into_response()
        }
    }
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<BotError>() {
        Some(BotError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
        Some(BotError::InvalidActivity(_)) => StatusCode::BAD_REQUEST,
        Some(BotError::Delivery { .. }) | Some(BotError::Token(_)) | Some(BotError::Http { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// # Handle Shutdown Signal (`shutdown_signal`)
///
/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// --- Unit Tests ---

//! dinedesk-server entry point.
//!
//! This file is intentionally thin: it sets up tracing, opens the database,
//! wires middleware, and starts the HTTP server. All route handlers live in
//! `routes.rs`; all shared state types live in `state.rs`.

use std::{future::IntoFuture, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use dinedesk_server::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist — production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let shared = Arc::new(
        state::AppState::init_from_env()
            .await
            .context("state init failed")?,
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));
    info!("dinedesk-server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Ctrl-c tears the whole process down: dropping the state drops the feed
    // sender, which closes every live session. SSE connections never finish
    // on their own, so a drain-style graceful shutdown would wait forever.
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result.context("server crashed")?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("DINEDESK_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins (the front-desk and kitchen UIs run on
/// the same host).
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

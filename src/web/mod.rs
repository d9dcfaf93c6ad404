//! Web layer: the axum router and server setup.
//!
//! Two POST endpoints (maths at `/check` and `/check/maths`, logic at
//! `/check/logic`) and a GET liveness probe at `/`. Handlers are thin
//! and delegate to the shared checker instances; access logging and CORS
//! are applied as middleware layers.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::engine::{LogicChecker, MathsChecker};

pub mod handlers;
pub mod responses;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub maths: Arc<MathsChecker>,
    pub logic: Arc<LogicChecker>,
    pub timeout_seconds: u64,
}

/// Web server configuration and setup.
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Config) -> Result<Self> {
        let state = AppState {
            maths: Arc::new(MathsChecker::new()),
            logic: Arc::new(LogicChecker::new()),
            timeout_seconds: config.checker.timeout_seconds,
        };
        let app = Self::create_router(state);
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware.
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::ping))
            .route("/check", post(handlers::check_maths))
            .route("/check/maths", post(handlers::check_maths))
            .route("/check/logic", post(handlers::check_logic))
            .fallback(handlers::not_found)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Start the web server.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Get the host address.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

pub mod assembler;
mod health;
mod ota;
pub mod validator;

use axum::{
    Router,
    routing::{any, get},
};
use ota_depot_core::{FirmwareResolver, OtaError, Result, ServerConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use assembler::MD5_HEADER;
pub use validator::{ACCEPTED_USER_AGENT, VERSION_HEADER};

pub struct HttpServer {
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.serve(listener, shutdown).await
    }

    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!("HTTP server listening on http://{}", addr);
        info!(
            "Serving firmware from {}",
            self.config.firmware_root.display()
        );

        let app = self.create_router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| OtaError::Http(e.to_string()))?;

        Ok(())
    }

    pub fn create_router(&self) -> Router {
        let state = AppState {
            resolver: Arc::new(FirmwareResolver::new(&self.config.firmware_root)),
        };

        Router::new()
            .route("/health", get(health::health))
            .route("/.ota/", any(ota::check_update))
            .route("/.ota/{*path}", any(ota::check_update))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<FirmwareResolver>,
}

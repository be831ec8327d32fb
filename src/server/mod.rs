//! # HTTP Server
//!
//! Axum server exposing the query endpoint, assembled from the shared
//! application state and the CORS policy in the configuration.

mod config;
mod errors;
mod routes;

pub use config::ServiceConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use routes::{api_routes, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::admission::AdmissionRegistry;
use crate::datastore::Datastore;
use crate::exec::ExecPolicy;
use crate::observability::{Logger, MetricsRegistry};
use crate::output::{DefaultFormatRegistry, FormatRegistry};

/// The assembled query server.
pub struct QueryServer {
    config: ServiceConfig,
    router: Router,
}

impl QueryServer {
    /// Creates a server over the given datastore.
    pub fn new(config: ServiceConfig, datastore: Arc<dyn Datastore>) -> Self {
        let state = AppState {
            admission: AdmissionRegistry::new(),
            datastore,
            formats: Arc::new(DefaultFormatRegistry) as Arc<dyn FormatRegistry>,
            policy: ExecPolicy {
                max_bbox_area: config.max_bbox_area,
            },
            metrics: Arc::new(MetricsRegistry::new()),
        };
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        api_routes(state).layer(cors)
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Binds and serves until the process is stopped.
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;

        Logger::info("SERVER_STARTED", &[("addr", &addr.to_string())]);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}

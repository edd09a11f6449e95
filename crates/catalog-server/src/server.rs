use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::ServiceExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

use catalog_repo::{
    CatalogCategoryService, CatalogProductService, CategoryService, JsonlCategoryRepository,
    JsonlProductRepository, ProductService,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, cors_layer, trim_trailing_slash, App};
use crate::state::AppState;

/// Catalog HTTP server.
pub struct CatalogServer {
    config: ServerConfig,
    state: AppState,
}

impl CatalogServer {
    /// Open the product file named by `config` and wire up the services.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store_config = config.store_config();
        let products =
            JsonlProductRepository::open_with_config(&config.data_file, store_config.clone())?;
        let categories =
            JsonlCategoryRepository::open_with_config(&config.data_file, store_config)?;
        info!(
            path = %products.store().path().display(),
            products = products.store().len(),
            "catalog loaded"
        );
        let products: Arc<dyn ProductService> =
            Arc::new(CatalogProductService::new(Arc::new(products)));
        let categories: Arc<dyn CategoryService> =
            Arc::new(CatalogCategoryService::new(Arc::new(categories)));
        Ok(Self::with_services(config, products, categories))
    }

    /// Build a server around existing services.
    pub fn with_services(
        config: ServerConfig,
        products: Arc<dyn ProductService>,
        categories: Arc<dyn CategoryService>,
    ) -> Self {
        let state = AppState::new(products, categories, config.request_timeout());
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        let cors = cors_layer(&self.config.cors_allowed_origins)?;
        Ok(build_router(self.state.clone(), cors))
    }

    /// The router wrapped for serving, with trailing slashes trimmed.
    pub fn app(&self) -> ServerResult<App> {
        Ok(trim_trailing_slash(self.router()?))
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.app()?;
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "catalog server listening");
        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("catalog server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
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
    info!("shutdown signal received");
}

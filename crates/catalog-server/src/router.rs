use std::time::Duration;

use axum::http::header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

use crate::error::{ServerError, ServerResult};
use crate::handler;
use crate::state::AppState;

const CORS_MAX_AGE: Duration = Duration::from_secs(300);

/// The router behind trailing-slash trimming, ready to serve.
pub type App = NormalizePath<Router>;

/// Build the axum router with all catalog endpoints.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/products", get(handler::list_products))
        .route("/products/:id", get(handler::get_product))
        .route("/categories", get(handler::list_categories))
        .route("/categories/:name", get(handler::get_category));

    Router::new()
        .route("/ping", get(handler::ping))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Strip trailing slashes before routing, so `/api/v1/products/` reaches
/// the same handler as `/api/v1/products`. This must wrap the router from
/// outside; a layer added with `Router::layer` only runs after routing.
pub fn trim_trailing_slash(router: Router) -> App {
    NormalizePath::trim_trailing_slash(router)
}

/// CORS policy for `origins`. A `*` entry allows any origin; credentials
/// are only allowed with an explicit origin list.
pub fn cors_layer(origins: &[String]) -> ServerResult<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([LINK])
        .max_age(CORS_MAX_AGE);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| ServerError::Config(format!("invalid CORS origin {o:?}: {e}")))
        })
        .collect::<ServerResult<Vec<_>>>()?;
    Ok(layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_list_both_build() {
        assert!(cors_layer(&["*".to_string()]).is_ok());
        assert!(cors_layer(&["https://shop.example".to_string()]).is_ok());
        assert!(cors_layer(&[]).is_ok());
    }

    #[test]
    fn invalid_origin_is_config_error() {
        let err = cors_layer(&["bad\norigin".to_string()]).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}

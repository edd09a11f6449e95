//! HTTP API for the product catalog.
//!
//! Serves product listing with filters and pagination, product lookup by
//! id, the category list and category lookup by name, plus a `/ping`
//! heartbeat. Every error uses the same `{code, message, status}` body.

pub mod config;
pub mod error;
pub mod handler;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use response::{ApiError, Data, ErrorBody, Paginated};
pub use router::App;
pub use server::CatalogServer;
pub use state::AppState;

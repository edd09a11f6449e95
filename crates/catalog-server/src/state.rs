use std::sync::Arc;
use std::time::Duration;

use catalog_repo::{CategoryService, ProductService, RequestContext};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductService>,
    pub categories: Arc<dyn CategoryService>,
    pub request_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        products: Arc<dyn ProductService>,
        categories: Arc<dyn CategoryService>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            products,
            categories,
            request_timeout,
        }
    }

    /// A fresh context for one request.
    pub fn context(&self) -> RequestContext {
        match self.request_timeout {
            Some(timeout) => RequestContext::with_timeout(timeout),
            None => RequestContext::background(),
        }
    }
}

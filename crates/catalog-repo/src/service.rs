//! Async services in front of the blocking repositories.
//!
//! Each call validates its input, moves the repository work onto the
//! blocking pool and, when the request context carries a deadline, stops
//! waiting once it passes. The abandoned work still runs to completion.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;
use tracing::warn;

use catalog_types::{Category, Page, Product, ProductFilter, RequestContext};

use crate::error::{RepoError, RepoResult};
use crate::traits::{CategoryRepository, ProductRepository};

#[async_trait]
pub trait ProductService: Send + Sync {
    async fn get_all(&self, ctx: RequestContext, filter: ProductFilter)
        -> RepoResult<Page<Product>>;

    async fn get_by_id(&self, ctx: RequestContext, id: String) -> RepoResult<Product>;
}

#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn get_all(&self, ctx: RequestContext) -> RepoResult<Vec<Category>>;

    async fn get_by_name(&self, ctx: RequestContext, name: String) -> RepoResult<Category>;
}

/// Run `work` on the blocking pool, bounded by the context's deadline.
async fn run_blocking<T, F>(ctx: RequestContext, work: F) -> RepoResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RepoResult<T> + Send + 'static,
{
    let handle = task::spawn_blocking(work);
    let joined = match ctx.remaining() {
        Some(remaining) => with_deadline(remaining, handle).await?,
        None => handle.await,
    };
    joined.map_err(|e| {
        warn!(error = %e, "repository task failed");
        RepoError::Internal(e.to_string())
    })?
}

async fn with_deadline<F: Future>(
    remaining: std::time::Duration,
    fut: F,
) -> RepoResult<F::Output> {
    tokio::time::timeout(remaining, fut)
        .await
        .map_err(|_| RepoError::DeadlineExceeded)
}

/// [`ProductService`] backed by a [`ProductRepository`].
#[derive(Clone)]
pub struct CatalogProductService {
    repo: Arc<dyn ProductRepository>,
}

impl CatalogProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ProductService for CatalogProductService {
    async fn get_all(
        &self,
        ctx: RequestContext,
        filter: ProductFilter,
    ) -> RepoResult<Page<Product>> {
        filter.validate()?;
        let repo = Arc::clone(&self.repo);
        run_blocking(ctx, move || repo.get_all_with_context(&ctx, &filter)).await
    }

    async fn get_by_id(&self, ctx: RequestContext, id: String) -> RepoResult<Product> {
        let repo = Arc::clone(&self.repo);
        run_blocking(ctx, move || repo.get_by_id_with_context(&ctx, &id)).await
    }
}

/// [`CategoryService`] backed by a [`CategoryRepository`].
#[derive(Clone)]
pub struct CatalogCategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CatalogCategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CategoryService for CatalogCategoryService {
    async fn get_all(&self, ctx: RequestContext) -> RepoResult<Vec<Category>> {
        let repo = Arc::clone(&self.repo);
        run_blocking(ctx, move || repo.get_all_with_context(&ctx)).await
    }

    async fn get_by_name(&self, ctx: RequestContext, name: String) -> RepoResult<Category> {
        let repo = Arc::clone(&self.repo);
        run_blocking(ctx, move || repo.get_by_name_with_context(&ctx, &name)).await
    }
}

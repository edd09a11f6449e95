use catalog_types::{Category, Page, Product, ProductFilter, RequestContext};

use crate::error::{RepoError, RepoResult};

/// Refuse to start work for a request whose deadline has already passed.
fn ensure_live(ctx: &RequestContext) -> RepoResult<()> {
    if ctx.is_expired() {
        return Err(RepoError::DeadlineExceeded);
    }
    Ok(())
}

/// Read access to products.
///
/// Implementations block on I/O. The `*_with_context` variants check the
/// request context before starting; they do not interrupt work in progress.
pub trait ProductRepository: Send + Sync {
    /// Fetch a product by its identifier.
    fn get_by_id(&self, id: &str) -> RepoResult<Product>;

    /// List one page of the products matching `filter`.
    fn get_all(&self, filter: &ProductFilter) -> RepoResult<Page<Product>>;

    fn get_by_id_with_context(&self, ctx: &RequestContext, id: &str) -> RepoResult<Product> {
        ensure_live(ctx)?;
        self.get_by_id(id)
    }

    fn get_all_with_context(
        &self,
        ctx: &RequestContext,
        filter: &ProductFilter,
    ) -> RepoResult<Page<Product>> {
        ensure_live(ctx)?;
        self.get_all(filter)
    }
}

/// Write access to products.
pub trait ProductWriter: Send + Sync {
    /// Add a product. Returns the byte offset it was stored at.
    fn add(&self, product: &Product) -> RepoResult<u64>;
}

/// Read access to the categories products belong to.
pub trait CategoryRepository: Send + Sync {
    /// Every distinct category, sorted by name.
    fn get_all(&self) -> RepoResult<Vec<Category>>;

    /// The category with exactly this name, if any product uses it.
    fn get_by_name(&self, name: &str) -> RepoResult<Category>;

    fn get_all_with_context(&self, ctx: &RequestContext) -> RepoResult<Vec<Category>> {
        ensure_live(ctx)?;
        self.get_all()
    }

    fn get_by_name_with_context(&self, ctx: &RequestContext, name: &str) -> RepoResult<Category> {
        ensure_live(ctx)?;
        self.get_by_name(name)
    }
}

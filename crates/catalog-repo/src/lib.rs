//! Product and category access for the catalog.
//!
//! Repositories are synchronous and sit directly on a
//! [`catalog_store::JsonLineStore`] over the product file. Services wrap
//! them for async callers, validating input and bounding each call by the
//! request's deadline.

pub mod category;
pub mod error;
pub mod product;
pub mod service;
pub mod traits;

pub use category::JsonlCategoryRepository;
pub use error::{RepoError, RepoResult};
pub use product::{JsonlProductRepository, ProductMatcher};
pub use service::{CatalogCategoryService, CatalogProductService, CategoryService, ProductService};
pub use traits::{CategoryRepository, ProductRepository, ProductWriter};

pub use catalog_types::{Category, Page, Product, ProductFilter, RequestContext};

use std::path::Path;

use tracing::debug;

use catalog_store::{JsonLineStore, StoreConfig};
use catalog_types::{Page, Product, ProductFilter, MAX_PAGE_SIZE};

use crate::error::{RepoError, RepoResult};
use crate::traits::{ProductRepository, ProductWriter};

const KIND: &str = "product";

/// Products stored one per line, indexed by product identifier.
pub struct JsonlProductRepository {
    store: JsonLineStore<Product>,
}

impl JsonlProductRepository {
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> RepoResult<Self> {
        let store = JsonLineStore::open_with_config(path, |p: &Product| p.id.clone(), config)?;
        debug!(path = %store.path().display(), products = store.len(), "product repository opened");
        Ok(Self { store })
    }

    /// The underlying record store.
    pub fn store(&self) -> &JsonLineStore<Product> {
        &self.store
    }
}

impl ProductRepository for JsonlProductRepository {
    fn get_by_id(&self, id: &str) -> RepoResult<Product> {
        self.store
            .find_by_id(id)
            .map_err(|e| RepoError::from_store(KIND, e))
    }

    fn get_all(&self, filter: &ProductFilter) -> RepoResult<Page<Product>> {
        let matcher = ProductMatcher::new(filter);
        let mut items = Vec::with_capacity(filter.page_size.min(MAX_PAGE_SIZE));
        let total = self.store.find_all_where_paginated(
            |p| matcher.matches(p),
            filter.page,
            filter.page_size,
            |p| {
                items.push(p);
                Ok::<_, RepoError>(())
            },
        )?;
        Ok(Page::new(items, total))
    }
}

impl ProductWriter for JsonlProductRepository {
    fn add(&self, product: &Product) -> RepoResult<u64> {
        self.store
            .save(product)
            .map_err(|e| RepoError::from_store(KIND, e))
    }
}

/// A [`ProductFilter`] prepared for repeated matching.
///
/// Name and category comparisons ignore case; the filter's strings are
/// lowercased once up front.
#[derive(Clone, Debug)]
pub struct ProductMatcher {
    name: Option<String>,
    categories: Vec<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

impl ProductMatcher {
    pub fn new(filter: &ProductFilter) -> Self {
        Self {
            name: filter
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(str::to_lowercase),
            categories: filter
                .categories
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| c.to_lowercase())
                .collect(),
            min_price: filter.min_bound(),
            max_price: filter.max_bound(),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = &self.name {
            if !product.name.to_lowercase().contains(name.as_str()) {
                return false;
            }
        }
        if !self.categories.is_empty() {
            let category = product.category.to_lowercase();
            if !self.categories.iter().any(|c| *c == category) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }
}

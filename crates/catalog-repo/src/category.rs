use std::collections::BTreeSet;
use std::path::Path;

use catalog_store::{DuplicatePolicy, JsonLineStore, StoreConfig};
use catalog_types::{Category, Product};

use crate::error::{RepoError, RepoResult};
use crate::traits::CategoryRepository;

/// Categories derived from the product file.
///
/// Opens its own store over the product file keyed by category. Many
/// products share a category, so the index is not a per-category lookup;
/// the store is used as a scan source and results are synthesized from the
/// category field of the products seen.
pub struct JsonlCategoryRepository {
    store: JsonLineStore<Product>,
}

impl JsonlCategoryRepository {
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open with `config`. The duplicate policy is always `LastWins`.
    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> RepoResult<Self> {
        let config = config.with_duplicate_policy(DuplicatePolicy::LastWins);
        let store =
            JsonLineStore::open_with_config(path, |p: &Product| p.category.clone(), config)?;
        Ok(Self { store })
    }
}

impl CategoryRepository for JsonlCategoryRepository {
    fn get_all(&self) -> RepoResult<Vec<Category>> {
        let mut names = BTreeSet::new();
        self.store.find_all(|p| {
            names.insert(p.category);
            Ok::<_, RepoError>(())
        })?;
        Ok(names.into_iter().map(Category::new).collect())
    }

    fn get_by_name(&self, name: &str) -> RepoResult<Category> {
        let mut found = false;
        self.store.find_all_where(
            |p| p.category == name,
            |_| {
                found = true;
                Ok::<_, RepoError>(())
            },
        )?;
        if found {
            Ok(Category::new(name))
        } else {
            Err(RepoError::NotFound {
                kind: "category",
                key: name.to_string(),
            })
        }
    }
}

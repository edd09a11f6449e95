use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Page number used when the caller does not ask for one.
pub const DEFAULT_PAGE: usize = 1;
/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Listing criteria for products plus the requested page window.
///
/// Empty criteria match everything. Price bounds are inclusive and only
/// take effect when strictly positive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A product matches if its category equals any of these, ignoring case.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            name: None,
            categories: Vec::new(),
            min_price: None,
            max_price: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductFilter {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// The effective lower price bound, if any.
    pub fn min_bound(&self) -> Option<f64> {
        self.min_price.filter(|p| *p > 0.0)
    }

    /// The effective upper price bound, if any.
    pub fn max_bound(&self) -> Option<f64> {
        self.max_price.filter(|p| *p > 0.0)
    }

    /// Check the page window and price bounds.
    pub fn validate(&self) -> TypeResult<()> {
        if self.page < 1 {
            return Err(TypeError::validation("page", "must be at least 1"));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(TypeError::validation(
                "pageSize",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        for (field, value) in [("minPrice", self.min_price), ("maxPrice", self.max_price)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(TypeError::validation(field, "must be a non-negative number"));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_bound(), self.max_bound()) {
            if min > max {
                return Err(TypeError::validation("minPrice", "must not exceed maxPrice"));
            }
        }
        Ok(())
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// A catalog product.
///
/// The JSON form of this struct is the on-disk record format: one product per
/// line in the backing file, with camelCase field names and the identifier
/// stored under `productId`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Primary identifier, unique within a catalog file.
    #[serde(rename = "productId")]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub name: String,
    /// List price before any discount.
    #[serde(default)]
    pub original_price: f64,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i64,
}

impl Product {
    /// Create a product with the required fields; the rest take defaults.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            name: name.into(),
            original_price: price,
            price,
            category: category.into(),
            image: String::new(),
            in_stock: true,
            rating: 0.0,
            reviews: 0,
        }
    }

    /// Parse a product from a single JSON document.
    pub fn from_json(json: &str) -> TypeResult<Self> {
        serde_json::from_str(json).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Fraction of the original price taken off, if the product is discounted.
    pub fn discount(&self) -> Option<f64> {
        if self.original_price > 0.0 && self.price < self.original_price {
            Some(1.0 - self.price / self.original_price)
        } else {
            None
        }
    }
}

/// A category, identified only by its name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

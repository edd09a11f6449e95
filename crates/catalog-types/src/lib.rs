//! Domain types for the product catalog.
//!
//! Every other catalog crate depends on `catalog-types`. The types here are
//! plain values: they know how to serialize themselves and validate their own
//! invariants, nothing more.
//!
//! # Key Types
//!
//! - [`Product`] — A catalog entry, stored as one JSON line
//! - [`Category`] — A distinct category name derived from products
//! - [`ProductFilter`] — Listing criteria plus the requested page window
//! - [`Page`] — One window of results with the total match count
//! - [`RequestContext`] — Optional deadline carried through a request

pub mod context;
pub mod error;
pub mod filter;
pub mod page;
pub mod product;

pub use context::RequestContext;
pub use error::{TypeError, TypeResult};
pub use filter::{ProductFilter, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use page::Page;
pub use product::{Category, Product};

//! Indexed line-oriented record store.
//!
//! A [`JsonLineStore`] keeps records of any serde type as newline-delimited
//! JSON in a single append-only file, and holds an in-memory map from a
//! caller-supplied identity key to the byte offset of each record's line.
//! The map gives O(1) point lookup; everything else is a sequential scan.
//!
//! # Operations
//!
//! - [`JsonLineStore::find_by_id`] -- seek to the indexed offset, read one line
//! - [`JsonLineStore::save`] -- append a record, rejecting known keys
//! - [`JsonLineStore::find_all`] -- visit every record in file order
//! - [`JsonLineStore::find_all_where`] -- visit records matching a predicate
//! - [`JsonLineStore::find_all_where_paginated`] -- visit one page of matches
//!   and report the total match count
//!
//! # Design Rules
//!
//! 1. The file is only ever appended to; it is never rewritten or compacted.
//! 2. The index is rebuilt on open and never persisted.
//! 3. One mutex serializes every operation on a store, I/O included.
//! 4. Write, then index: an entry is added only after its line is written.
//! 5. Scans parse every line and stop at the first error.
//! 6. Corruption carries the file path and line (or byte offset), so it is
//!    distinguishable from a missing record and from a visitor's own error.

pub mod config;
pub mod error;
mod lines;
pub mod root;
pub mod store;

pub use config::{DuplicatePolicy, StoreConfig, DEFAULT_MAX_LINE_LEN};
pub use error::{Position, StoreError, StoreResult};
pub use root::{project_root, resolve_in, ROOT_ENV};
pub use store::{IdentityFn, JsonLineStore};

//! Catalog - the remote documents a search is assembled from
//!
//! # Overview
//!
//! A catalog document names groups of modules and where each group's
//! listing lives. Listings hold the module records that get searched.
//!
//! ```text
//! catalog.json                 ← { "groups": [ { "id", "path" }, ... ] }
//!     │
//!     ├── g1.json              ← { "modules": [ ModuleRecord, ... ] }
//!     ├── sub/g2.json          ← relative to the catalog's directory
//!     └── https://other/g3.json
//! ```
//!
//! Both documents are owned by someone else and may change at any time, so
//! they are decoded leniently: missing or mistyped fields shrink the result
//! rather than failing it.

mod document;
mod loader;

pub use document::{CatalogDocument, GroupListing, GroupRef, ModuleRecord};
pub use loader::{CatalogLoader, LoadedCatalog};

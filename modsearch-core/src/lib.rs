//! Federated module search
//!
//! Fetches a remote catalog of module groups, fans out to every group's
//! listing, and filters the merged pool into a capped result page.
//!
//! ```text
//! request → CatalogLoader → GroupAggregator → filter_and_page → SearchResponse
//!                 │                │
//!                 └── JsonFetcher ─┘   (resolve + CacheBuster on every URL)
//! ```

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod resolve;
pub mod service;

#[cfg(feature = "server")]
pub mod server;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use service::{SearchOutcome, SearchRequest, SearchResponse, SearchService, SearchStatus};

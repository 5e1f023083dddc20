//! Search service - catalog → groups → filter → page
//!
//! [`SearchService`] owns the configuration and fetcher and runs one request
//! end to end. It always produces a well-formed [`SearchResponse`]; the
//! accompanying [`SearchStatus`] tells the transport which status to use.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{GroupAggregator, GroupFailure, GroupLoad};
use crate::catalog::{CatalogLoader, ModuleRecord};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::fetch::{HttpFetcher, JsonFetcher};
use crate::filter::{filter_and_page, normalize_limit};
use crate::resolve::CacheBuster;

/// Inbound query parameters, kept raw so bad values normalize instead of failing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text filter
    #[serde(default)]
    pub q: Option<String>,

    /// Page size, clamped to 1..=50 (default 20)
    #[serde(default)]
    pub limit: Option<String>,

    /// Cache-bust override reused for every outbound fetch
    #[serde(default)]
    pub ts: Option<String>,
}

impl SearchRequest {
    pub fn new(query: Option<&str>, limit: Option<usize>) -> Self {
        Self {
            q: query.map(String::from),
            limit: limit.map(|l| l.to_string()),
            ts: None,
        }
    }
}

/// Response body for `/api/search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<ModuleRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Groups left out of this response
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<GroupFailure>,
}

impl SearchResponse {
    fn failed(error: &SearchError) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error.to_string()),
            failures: Vec::new(),
        }
    }
}

/// How a request ended, for mapping onto a transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Results produced, possibly with some groups missing
    Ok,
    /// No catalog location configured
    ConfigMissing,
    /// The catalog itself could not be fetched or decoded
    CatalogUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub response: SearchResponse,
}

/// Response body for `/api/debug`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugReport {
    pub catalog_url: String,
    pub allowed_groups: Vec<String>,
    pub catalog_ok: bool,
    pub loaded: Vec<GroupLoad>,
    pub errors: Vec<String>,
}

/// Runs the search pipeline with an explicit configuration
#[derive(Clone)]
pub struct SearchService {
    config: SearchConfig,
    loader: CatalogLoader,
    aggregator: GroupAggregator,
}

impl SearchService {
    /// Service backed by a reqwest [`HttpFetcher`]
    pub fn new(config: SearchConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: SearchConfig, fetcher: Arc<dyn JsonFetcher>) -> Self {
        let timeout = config.timeout();
        Self {
            loader: CatalogLoader::new(fetcher.clone(), timeout),
            aggregator: GroupAggregator::new(fetcher, timeout),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run one search request
    pub async fn search(&self, request: &SearchRequest) -> SearchOutcome {
        let buster = CacheBuster::from_override(request.ts.as_deref());
        let limit = normalize_limit(request.limit.as_deref());

        let catalog = match self
            .loader
            .load(
                self.config.catalog_url.as_deref(),
                &self.config.allowed_groups,
                &buster,
            )
            .await
        {
            Ok(catalog) => catalog,
            Err(e) => {
                let status = if e.is_fatal_for_request() {
                    SearchStatus::ConfigMissing
                } else {
                    SearchStatus::CatalogUnavailable
                };
                warn!(url = e.url().unwrap_or_default(), "Search aborted: {}", e);
                return SearchOutcome {
                    status,
                    response: SearchResponse::failed(&e),
                };
            }
        };

        let aggregation = self
            .aggregator
            .aggregate(&catalog.groups, &catalog.url, &buster)
            .await;

        let items: Vec<ModuleRecord> = filter_and_page(&aggregation.pool, request.q.as_deref(), limit)
            .into_iter()
            .map(|entry| {
                if self.config.annotate_group {
                    entry.record.annotated(&entry.group_id)
                } else {
                    entry.record.clone()
                }
            })
            .collect();

        info!(
            query = request.q.as_deref().unwrap_or(""),
            limit,
            pool = aggregation.pool_size(),
            items = items.len(),
            failed_groups = aggregation.failures.len(),
            "Search completed"
        );

        SearchOutcome {
            status: SearchStatus::Ok,
            response: SearchResponse {
                items,
                error: None,
                failures: aggregation.failures,
            },
        }
    }

    /// Fetch the catalog and every selected group, reporting per-group counts
    pub async fn diagnose(&self) -> DebugReport {
        let mut report = DebugReport {
            catalog_url: self.config.catalog_url.clone().unwrap_or_default(),
            allowed_groups: self.config.allowed_groups.clone(),
            ..Default::default()
        };

        let buster = CacheBuster::new();
        let catalog = match self
            .loader
            .load(
                self.config.catalog_url.as_deref(),
                &self.config.allowed_groups,
                &buster,
            )
            .await
        {
            Ok(catalog) => catalog,
            Err(e) => {
                report.errors.push(e.to_string());
                return report;
            }
        };

        report.catalog_ok = catalog.declared > 0;

        let aggregation = self
            .aggregator
            .aggregate(&catalog.groups, &catalog.url, &buster)
            .await;

        report.loaded = aggregation.loaded;
        report.errors = aggregation
            .failures
            .into_iter()
            .map(|f| match f.url {
                Some(url) => format!("load fail: {} {}", url, f.reason),
                None => format!("load fail: {} {}", f.group, f.reason),
            })
            .collect();

        report
    }
}

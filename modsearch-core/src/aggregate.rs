//! Group aggregation - fan out to every selected group and merge the results
//!
//! Each group is fetched independently and concurrently. A group that fails
//! is recorded in [`Aggregation::failures`] and the rest still contribute.
//! Results are merged by group index, so the pool follows catalog order no
//! matter which fetch finishes first.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{GroupListing, GroupRef, ModuleRecord};
use crate::error::Result;
use crate::fetch::JsonFetcher;
use crate::resolve::{base_directory, resolve, CacheBuster};

/// A module in the pool together with the group it came from
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub group_id: String,
    pub record: ModuleRecord,
}

/// A group that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
    /// Group id from the catalog
    pub group: String,

    /// Resolved URL, when resolution got that far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Human-readable reason
    pub reason: String,
}

/// A group that was fetched, with how many records it contributed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLoad {
    pub id: String,
    pub path: String,
    pub url: String,
    pub count: usize,
}

/// Everything gathered for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Modules in catalog group order, then listing order
    pub pool: Vec<PoolEntry>,

    /// Groups that contributed (possibly zero records), in catalog order
    pub loaded: Vec<GroupLoad>,

    /// Groups that failed, in catalog order
    pub failures: Vec<GroupFailure>,
}

impl Aggregation {
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}

/// Fetches group listings concurrently through a [`JsonFetcher`]
#[derive(Clone)]
pub struct GroupAggregator {
    fetcher: Arc<dyn JsonFetcher>,
    timeout: Duration,
}

enum GroupOutcome {
    Loaded(GroupLoad, Vec<ModuleRecord>),
    Failed(GroupFailure),
}

impl GroupAggregator {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch every group in `groups` relative to `catalog_url`'s directory
    ///
    /// Never fails as a whole: per-group errors land in `failures`.
    pub async fn aggregate(
        &self,
        groups: &[GroupRef],
        catalog_url: &str,
        buster: &CacheBuster,
    ) -> Aggregation {
        let base = base_directory(catalog_url);

        let outcomes = join_all(
            groups
                .iter()
                .map(|group| self.fetch_group(group, &base, buster)),
        )
        .await;

        let mut aggregation = Aggregation::default();
        for (group, outcome) in groups.iter().zip(outcomes) {
            match outcome {
                GroupOutcome::Loaded(load, records) => {
                    aggregation
                        .pool
                        .extend(records.into_iter().map(|record| PoolEntry {
                            group_id: group.id.clone(),
                            record,
                        }));
                    aggregation.loaded.push(load);
                }
                GroupOutcome::Failed(failure) => aggregation.failures.push(failure),
            }
        }

        debug!(
            "Aggregated {} module(s) from {} group(s), {} failed",
            aggregation.pool.len(),
            aggregation.loaded.len(),
            aggregation.failures.len()
        );

        aggregation
    }

    async fn fetch_group(&self, group: &GroupRef, base: &str, buster: &CacheBuster) -> GroupOutcome {
        let url = match resolve(&group.path, base) {
            Ok(url) => url,
            Err(e) => {
                warn!("Group '{}' has unusable path '{}': {}", group.id, group.path, e);
                return GroupOutcome::Failed(GroupFailure {
                    group: group.id.clone(),
                    url: None,
                    reason: e.to_string(),
                });
            }
        };

        match self.fetch_listing(&url, buster).await {
            Ok(listing) => {
                debug!(
                    "Fetched group '{}' from {}: {} module(s)",
                    group.id,
                    url,
                    listing.modules.len()
                );
                GroupOutcome::Loaded(
                    GroupLoad {
                        id: group.id.clone(),
                        path: group.path.clone(),
                        url,
                        count: listing.modules.len(),
                    },
                    listing.modules,
                )
            }
            Err(e) => {
                warn!("Failed to load group '{}': {}", group.id, e);
                GroupOutcome::Failed(GroupFailure {
                    group: group.id.clone(),
                    url: Some(url),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn fetch_listing(&self, url: &str, buster: &CacheBuster) -> Result<GroupListing> {
        let value = self
            .fetcher
            .fetch_json(&buster.apply(url), self.timeout)
            .await?;
        Ok(GroupListing::from_value(value))
    }
}

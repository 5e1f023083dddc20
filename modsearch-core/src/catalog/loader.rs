//! Catalog loading - fetch the catalog and select the configured groups

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{CatalogDocument, GroupRef};
use crate::error::{Result, SearchError};
use crate::fetch::JsonFetcher;
use crate::resolve::CacheBuster;

/// A fetched catalog narrowed to the groups this service serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedCatalog {
    /// Catalog URL as configured (without the cache-bust token)
    pub url: String,

    /// Number of well-formed groups the catalog declared
    pub declared: usize,

    /// Groups passing the allow-list, in catalog order
    pub groups: Vec<GroupRef>,
}

/// Fetches catalogs through a [`JsonFetcher`]
#[derive(Clone)]
pub struct CatalogLoader {
    fetcher: Arc<dyn JsonFetcher>,
    timeout: Duration,
}

impl CatalogLoader {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch the catalog at `catalog_url` and select groups from `allowed`
    ///
    /// An absent or blank URL fails with [`SearchError::ConfigMissing`]
    /// before anything is fetched. An empty `allowed` selects every group.
    pub async fn load(
        &self,
        catalog_url: Option<&str>,
        allowed: &[String],
        buster: &CacheBuster,
    ) -> Result<LoadedCatalog> {
        let url = catalog_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(SearchError::ConfigMissing)?;

        let value = self
            .fetcher
            .fetch_json(&buster.apply(url), self.timeout)
            .await?;

        let document = CatalogDocument::from_value(&value);
        let declared = document.groups.len();
        let groups = document.select(allowed);

        debug!(
            "Catalog {} declares {} group(s), {} selected",
            url,
            declared,
            groups.len()
        );

        Ok(LoadedCatalog {
            url: url.to_string(),
            declared,
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{MockFetcher, MockReply};
    use serde_json::json;

    const CATALOG: &str = "https://h/x/modules/catalog.json";

    fn loader(fetcher: MockFetcher) -> (CatalogLoader, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        (
            CatalogLoader::new(fetcher.clone(), Duration::from_millis(50)),
            fetcher,
        )
    }

    #[tokio::test]
    async fn test_missing_url_fails_without_fetching() {
        let (loader, fetcher) = loader(MockFetcher::new());
        let buster = CacheBuster::new();

        let err = loader.load(None, &[], &buster).await.unwrap_err();
        assert!(matches!(err, SearchError::ConfigMissing));

        let err = loader.load(Some("  "), &[], &buster).await.unwrap_err();
        assert!(matches!(err, SearchError::ConfigMissing));

        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_load_applies_allow_list_and_token() {
        let (loader, fetcher) = loader(MockFetcher::new().json(
            CATALOG,
            json!({"groups": [
                {"id": "a", "path": "a.json"},
                {"id": "b", "path": "b.json"}
            ]}),
        ));
        let buster = CacheBuster::from_override(Some("tok"));

        let loaded = loader
            .load(Some(CATALOG), &["b".to_string()], &buster)
            .await
            .unwrap();

        assert_eq!(loaded.declared, 2);
        assert_eq!(loaded.groups.len(), 1);
        assert_eq!(loaded.groups[0].id, "b");
        assert_eq!(fetcher.requested(), vec![format!("{CATALOG}?ts=tok")]);
    }

    #[tokio::test]
    async fn test_catalog_fetch_failure_propagates() {
        let (loader, _) = loader(MockFetcher::new().reply(CATALOG, MockReply::Timeout));

        let err = loader
            .load(Some(CATALOG), &[], &CacheBuster::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Timeout { .. }));
    }
}

//! Remote state observation
//!
//! Any error from the existence check counts as "absent". The observer never
//! distinguishes a missing bucket from one it could not reach.

use crate::naming::CanonicalName;
use crate::provider::{BucketSummary, StorageProvider, TagSet};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Observed state of a single sandbox bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    pub exists: bool,
    pub tags: TagSet,
}

/// A sandbox bucket found while enumerating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxEntry {
    pub name: CanonicalName,
    pub tags: TagSet,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct Observer<'a, P: StorageProvider> {
    provider: &'a P,
}

impl<'a, P: StorageProvider> Observer<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Whether the bucket exists and, if it does, its tag set
    pub async fn observe(&self, name: &CanonicalName) -> RemoteState {
        match self.provider.head_bucket(name.as_str()).await {
            Ok(()) => RemoteState {
                exists: true,
                tags: self.tags_or_empty(name.as_str()).await,
            },
            Err(e) => {
                debug!(bucket = %name, error = %e, "Bucket treated as absent");
                RemoteState::default()
            }
        }
    }

    /// Every bucket whose name contains `sandbox`, with best-effort tags
    pub async fn list_all(&self) -> Result<Vec<SandboxEntry>> {
        let buckets = self.provider.list_buckets().await?;
        let mut entries = Vec::new();

        for BucketSummary { name, created_at } in buckets {
            let name = CanonicalName::from_remote(name);
            if !name.is_sandbox() {
                continue;
            }
            let tags = self.tags_or_empty(name.as_str()).await;
            entries.push(SandboxEntry {
                name,
                tags,
                created_at,
            });
        }

        debug!(count = entries.len(), "Enumerated sandboxes");
        Ok(entries)
    }

    async fn tags_or_empty(&self, bucket: &str) -> TagSet {
        match self.provider.get_bucket_tags(bucket).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(bucket, error = %e, "Could not read bucket tags");
                TagSet::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBucket, MockProvider};

    fn tagged(project: &str) -> MockBucket {
        MockBucket {
            tags: Some([("project".to_string(), project.to_string())].into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_observe_existing_bucket() {
        let provider = MockProvider::new().with_bucket("acme-main-sandbox", tagged("acme"));
        let observer = Observer::new(&provider);

        let result = observer
            .observe(&CanonicalName::from_remote("acme-main-sandbox"))
            .await;

        assert!(result.exists);
        assert_eq!(result.tags.get("project").map(String::as_str), Some("acme"));
    }

    #[tokio::test]
    async fn test_observe_missing_bucket() {
        let provider = MockProvider::new();
        let result = Observer::new(&provider)
            .observe(&CanonicalName::from_remote("acme-main-sandbox"))
            .await;

        assert_eq!(result, RemoteState::default());
        assert_eq!(provider.calls(), vec!["head_bucket"]);
    }

    #[tokio::test]
    async fn test_observe_transport_error_is_absent() {
        let provider = MockProvider::new()
            .with_bucket("acme-main-sandbox", tagged("acme"))
            .fail_on("head_bucket");

        let result = Observer::new(&provider)
            .observe(&CanonicalName::from_remote("acme-main-sandbox"))
            .await;

        assert!(!result.exists);
    }

    #[tokio::test]
    async fn test_list_all_filters_and_tolerates_tag_failures() {
        let provider = MockProvider::new()
            .with_bucket("acme-main-sandbox", tagged("acme"))
            .with_bucket("foo-sandbox", MockBucket::default())
            .with_bucket("company-assets", tagged("acme"));

        let entries = Observer::new(&provider).list_all().await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["acme-main-sandbox", "foo-sandbox"]);
        assert!(entries[1].tags.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_propagates_listing_failure() {
        let provider = MockProvider::new().fail_on("list_buckets");
        assert!(Observer::new(&provider).list_all().await.is_err());
    }
}

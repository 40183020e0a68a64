//! Storage provider trait definition

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Tag key recording which project owns a sandbox bucket
pub const PROJECT_TAG: &str = "project";

/// Document served for both the index and error routes
pub const INDEX_DOCUMENT: &str = "index.html";

/// Bucket tags, ordered by key
pub type TagSet = BTreeMap<String, String>;

/// Object-storage operations consumed by the lifecycle controller
///
/// Implementations are constructed once at startup and injected into
/// [`crate::SandboxController`]. Each call maps to a single remote request
/// (or a paginated series for listings) and is safe to re-issue.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws-s3")
    fn name(&self) -> &str;

    /// Region the provider operates in
    fn region(&self) -> &str;

    /// Host serving website buckets, without the bucket label
    /// (e.g., `s3-website.us-east-1.amazonaws.com`)
    fn website_host(&self) -> String;

    /// Metadata-only existence check
    async fn head_bucket(&self, bucket: &str) -> Result<()>;

    async fn create_bucket(&self, bucket: &str, acl: CannedAcl) -> Result<()>;

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;

    async fn put_bucket_website(&self, bucket: &str, website: &WebsiteConfig) -> Result<()>;

    async fn put_bucket_tags(&self, bucket: &str, tags: &TagSet) -> Result<()>;

    async fn delete_bucket_website(&self, bucket: &str) -> Result<()>;

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<()>;

    async fn delete_bucket_tags(&self, bucket: &str) -> Result<()>;

    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Every bucket visible to the caller
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>>;

    async fn get_bucket_tags(&self, bucket: &str) -> Result<TagSet>;

    /// One page of object keys under `prefix`
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage>;

    /// Upload a local file as `key`
    async fn put_object(&self, bucket: &str, key: &str, source: &Path, acl: CannedAcl)
    -> Result<()>;

    /// Delete a batch of keys, returning the keys the service refused
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<ObjectFailure>>;
}

/// Canned access control lists used by sandboxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    Private,
    PublicRead,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
        }
    }
}

impl std::fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static website hosting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteConfig {
    pub index_document: String,
    pub error_document: String,
}

impl WebsiteConfig {
    /// Single-page-app layout: every route falls back to `index.html`
    pub fn single_page() -> Self {
        Self {
            index_document: INDEX_DOCUMENT.to_string(),
            error_document: INDEX_DOCUMENT.to_string(),
        }
    }
}

/// Bucket entry from a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSummary {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl BucketSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: None,
        }
    }
}

/// A page of object keys
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Token for the next page, `None` on the last page
    pub next: Option<String>,
}

/// A key the service failed to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    pub key: String,
    pub message: String,
}

/// Policy granting anonymous `GetObject` on every object in `bucket`
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AddPerm",
                "Effect": "Allow",
                "Principal": { "AWS": "*" },
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{}/*", bucket),
            }
        ]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_read_policy() {
        let policy: serde_json::Value =
            serde_json::from_str(&public_read_policy("acme-main-sandbox")).unwrap();

        let statement = &policy["Statement"][0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Action"], "s3:GetObject");
        assert_eq!(statement["Principal"]["AWS"], "*");
        assert_eq!(statement["Resource"], "arn:aws:s3:::acme-main-sandbox/*");
    }

    #[test]
    fn test_single_page_website() {
        let website = WebsiteConfig::single_page();
        assert_eq!(website.index_document, "index.html");
        assert_eq!(website.error_document, "index.html");
    }

    #[test]
    fn test_canned_acl_wire_names() {
        assert_eq!(CannedAcl::PublicRead.to_string(), "public-read");
        assert_eq!(CannedAcl::Private.as_str(), "private");
    }
}

//! In-memory storage provider recording every call, for tests

use crate::error::{Result, SandboxError};
use crate::provider::{
    BucketSummary, CannedAcl, ObjectFailure, ObjectPage, StorageProvider, TagSet, WebsiteConfig,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

const READ_ONLY_OPS: [&str; 4] = ["head_bucket", "list_buckets", "get_bucket_tags", "list_objects"];

#[derive(Debug, Clone, Default)]
pub struct MockBucket {
    pub acl: Option<CannedAcl>,
    pub policy: Option<String>,
    pub website: Option<WebsiteConfig>,
    pub tags: Option<TagSet>,
    pub objects: BTreeMap<String, Vec<u8>>,
}

#[derive(Default)]
struct MockState {
    buckets: BTreeMap<String, MockBucket>,
    calls: Vec<String>,
    failing_ops: HashSet<String>,
    failing_keys: HashSet<String>,
}

pub struct MockProvider {
    state: Mutex<MockState>,
    page_size: usize,
    repeat_refusals: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            page_size: 1000,
            repeat_refusals: false,
        }
    }

    /// Report every refused delete twice, like a service echoing duplicate keys
    pub fn repeat_refusals(mut self) -> Self {
        self.repeat_refusals = true;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Seed a bucket that already exists remotely
    pub fn with_bucket(self, name: &str, bucket: MockBucket) -> Self {
        self.state
            .lock()
            .unwrap()
            .buckets
            .insert(name.to_string(), bucket);
        self
    }

    /// Make every call of `op` fail
    pub fn fail_on(self, op: &str) -> Self {
        self.state.lock().unwrap().failing_ops.insert(op.to_string());
        self
    }

    /// Make uploads or deletes of `key` fail
    pub fn fail_key(self, key: &str) -> Self {
        self.state.lock().unwrap().failing_keys.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !READ_ONLY_OPS.contains(&c.as_str()))
            .collect()
    }

    pub fn bucket(&self, name: &str) -> Option<MockBucket> {
        self.state.lock().unwrap().buckets.get(name).cloned()
    }

    fn record(&self, op: &str) -> Result<std::sync::MutexGuard<'_, MockState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op.to_string());
        if state.failing_ops.contains(op) {
            return Err(SandboxError::transport(op, "injected failure"));
        }
        Ok(state)
    }
}

fn no_such_bucket(op: &str, bucket: &str) -> SandboxError {
    SandboxError::transport(op, format!("NoSuchBucket: {}", bucket))
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn region(&self) -> &str {
        "us-test-1"
    }

    fn website_host(&self) -> String {
        "s3-website.us-test-1.example.com".to_string()
    }

    async fn head_bucket(&self, bucket: &str) -> Result<()> {
        let state = self.record("head_bucket")?;
        if state.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(no_such_bucket("head_bucket", bucket))
        }
    }

    async fn create_bucket(&self, bucket: &str, acl: CannedAcl) -> Result<()> {
        let mut state = self.record("create_bucket")?;
        state.buckets.entry(bucket.to_string()).or_default().acl = Some(acl);
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        let mut state = self.record("put_bucket_policy")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("put_bucket_policy", bucket))?;
        entry.policy = Some(policy.to_string());
        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, website: &WebsiteConfig) -> Result<()> {
        let mut state = self.record("put_bucket_website")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("put_bucket_website", bucket))?;
        entry.website = Some(website.clone());
        Ok(())
    }

    async fn put_bucket_tags(&self, bucket: &str, tags: &TagSet) -> Result<()> {
        let mut state = self.record("put_bucket_tags")?;
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("put_bucket_tags", bucket))?;
        entry.tags = Some(tags.clone());
        Ok(())
    }

    async fn delete_bucket_website(&self, bucket: &str) -> Result<()> {
        let mut state = self.record("delete_bucket_website")?;
        if let Some(entry) = state.buckets.get_mut(bucket) {
            entry.website = None;
        }
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str) -> Result<()> {
        let mut state = self.record("delete_bucket_policy")?;
        if let Some(entry) = state.buckets.get_mut(bucket) {
            entry.policy = None;
        }
        Ok(())
    }

    async fn delete_bucket_tags(&self, bucket: &str) -> Result<()> {
        let mut state = self.record("delete_bucket_tags")?;
        if let Some(entry) = state.buckets.get_mut(bucket) {
            entry.tags = None;
        }
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.record("delete_bucket")?;
        let empty = match state.buckets.get(bucket) {
            Some(entry) => entry.objects.is_empty(),
            None => return Err(no_such_bucket("delete_bucket", bucket)),
        };
        if !empty {
            return Err(SandboxError::transport("delete_bucket", "BucketNotEmpty"));
        }
        state.buckets.remove(bucket);
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        let state = self.record("list_buckets")?;
        Ok(state.buckets.keys().map(BucketSummary::new).collect())
    }

    async fn get_bucket_tags(&self, bucket: &str) -> Result<TagSet> {
        let state = self.record("get_bucket_tags")?;
        state
            .buckets
            .get(bucket)
            .and_then(|b| b.tags.clone())
            .ok_or_else(|| SandboxError::transport("get_bucket_tags", "NoSuchTagSet"))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage> {
        let state = self.record("list_objects")?;
        let entry = state
            .buckets
            .get(bucket)
            .ok_or_else(|| no_such_bucket("list_objects", bucket))?;

        // the token is the last key of the previous page, so deleting listed
        // keys between pages does not shift the window
        let mut matching = entry
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| continuation.as_ref().is_none_or(|after| *k > after));
        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next = match matching.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };

        Ok(ObjectPage { keys, next })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        _acl: CannedAcl,
    ) -> Result<()> {
        let body = tokio::fs::read(source).await?;
        let mut state = self.record("put_object")?;
        if state.failing_keys.contains(key) {
            return Err(SandboxError::transport("put_object", format!("rejected {}", key)));
        }
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("put_object", bucket))?;
        entry.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<ObjectFailure>> {
        let mut state = self.record("delete_objects")?;
        let failing = state.failing_keys.clone();
        let entry = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| no_such_bucket("delete_objects", bucket))?;

        let mut failures = Vec::new();
        for key in keys {
            if failing.contains(key) {
                let failure = ObjectFailure {
                    key: key.clone(),
                    message: "AccessDenied".to_string(),
                };
                if self.repeat_refusals {
                    failures.push(failure.clone());
                }
                failures.push(failure);
            } else {
                entry.objects.remove(key);
            }
        }
        Ok(failures)
    }
}

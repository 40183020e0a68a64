//! Sandbox lifecycle controller
//!
//! A sandbox is either absent or active. `create` moves it to active with
//! four setup calls, `deploy` replaces its contents, `remove` empties it and
//! runs the teardown calls. None of the multi-step sequences are
//! transactional; every individual call is safe to re-issue, so re-running
//! a command repairs a sequence that stopped halfway.

use crate::action::{Step, StepReport};
use crate::error::{Result, SandboxError};
use crate::naming::CanonicalName;
use crate::observe::{Observer, RemoteState, SandboxEntry};
use crate::provider::{
    CannedAcl, PROJECT_TAG, StorageProvider, TagSet, WebsiteConfig, public_read_policy,
};
use crate::transfer::{ProgressSink, SyncDirection, TransferEngine, TransferOptions, TransferSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Group used for sandboxes without a `project` tag
pub const UNKNOWN_GROUP: &str = "unknown";

/// A project/branch pair and the bucket it maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxTarget {
    /// Project name as declared, recorded in the `project` tag
    pub project: String,
    pub branch: String,
    pub name: CanonicalName,
}

impl SandboxTarget {
    pub fn resolve(project: impl Into<String>, branch: impl Into<String>) -> Result<Self> {
        let project = project.into();
        let branch = branch.into();
        let name = CanonicalName::resolve(&project, &branch)?;
        Ok(Self {
            project,
            branch,
            name,
        })
    }
}

/// Result of `create`
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// Setup calls were issued
    Created(StepReport),
    /// The sandbox was already active; nothing was changed
    AlreadyActive,
}

/// How `info` treats an absent sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoMode {
    /// Absent is an error
    Interactive,
    /// Absent is reported in the result
    Automation,
}

/// Result of `info`
#[derive(Debug, Clone, Serialize)]
pub struct SandboxInfo {
    pub branch: String,
    pub bucket: CanonicalName,
    pub region: String,
    pub exists: bool,
    pub url: String,
    pub tags: TagSet,
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxListing {
    pub branch: String,
    pub bucket: CanonicalName,
    pub created_at: Option<DateTime<Utc>>,
}

/// Sandboxes grouped by owning project
pub type SandboxGroups = BTreeMap<String, Vec<SandboxListing>>;

/// Drives sandboxes through their lifecycle against an injected provider
pub struct SandboxController<P: StorageProvider> {
    provider: P,
    transfer: TransferOptions,
}

impl<P: StorageProvider> SandboxController<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            transfer: TransferOptions::default(),
        }
    }

    pub fn with_transfer_options(mut self, options: TransferOptions) -> Self {
        self.transfer = options;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Public website URL for `name`, scoped under `prefix`
    pub fn url(&self, name: &CanonicalName, prefix: &str) -> String {
        format!(
            "http://{}.{}/{}",
            name,
            self.provider.website_host(),
            prefix.trim_start_matches('/')
        )
    }

    pub async fn observe(&self, name: &CanonicalName) -> RemoteState {
        Observer::new(&self.provider).observe(name).await
    }

    /// Make the sandbox active
    ///
    /// A bucket that exists but lacks the project tag was left behind by an
    /// interrupted `create`; the remaining setup calls are replayed on it.
    pub async fn create(&self, target: &SandboxTarget) -> Result<CreateOutcome> {
        let state = self.observe(&target.name).await;
        if state.exists && state.tags.contains_key(PROJECT_TAG) {
            debug!(bucket = %target.name, "Sandbox already active");
            return Ok(CreateOutcome::AlreadyActive);
        }

        let bucket = target.name.as_str();
        let mut report = StepReport::new();
        let start = Instant::now();

        if !state.exists {
            info!(bucket, step = %Step::CreateBucket, "Creating sandbox");
            self.provider
                .create_bucket(bucket, CannedAcl::PublicRead)
                .await?;
            report.add_success(Step::CreateBucket);
        }

        info!(bucket, step = %Step::PutPolicy, "Creating sandbox");
        self.provider
            .put_bucket_policy(bucket, &public_read_policy(bucket))
            .await?;
        report.add_success(Step::PutPolicy);

        info!(bucket, step = %Step::PutWebsite, "Creating sandbox");
        self.provider
            .put_bucket_website(bucket, &WebsiteConfig::single_page())
            .await?;
        report.add_success(Step::PutWebsite);

        info!(bucket, step = %Step::PutTags, "Creating sandbox");
        let tags = TagSet::from([(PROJECT_TAG.to_string(), target.project.clone())]);
        self.provider.put_bucket_tags(bucket, &tags).await?;
        report.add_success(Step::PutTags);

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(CreateOutcome::Created(report))
    }

    /// Upload `src_dir` into the sandbox under `prefix`
    pub async fn deploy(
        &self,
        target: &SandboxTarget,
        src_dir: Option<&Path>,
        prefix: &str,
        sink: &dyn ProgressSink,
    ) -> Result<TransferSummary> {
        if !self.observe(&target.name).await.exists {
            return Err(SandboxError::NotFound(target.name.to_string()));
        }

        let src_dir = src_dir.ok_or_else(|| SandboxError::MissingLocalInput(Default::default()))?;
        match tokio::fs::metadata(src_dir).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(SandboxError::MissingLocalInput(src_dir.to_path_buf())),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                return Err(SandboxError::MissingLocalInput(src_dir.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        TransferEngine::new(&self.provider)
            .with_options(self.transfer.clone())
            .sync(
                &SyncDirection::Upload(src_dir.to_path_buf()),
                target.name.as_str(),
                prefix,
                sink,
            )
            .await
    }

    /// Empty the sandbox, then tear down its configuration and the bucket
    ///
    /// A failure while emptying stops before any teardown call. After that,
    /// every teardown call is attempted; failures are collected and reported
    /// together as [`SandboxError::PartialTeardown`].
    pub async fn remove(&self, target: &SandboxTarget, sink: &dyn ProgressSink) -> Result<StepReport> {
        if !self.observe(&target.name).await.exists {
            return Err(SandboxError::NotFound(target.name.to_string()));
        }

        let bucket = target.name.as_str();
        let start = Instant::now();
        let mut report = StepReport::new();

        TransferEngine::new(&self.provider)
            .with_options(self.transfer.clone())
            .sync(&SyncDirection::DeleteAll, bucket, "", sink)
            .await?;
        report.add_success(Step::EmptyBucket);

        info!(bucket, "Removing sandbox configuration");
        let result = self.provider.delete_bucket_website(bucket).await;
        record_teardown(&mut report, bucket, Step::DeleteWebsite, result);
        let result = self.provider.delete_bucket_policy(bucket).await;
        record_teardown(&mut report, bucket, Step::DeletePolicy, result);
        let result = self.provider.delete_bucket_tags(bucket).await;
        record_teardown(&mut report, bucket, Step::DeleteTags, result);
        let result = self.provider.delete_bucket(bucket).await;
        record_teardown(&mut report, bucket, Step::DeleteBucket, result);

        report.duration_ms = start.elapsed().as_millis() as u64;
        if report.is_success() {
            Ok(report)
        } else {
            Err(SandboxError::PartialTeardown {
                name: target.name.to_string(),
                failed: report.failed,
            })
        }
    }

    /// Describe the sandbox for `target`
    pub async fn info(
        &self,
        target: &SandboxTarget,
        prefix: &str,
        mode: InfoMode,
    ) -> Result<SandboxInfo> {
        let state = self.observe(&target.name).await;
        if !state.exists && mode == InfoMode::Interactive {
            return Err(SandboxError::NotFound(target.name.to_string()));
        }

        Ok(SandboxInfo {
            branch: target.branch.clone(),
            bucket: target.name.clone(),
            region: self.provider.region().to_string(),
            exists: state.exists,
            url: self.url(&target.name, prefix),
            tags: state.tags,
        })
    }

    /// Every sandbox, grouped by the `project` tag
    pub async fn list(&self) -> Result<SandboxGroups> {
        let entries = Observer::new(&self.provider).list_all().await?;
        Ok(group_by_project(entries))
    }
}

fn record_teardown(report: &mut StepReport, bucket: &str, step: Step, result: Result<()>) {
    match result {
        Ok(()) => report.add_success(step),
        Err(e) => {
            warn!(bucket, %step, error = %e, "Teardown step failed");
            report.add_failure(step, e);
        }
    }
}

/// Group sandboxes by their `project` tag and recover branch labels
pub fn group_by_project(entries: Vec<SandboxEntry>) -> SandboxGroups {
    let mut groups = SandboxGroups::new();
    for entry in entries {
        let group = entry
            .tags
            .get(PROJECT_TAG)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        let branch = entry.name.branch_label(&group);
        groups.entry(group).or_default().push(SandboxListing {
            branch,
            bucket: entry.name,
            created_at: entry.created_at,
        });
    }
    for listings in groups.values_mut() {
        listings.sort_by(|a, b| a.branch.cmp(&b.branch));
    }
    groups
}

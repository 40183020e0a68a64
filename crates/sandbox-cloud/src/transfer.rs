//! Bulk transfer between a local directory tree and a bucket
//!
//! Uploads and deletions run with bounded concurrency, but every event is
//! emitted from the single loop draining the in-flight transfers, so sinks
//! observe events in order. Each call to [`TransferEngine::sync`] emits
//! exactly one terminal event.
//!
//! Enumeration is lazy: the directory walk and the object listing advance as
//! transfers complete, so `total` grows while a job runs and must be read as
//! a live estimate.

use crate::error::{Result, SandboxError};
use crate::provider::{CannedAcl, ObjectFailure, StorageProvider};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Default number of objects in flight at once
pub const DEFAULT_TRANSFER_CONCURRENCY: usize = 10;

/// Maximum keys accepted by a single batch delete request
pub const MAX_DELETE_BATCH: usize = 1000;

/// What a sync moves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDirection {
    /// Put every file under the directory as an object
    Upload(PathBuf),
    /// Delete every object under the prefix
    DeleteAll,
}

/// Event observed by a [`ProgressSink`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    Progress { completed: u64, total: u64 },
    ObjectFailed { key: String, message: String },
    /// Terminal: every object transferred
    Finished(TransferSummary),
    /// Terminal: at least one object failed, or enumeration itself failed
    Failed {
        first_error: String,
        summary: TransferSummary,
    },
}

impl TransferEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferEvent::Finished(_) | TransferEvent::Failed { .. })
    }
}

/// Totals for a finished job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferSummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub duration_ms: u64,
}

/// Receiver of transfer events
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &TransferEvent);
}

/// A sink that discards every event
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn on_event(&self, _event: &TransferEvent) {}
}

/// A sink wrapping a closure
pub struct FnSink<F> {
    callback: F,
}

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(&TransferEvent) + Send + Sync,
{
    fn on_event(&self, event: &TransferEvent) {
        (self.callback)(event)
    }
}

/// Create a progress sink from a closure
pub fn sink_fn<F>(callback: F) -> FnSink<F>
where
    F: Fn(&TransferEvent) + Send + Sync,
{
    FnSink { callback }
}

/// Options for transfer operations
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Maximum objects (or delete batches) in flight
    pub max_concurrency: usize,
    /// Keys per batch delete request
    pub delete_batch_size: usize,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_TRANSFER_CONCURRENCY,
            delete_batch_size: MAX_DELETE_BATCH,
        }
    }
}

impl TransferOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size.clamp(1, MAX_DELETE_BATCH);
        self
    }
}

/// Counters for one sync call; dropped when the terminal event fires
struct TransferJob<'s> {
    sink: &'s dyn ProgressSink,
    total: AtomicU64,
    completed: AtomicU64,
    failures: Mutex<Vec<ObjectFailure>>,
    started: Instant,
}

impl<'s> TransferJob<'s> {
    fn new(sink: &'s dyn ProgressSink) -> Self {
        Self {
            sink,
            total: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failures: Mutex::new(Vec::new()),
            started: Instant::now(),
        }
    }

    fn discovered(&self, count: u64) {
        self.total.fetch_add(count, Ordering::SeqCst);
    }

    fn succeeded(&self, count: u64) {
        self.completed.fetch_add(count, Ordering::SeqCst);
        self.report_progress();
    }

    fn failed(&self, failure: ObjectFailure) {
        warn!(key = %failure.key, error = %failure.message, "Object transfer failed");
        self.sink.on_event(&TransferEvent::ObjectFailed {
            key: failure.key.clone(),
            message: failure.message.clone(),
        });
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(failure);
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.report_progress();
    }

    fn report_progress(&self) {
        self.sink.on_event(&TransferEvent::Progress {
            completed: self.completed.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        });
    }

    /// Emit the single terminal event and convert it into the call's result
    fn finish(self, fatal: Option<SandboxError>) -> Result<TransferSummary> {
        let failures = self.failures.into_inner().unwrap_or_default();
        let total = self.total.load(Ordering::SeqCst);
        let completed = self.completed.load(Ordering::SeqCst);
        let summary = TransferSummary {
            total,
            succeeded: completed.saturating_sub(failures.len() as u64),
            failed: failures.len() as u64,
            duration_ms: self.started.elapsed().as_millis() as u64,
        };

        if let Some(err) = fatal {
            self.sink.on_event(&TransferEvent::Failed {
                first_error: err.to_string(),
                summary,
            });
            return Err(err);
        }

        if let Some(first) = failures.first() {
            let first_error = format!("{}: {}", first.key, first.message);
            self.sink.on_event(&TransferEvent::Failed {
                first_error: first_error.clone(),
                summary: summary.clone(),
            });
            return Err(SandboxError::TransferFailed {
                failed: summary.failed,
                total: summary.total,
                first_error,
            });
        }

        info!(
            total = summary.total,
            duration_ms = summary.duration_ms,
            "Transfer finished"
        );
        self.sink.on_event(&TransferEvent::Finished(summary.clone()));
        Ok(summary)
    }
}

/// Synchronizes a directory tree with a bucket's object namespace
pub struct TransferEngine<'a, P: StorageProvider> {
    provider: &'a P,
    options: TransferOptions,
}

impl<'a, P: StorageProvider> TransferEngine<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            options: TransferOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one upload or delete-all job against `bucket` under `prefix`
    pub async fn sync(
        &self,
        direction: &SyncDirection,
        bucket: &str,
        prefix: &str,
        sink: &dyn ProgressSink,
    ) -> Result<TransferSummary> {
        let job = TransferJob::new(sink);
        let outcome = match direction {
            SyncDirection::Upload(local_dir) => {
                self.upload_dir(&job, local_dir, bucket, prefix).await
            }
            SyncDirection::DeleteAll => self.delete_all(&job, bucket, prefix).await,
        };
        job.finish(outcome.err())
    }

    async fn upload_dir(
        &self,
        job: &TransferJob<'_>,
        local_dir: &Path,
        bucket: &str,
        prefix: &str,
    ) -> Result<()> {
        info!(bucket, prefix, dir = %local_dir.display(), "Uploading directory");
        let provider = self.provider;

        let files = WalkDir::new(local_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            });

        let uploads = stream::iter(files)
            .map(|entry| {
                job.discovered(1);
                async move {
                    let path = match entry {
                        Ok(path) => path,
                        Err(e) => {
                            let key = e
                                .path()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default();
                            return (key, Err(SandboxError::transport("walk", e)));
                        }
                    };
                    let key = object_key(prefix, local_dir, &path);
                    debug!(key, "Uploading object");
                    let result = provider
                        .put_object(bucket, &key, &path, CannedAcl::PublicRead)
                        .await;
                    (key, result)
                }
            })
            .buffer_unordered(self.options.max_concurrency);
        let mut uploads = std::pin::pin!(uploads);

        while let Some((key, result)) = uploads.next().await {
            match result {
                Ok(()) => job.succeeded(1),
                Err(e) => job.failed(ObjectFailure {
                    key,
                    message: e.to_string(),
                }),
            }
        }
        Ok(())
    }

    async fn delete_all(&self, job: &TransferJob<'_>, bucket: &str, prefix: &str) -> Result<()> {
        info!(bucket, prefix, "Deleting all objects");
        let mut continuation = None;

        loop {
            let page = self
                .provider
                .list_objects(bucket, prefix, continuation.take())
                .await?;
            job.discovered(page.keys.len() as u64);

            let deletes = stream::iter(page.keys.chunks(self.options.delete_batch_size))
                .map(|batch| async move {
                    debug!(count = batch.len(), "Deleting object batch");
                    (batch, self.provider.delete_objects(bucket, batch).await)
                })
                .buffer_unordered(self.options.max_concurrency);
            let mut deletes = std::pin::pin!(deletes);

            while let Some((batch, result)) = deletes.next().await {
                match result {
                    Ok(failures) => {
                        let refused = failures.len() as u64;
                        job.succeeded((batch.len() as u64).saturating_sub(refused));
                        for failure in failures {
                            job.failed(failure);
                        }
                    }
                    Err(e) => {
                        let message = e.to_string();
                        for key in batch {
                            job.failed(ObjectFailure {
                                key: key.clone(),
                                message: message.clone(),
                            });
                        }
                    }
                }
            }

            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(())
    }
}

/// Object key for `path` uploaded from `root` under `prefix`
pub fn object_key(prefix: &str, root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let prefix = prefix.trim_start_matches('/');
    if prefix.is_empty() {
        relative
    } else if prefix.ends_with('/') {
        format!("{}{}", prefix, relative)
    } else {
        format!("{}/{}", prefix, relative)
    }
}

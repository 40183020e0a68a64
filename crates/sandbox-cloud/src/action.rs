//! Discrete remote mutations and their results

use serde::{Deserialize, Serialize};

/// A single remote mutation performed while creating or removing a sandbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create the bucket with a public-read ACL
    CreateBucket,
    /// Attach the anonymous GetObject policy
    PutPolicy,
    /// Enable static website hosting
    PutWebsite,
    /// Record the owning project as a tag
    PutTags,
    /// Delete every object in the bucket
    EmptyBucket,
    DeleteWebsite,
    DeletePolicy,
    DeleteTags,
    DeleteBucket,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::CreateBucket => write!(f, "create bucket"),
            Step::PutPolicy => write!(f, "put policy"),
            Step::PutWebsite => write!(f, "put website config"),
            Step::PutTags => write!(f, "put tags"),
            Step::EmptyBucket => write!(f, "empty bucket"),
            Step::DeleteWebsite => write!(f, "delete website config"),
            Step::DeletePolicy => write!(f, "delete policy"),
            Step::DeleteTags => write!(f, "delete tags"),
            Step::DeleteBucket => write!(f, "delete bucket"),
        }
    }
}

/// Result of running a sequence of steps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepReport {
    /// Steps that completed, in execution order
    pub succeeded: Vec<Step>,

    /// Steps that failed with their error message
    pub failed: Vec<(Step, String)>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl StepReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, step: Step) {
        self.succeeded.push(step);
    }

    pub fn add_failure(&mut self, step: Step, error: impl ToString) {
        self.failed.push((step, error.to_string()));
    }
}

//! Canonical sandbox naming
//!
//! A sandbox bucket is named `<project>-<branch>-sandbox`, where both segments
//! are slugged. S3 limits bucket names to 63 characters, so long branch names
//! are cut positionally. Two branches sharing a long common prefix can map to
//! the same bucket; truncation never hashes.

use crate::error::{Result, SandboxError};
use serde::{Deserialize, Serialize};

/// Maximum length of a bucket name
pub const MAX_NAME_LEN: usize = 63;

/// Trailing segment shared by every sandbox bucket
pub const SANDBOX_SUFFIX: &str = "sandbox";

/// Characters kept in reserve when the branch segment is cut
const TRUNCATION_MARGIN: usize = 3;

/// Normalize an arbitrary string into `[a-z0-9-]`
///
/// Runs of any other character (including `.`, `/` and non-ASCII letters)
/// collapse into a single `-`, and the result never starts or ends with `-`.
/// Accented letters are not transliterated: `café` becomes `caf`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Deterministic, length-bounded bucket name for a project/branch pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalName(String);

impl CanonicalName {
    /// Derive the name for `project` and `branch`
    pub fn resolve(project: &str, branch: &str) -> Result<Self> {
        let project = slugify(project);
        if project.is_empty() {
            return Err(SandboxError::InvalidConfig(
                "project name has no usable characters".to_string(),
            ));
        }
        let branch = slugify(branch);

        let joined = join(&project, &branch);
        if joined.len() <= MAX_NAME_LEN {
            return Ok(Self(joined));
        }

        // two separators around the branch segment
        let branch_budget = MAX_NAME_LEN.saturating_sub(project.len() + SANDBOX_SUFFIX.len() + 2);
        let keep = branch_budget.saturating_sub(TRUNCATION_MARGIN);
        let short_branch = branch[..keep.min(branch.len())].trim_end_matches('-');

        if !short_branch.is_empty() {
            return Ok(Self(join(&project, short_branch)));
        }

        let project_budget = MAX_NAME_LEN - SANDBOX_SUFFIX.len() - 1;
        let short_project = project[..project_budget.min(project.len())].trim_end_matches('-');
        Ok(Self(join(short_project, "")))
    }

    /// Wrap a name reported by the remote service
    pub fn from_remote(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether this looks like a bucket managed by this tool
    pub fn is_sandbox(&self) -> bool {
        self.0.contains(SANDBOX_SUFFIX)
    }

    /// Recover the human branch label for a bucket owned by `project`
    ///
    /// Removes the trailing `-sandbox`, then the leading `<slug(project)>-`.
    pub fn branch_label(&self, project: &str) -> String {
        let suffix = format!("-{}", SANDBOX_SUFFIX);
        let prefix = format!("{}-", slugify(project));
        let label = self.0.strip_suffix(&suffix).unwrap_or(&self.0);
        label.strip_prefix(&prefix).unwrap_or(label).to_string()
    }
}

impl std::fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn join(project: &str, branch: &str) -> String {
    [project, branch, SANDBOX_SUFFIX]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

//! Current branch detection
//!
//! Reads `HEAD` straight from the repository metadata instead of shelling out
//! to git, so detection works without git installed.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const GIT_MARKER: &str = ".git";
const HEAD_REF_PREFIX: &str = "ref: refs/heads/";
const GITDIR_PREFIX: &str = "gitdir:";

/// Name of the branch checked out in the repository containing `start`
///
/// Returns `None` outside a repository, on a detached HEAD, or when the
/// metadata cannot be read.
pub fn current_branch(start: &Path) -> Option<String> {
    let git_dir = find_git_dir(start)?;
    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let branch = parse_head(&head);
    debug!(git_dir = %git_dir.display(), ?branch, "Read HEAD");
    branch
}

/// Locate the git directory for `start`, walking up through parents
///
/// A `.git` file (worktrees, submodules) is followed to the directory named
/// by its `gitdir:` line.
pub fn find_git_dir(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let marker = dir.join(GIT_MARKER);
        if marker.is_dir() {
            return Some(marker);
        }
        if marker.is_file() {
            let contents = fs::read_to_string(&marker).ok()?;
            let target = contents
                .lines()
                .find_map(|line| line.strip_prefix(GITDIR_PREFIX))?
                .trim();
            return Some(dir.join(target));
        }
    }
    None
}

/// Branch name from the contents of a `HEAD` file
pub fn parse_head(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.trim_end().strip_prefix(HEAD_REF_PREFIX))
        .filter(|branch| !branch.is_empty())
        .map(str::to_string)
}

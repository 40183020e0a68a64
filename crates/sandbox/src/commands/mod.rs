pub mod create;
pub mod deploy;
pub mod info;
pub mod ls;
pub mod remove;

use std::path::PathBuf;

use colored::Colorize;
use sandbox_cloud::{SandboxController, SandboxTarget};
use sandbox_cloud_aws::S3Provider;
use sandbox_config::Project;
use tracing::debug;

/// Settings shared by every command
pub struct Context {
    pub dir: PathBuf,
    pub region: Option<String>,
}

impl Context {
    /// Load the project, with `project`/`branch` arguments taking precedence
    pub fn project(
        &self,
        project: Option<String>,
        branch: Option<String>,
    ) -> anyhow::Result<Project> {
        let project = Project::load(&self.dir, project, branch)?;
        debug!(name = %project.name, branch = %project.branch, "Project loaded");
        Ok(project)
    }

    pub fn target(&self, project: &Project) -> anyhow::Result<SandboxTarget> {
        Ok(SandboxTarget::resolve(&project.name, &project.branch)?)
    }

    pub async fn controller(&self) -> SandboxController<S3Provider> {
        SandboxController::new(S3Provider::from_env(self.region.clone()).await)
    }
}

/// Print an aligned `Label: value` line
pub fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<8} {}", format!("{}:", label).bold(), value);
}

use super::{Context, print_field};
use crate::progress::Spinner;
use colored::Colorize;
use sandbox_cloud::{InfoMode, PROJECT_TAG, SandboxInfo};
use serde::Serialize;

/// `info --json` output
#[derive(Debug, Serialize)]
struct InfoReport<'a> {
    branch: &'a str,
    bucket: &'a str,
    exists: bool,
    has_src_dir: bool,
    prefix: &'a str,
    region: &'a str,
    url: &'a str,
}

pub async fn handle(
    ctx: &Context,
    project: Option<String>,
    branch: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let project = ctx.project(project, branch)?;
    let target = ctx.target(&project)?;
    let controller = ctx.controller().await;
    let prefix = project.settings.prefix();

    if json {
        let info = controller
            .info(&target, prefix, InfoMode::Automation)
            .await?;
        let has_src_dir = match project.src_dir() {
            Some(dir) => tokio::fs::metadata(&dir)
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false),
            None => false,
        };
        println!("{}", render_json(&info, prefix, has_src_dir)?);
        return Ok(());
    }

    let spinner = Spinner::new(format!("Looking up sandbox {}...", target.name));
    let info = controller.info(&target, prefix, InfoMode::Interactive).await;
    spinner.clear();
    let info = info?;

    for (label, value) in fields(&info) {
        print_field(label, value.cyan());
    }
    Ok(())
}

/// Labelled lines of the interactive output
fn fields(info: &SandboxInfo) -> Vec<(&'static str, &str)> {
    let mut fields = Vec::with_capacity(5);
    if let Some(owner) = info.tags.get(PROJECT_TAG) {
        fields.push(("Project", owner.as_str()));
    }
    fields.push(("Branch", info.branch.as_str()));
    fields.push(("Bucket", info.bucket.as_str()));
    fields.push(("Region", info.region.as_str()));
    fields.push(("URL", info.url.as_str()));
    fields
}

fn render_json(info: &SandboxInfo, prefix: &str, has_src_dir: bool) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&InfoReport {
        branch: &info.branch,
        bucket: info.bucket.as_str(),
        exists: info.exists,
        has_src_dir,
        prefix,
        region: &info.region,
        url: &info.url,
    })
}

use super::{Context, print_field};
use crate::progress::TransferProgress;
use colored::Colorize;

pub async fn handle(
    ctx: &Context,
    src_dir: Option<String>,
    prefix: Option<String>,
) -> anyhow::Result<()> {
    let mut project = ctx.project(None, None)?;
    project.settings = project.settings.with_overrides(src_dir, prefix);
    let target = ctx.target(&project)?;
    let controller = ctx.controller().await;

    let src_dir = project.src_dir();
    let prefix = project.settings.prefix();

    println!(
        "{}",
        format!("Deploying {} to sandbox {}", project.name, target.name).blue()
    );
    if let Some(dir) = &src_dir {
        print_field("Source", dir.display());
    }

    let progress = TransferProgress::new("Uploaded");
    let result = controller
        .deploy(&target, src_dir.as_deref(), prefix, &progress)
        .await;
    progress.clear_unfinished();
    let summary = result?;

    println!();
    println!(
        "{}",
        format!(
            "✓ Deployed {} objects in {} ms",
            summary.succeeded, summary.duration_ms
        )
        .green()
    );
    print_field("URL", controller.url(&target.name, prefix).cyan().underline());
    Ok(())
}

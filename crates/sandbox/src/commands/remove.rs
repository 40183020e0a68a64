use super::{Context, print_field};
use crate::progress::TransferProgress;
use colored::Colorize;
use sandbox_cloud::SandboxError;

pub async fn handle(
    ctx: &Context,
    project: Option<String>,
    branch: Option<String>,
) -> anyhow::Result<()> {
    let project = ctx.project(project, branch)?;
    let target = ctx.target(&project)?;
    let controller = ctx.controller().await;

    println!(
        "{}",
        format!("Removing sandbox {}", target.name).yellow()
    );
    print_field("Branch", target.branch.cyan());

    let progress = TransferProgress::new("Deleted");
    let result = controller.remove(&target, &progress).await;
    progress.clear_unfinished();

    match result {
        Ok(report) => {
            for step in &report.succeeded {
                println!("  {} {}", "✓".green(), step);
            }
            println!();
            println!(
                "{}",
                format!("✓ Sandbox {} removed ({} ms)", target.name, report.duration_ms).green()
            );
            Ok(())
        }
        Err(e) => {
            if let SandboxError::PartialTeardown { failed, .. } = &e {
                for (step, message) in failed {
                    println!("  {} {}: {}", "✗".red(), step, message);
                }
            }
            Err(e.into())
        }
    }
}

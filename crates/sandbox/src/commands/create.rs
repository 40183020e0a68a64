use super::{Context, print_field};
use crate::progress::Spinner;
use colored::Colorize;
use sandbox_cloud::CreateOutcome;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    let project = ctx.project(None, None)?;
    let target = ctx.target(&project)?;
    let controller = ctx.controller().await;

    let spinner = Spinner::new(format!("Creating sandbox {}...", target.name));
    match controller.create(&target).await {
        Ok(CreateOutcome::AlreadyActive) => {
            spinner.finish_success(&format!("Sandbox {} already exists", target.name));
        }
        Ok(CreateOutcome::Created(report)) => {
            spinner.finish_success(&format!(
                "Sandbox {} created ({} ms)",
                target.name, report.duration_ms
            ));
            for step in &report.succeeded {
                println!("  {} {}", "✓".green(), step);
            }
        }
        Err(e) => {
            spinner.finish_error("Sandbox creation failed");
            return Err(e.into());
        }
    }

    let url = controller.url(&target.name, project.settings.prefix());
    println!();
    print_field("Branch", target.branch.cyan());
    print_field("Bucket", target.name.as_str().cyan());
    print_field("URL", url.cyan().underline());
    Ok(())
}

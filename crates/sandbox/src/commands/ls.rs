use super::Context;
use crate::progress::Spinner;
use colored::Colorize;
use sandbox_cloud::SandboxListing;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    let controller = ctx.controller().await;

    let spinner = Spinner::new("Listing sandboxes...");
    let groups = match controller.list().await {
        Ok(groups) => {
            spinner.clear();
            groups
        }
        Err(e) => {
            spinner.finish_error("Could not list sandboxes");
            return Err(e.into());
        }
    };

    if groups.is_empty() {
        println!("{}", "No sandboxes found".yellow());
        return Ok(());
    }

    for (project, listings) in &groups {
        println!("{} ({})", project.bold(), listings.len());
        for listing in listings {
            println!("  • {}", format_listing(listing));
        }
    }
    Ok(())
}

fn format_listing(listing: &SandboxListing) -> String {
    let branch = if listing.branch.is_empty() {
        "-"
    } else {
        listing.branch.as_str()
    };
    let created = listing
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    format!(
        "{} {} {}",
        format!("{:<32}", branch).cyan(),
        listing.bucket.as_str().dimmed(),
        created.dimmed()
    )
    .trim_end()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sandbox_cloud::CanonicalName;

    #[test]
    fn test_format_listing() {
        colored::control::set_override(false);
        let listing = SandboxListing {
            branch: "feature-login".to_string(),
            bucket: CanonicalName::resolve("acme", "feature/login").unwrap(),
            created_at: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).single(),
        };

        let line = format_listing(&listing);

        assert!(line.starts_with("feature-login "));
        assert!(line.contains("acme-feature-login-sandbox"));
        assert!(line.ends_with("2024-05-01 09:30"));
    }

    #[test]
    fn test_format_listing_without_branch_or_date() {
        colored::control::set_override(false);
        let listing = SandboxListing {
            branch: String::new(),
            bucket: CanonicalName::resolve("acme", "").unwrap(),
            created_at: None,
        };

        let line = format_listing(&listing);

        assert!(line.starts_with("- "));
        assert!(line.ends_with("acme-sandbox"));
    }
}

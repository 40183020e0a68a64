mod commands;
mod progress;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use commands::Context;
use sandbox_cloud::SandboxError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Directives applied by `--verbose`
const VERBOSE_FILTER: &str =
    "warn,sandbox=debug,sandbox_cloud=debug,sandbox_cloud_aws=debug,sandbox_config=debug";

#[derive(Parser)]
#[command(name = "sandbox")]
#[command(about = "Per-branch static website sandboxes on S3", long_about = None)]
#[command(version, disable_version_flag = true)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Project directory containing package.json
    #[arg(
        short = 'C',
        long = "dir",
        env = "SANDBOX_DIR",
        default_value = ".",
        global = true
    )]
    dir: PathBuf,

    /// Storage region (defaults to the AWS profile's region)
    #[arg(long, env = "AWS_REGION", global = true)]
    region: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sandbox for the current branch
    Create,
    /// Upload the built app to the sandbox
    Deploy {
        /// Directory to upload, relative to the project directory
        #[arg(long, env = "SANDBOX_SRC_DIR")]
        src_dir: Option<String>,
        /// Key prefix for uploaded objects
        #[arg(long, env = "SANDBOX_PREFIX")]
        prefix: Option<String>,
    },
    /// Empty and delete a sandbox
    Remove {
        /// Project name (defaults to package.json)
        project: Option<String>,
        /// Branch name (defaults to the checked-out branch)
        branch: Option<String>,
    },
    /// List every sandbox grouped by project
    Ls,
    /// Show the sandbox for a branch
    Info {
        /// Project name (defaults to package.json)
        project: Option<String>,
        /// Branch name (defaults to the checked-out branch)
        branch: Option<String>,
        /// Print JSON and succeed even when the sandbox does not exist
        #[arg(long, env = "CI", value_parser = FalseyValueParser::new())]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// One-line error for the terminal
///
/// Validation failures (missing sandbox, missing build output) are printed
/// without the `Error:` prefix.
fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SandboxError>() {
        Some(e) if e.is_validation() => e.to_string().yellow().bold().to_string(),
        _ => format!("Error: {:#}", err).red().bold().to_string(),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context {
        dir: cli.dir,
        region: cli.region,
    };

    match cli.command {
        Commands::Create => commands::create::handle(&ctx).await,
        Commands::Deploy { src_dir, prefix } => {
            commands::deploy::handle(&ctx, src_dir, prefix).await
        }
        Commands::Remove { project, branch } => {
            commands::remove::handle(&ctx, project, branch).await
        }
        Commands::Ls => commands::ls::handle(&ctx).await,
        Commands::Info {
            project,
            branch,
            json,
        } => commands::info::handle(&ctx, project, branch, json).await,
    }
}

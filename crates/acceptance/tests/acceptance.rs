//! Acceptance harness entry point
//!
//! This file is the test binary that runs the YAML scenarios against the
//! deployed services.
//! Run with: cargo test --package platform-acceptance --test acceptance

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use platform_acceptance::config::{AdminProvisioning, HarnessConfig, LogSettle};
use platform_acceptance::{HarnessResult, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "platform-acceptance")]
#[command(about = "Acceptance test runner for the platform services")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to scenario directory
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Auth service base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Auth service base path
    #[arg(long)]
    base_path: Option<String>,

    /// How the admin account is provided (pre-seeded, lazy-register)
    #[arg(long)]
    admin_provisioning: Option<AdminProvisioning>,

    /// Poll the log backend instead of sleeping before log checks
    #[arg(long)]
    poll_logs: bool,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(success) => {
            if success {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> HarnessResult<bool> {
    let mut config = HarnessConfig::load(args.config.as_deref())?;

    if let Some(dir) = args.scenarios {
        config.scenarios_dir = dir;
    } else if args.config.is_none() {
        config.scenarios_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    }
    if let Some(url) = args.base_url {
        config.endpoints.auth = url;
    }
    if let Some(path) = args.base_path {
        config.endpoints.auth_base_path = path;
    }
    if let Some(mode) = args.admin_provisioning {
        config.admin_provisioning = mode;
    }
    if args.poll_logs {
        config.log_settle = LogSettle::poll_default();
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let runner = TestRunner::with_config(config)?;

    let results = if let Some(name) = args.name {
        runner.run_test(&name).await?
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    runner.write_results(&results)?;

    Ok(results.success())
}

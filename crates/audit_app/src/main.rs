mod app;
mod commands;
mod config;
mod effects;
mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use audit_logging::{audit_error, audit_warn, LogDestination};
use clap::Parser;

use crate::app::RunOptions;

const LOG_FILENAME: &str = "audit_client.log";

/// Submit websites to the audit service and save the CSV reports.
#[derive(Parser, Debug)]
#[command(name = "audit_app")]
struct Cli {
    /// Website to audit
    url: Option<String>,

    /// Config file (RON)
    #[arg(long, default_value = config::CONFIG_FILENAME)]
    config: PathBuf,

    /// Audit API root (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Where saved CSV files go (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Keep completed results as a download offer instead of saving them right away
    #[arg(long, default_value_t = false)]
    no_auto_download: bool,

    /// Read commands from stdin
    #[arg(short, long, default_value_t = false)]
    interactive: bool,

    /// Also write logs to audit_client.log
    #[arg(long, default_value_t = false)]
    log_file: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = config::load_config(&cli.config);
    let mut app_config = loaded.as_ref().cloned().unwrap_or_default();
    if let Some(base_url) = cli.base_url {
        app_config.base_url = base_url;
    }
    if let Some(output_dir) = cli.output_dir {
        app_config.output_dir = output_dir;
    }
    if cli.no_auto_download {
        app_config.auto_download = false;
    }

    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    audit_logging::initialize(
        destination,
        app_config.level_filter(),
        Path::new(LOG_FILENAME),
    );
    if let Err(err) = &loaded {
        audit_warn!("{}; using defaults", err);
    }

    let engine_config = match app_config.engine_config() {
        Ok(engine_config) => engine_config,
        Err(err) => {
            audit_error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    app::run(
        engine_config,
        app_config.core_options(),
        RunOptions {
            url: cli.url,
            interactive: cli.interactive,
        },
    )
}

// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! kms - provision the credentials that protect a secret vault.
//!
//! This is the binary entry point. Every failure prints a message to stderr
//! and exits with status 1.

mod init;
mod output;
mod paths;
mod rotate;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use kms_config::{ConfigError, KmsConfig};
use kms_core::KmsError;
use kms_vault::Request;

/// kms - provision the credentials that protect a secret vault.
#[derive(Parser, Debug)]
#[command(name = "kms", version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a vault with a protected keyfile.
    Init(InitArgs),
    /// Replace the keypair and re-encrypt an existing keyfile.
    Rotate(TargetArgs),
    /// Print the derived secure layout without touching any file.
    Paths(TargetArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Vault database path (overrides `database.path`).
    #[arg(short = 'd', long)]
    database: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Database name substituted into the configured path templates.
    #[arg(short = 'N', long)]
    name: Option<String>,

    /// Keyfile path (overrides `keyfile.path`).
    #[arg(short = 'k', long)]
    keyfile: Option<PathBuf>,

    /// Configuration file to read, and to write after `init`.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

impl TargetArgs {
    fn request(&self, database: Option<PathBuf>) -> Request {
        Request {
            name: self.name.clone(),
            database,
            keyfile: self.keyfile.clone(),
        }
    }
}

/// Failures surfaced by the binary.
#[derive(Debug)]
enum CliError {
    Config(Vec<ConfigError>),
    Kms(KmsError),
}

impl From<KmsError> for CliError {
    fn from(err: KmsError) -> Self {
        Self::Kms(err)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(log_level(cli.verbose));

    match run(cli) {
        Ok(()) => {}
        Err(CliError::Config(errors)) => {
            kms_config::render_errors(&errors);
            std::process::exit(1);
        }
        Err(CliError::Kms(err)) => {
            eprintln!("{}: {err}", "error".red());
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let color = output::use_color(cli.plain);
    match cli.command {
        Commands::Init(args) => {
            let config = load_config(args.target.config.as_deref())?;
            let request = args.target.request(args.database);
            init::run_init(&config, &request, color)?;
        }
        Commands::Rotate(args) => {
            let config = load_config(args.config.as_deref())?;
            rotate::run_rotate(&config, &args.request(None), color)?;
        }
        Commands::Paths(args) => {
            let config = load_config(args.config.as_deref())?;
            paths::run_paths(&config, &args.request(None));
        }
    }
    Ok(())
}

/// Load and validate the configuration before any prompt is shown.
///
/// An explicit `--config` also becomes the place `init` persists to.
fn load_config(path: Option<&Path>) -> Result<KmsConfig, CliError> {
    let mut config = kms_config::load_and_validate(path).map_err(CliError::Config)?;
    if let Some(path) = path {
        config.config.path = path.display().to_string();
    }
    tracing::debug!(config = %config.config_path().display(), "configuration loaded");
    Ok(config)
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// The `kms` directive is a target prefix and so covers the library crates too.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kms={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

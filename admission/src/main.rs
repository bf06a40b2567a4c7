//! Broker admission checks from the command line.
//!
//! Reads broker objects or admission requests as JSON, runs the same checks
//! the webhook runs, and reports violations on stdout. Exit codes are listed
//! in [`admission::exit_codes`].

use std::path::{Path, PathBuf};

use admission::admission::review;
use admission::core::context::Operation;
use admission::core::field_error::FieldError;
use admission::core::validator::Validate;
use admission::exit_codes;
use admission::io::config::{
    AdmissionConfig, DEFAULT_CONFIG_PATH, OutputFormat, load_config, write_config,
};
use admission::io::object_store::{load_broker, load_request};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "admission",
    version,
    about = "Validation and immutability checks for eventing brokers"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a broker object (create path).
    Validate {
        /// Broker JSON file.
        broker: PathBuf,
    },
    /// Check that a broker update does not change immutable fields.
    CheckImmutable {
        /// Stored broker JSON file.
        #[arg(long)]
        original: PathBuf,
        /// Incoming broker JSON file.
        current: PathBuf,
    },
    /// Evaluate an admission request and print the response.
    Review {
        /// Admission request JSON file.
        request: PathBuf,
    },
    /// Write the default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    admission::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::InitConfig { force } => cmd_init_config(&cli.config, force),
        Command::Validate { broker } => {
            let cfg = load_config(&cli.config)?;
            cmd_validate(&cfg, &broker)
        }
        Command::CheckImmutable { original, current } => {
            let cfg = load_config(&cli.config)?;
            cmd_check_immutable(&cfg, &original, &current)
        }
        Command::Review { request } => {
            let cfg = load_config(&cli.config)?;
            cmd_review(&cfg, &request)
        }
    }
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AdmissionConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(exit_codes::OK)
}

fn cmd_validate(cfg: &AdmissionConfig, path: &Path) -> Result<i32> {
    let broker = load_broker(path)?;
    let ctx = cfg.context(Operation::Create);
    report(cfg, broker.validate(&ctx))
}

fn cmd_check_immutable(cfg: &AdmissionConfig, original: &Path, current: &Path) -> Result<i32> {
    let original = load_broker(original)?;
    let current = load_broker(current)?;
    let ctx = cfg.context(Operation::Update);
    report(cfg, current.check_immutable_fields(&ctx, Some(&original)))
}

fn cmd_review(cfg: &AdmissionConfig, path: &Path) -> Result<i32> {
    let request = load_request(path)?;
    let ctx = cfg.context(request.operation);
    let response = review(&ctx, &request);
    let code = if response.allowed {
        exit_codes::OK
    } else {
        exit_codes::REJECTED
    };

    match cfg.output.format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Text if response.allowed => println!("allowed"),
        OutputFormat::Text => {
            for record in &response.violations {
                println!("{}: {}", record.message, record.paths.join(", "));
                if let Some(details) = &record.details {
                    print!("{details}");
                }
            }
        }
    }
    Ok(code)
}

/// Print violations in the configured format and map them to an exit code.
fn report(cfg: &AdmissionConfig, errors: Option<FieldError>) -> Result<i32> {
    debug!(ok = errors.is_none(), "check finished");
    match cfg.output.format {
        OutputFormat::Json => {
            let records = errors.as_ref().map(FieldError::records).unwrap_or_default();
            print_json(&records)?;
        }
        OutputFormat::Text => {
            if let Some(errors) = &errors {
                println!("{errors}");
            }
        }
    }
    Ok(match errors {
        Some(_) => exit_codes::REJECTED,
        None => exit_codes::OK,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

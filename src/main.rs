//! MongoDB Restore Tool
//!
//! Lists zip backup archives stored in an S3 bucket and restores a selected
//! one into MongoDB via mongorestore. Downloaded archives and extraction
//! directories are left in the system temp directory for inspection.

// restoretool/src/main.rs
mod config;
mod errors;
mod restore;

use anyhow::{Context, Result};
use config::RestoreConfig;
use log::{LevelFilter, info};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    init_logging().context("Failed to initialize logging")?;

    // Expects config.json in the working directory, alongside the executable
    // or the project root when running with `cargo run`.
    let config_path = PathBuf::from("config.json");
    let mut restore_config = RestoreConfig::load_from_json(&config_path).context(format!(
        "Failed to load configuration from {}",
        config_path.display()
    ))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "list" => {
            println!("📋 Listing backups...");
            let entries = match restore::run_list_flow(&mut restore_config).await {
                Ok(entries) => entries,
                Err(failure) => return Err(outcome_error(&failure)),
            };
            if entries.is_empty() {
                println!("No backups found.");
            }
            for entry in &entries {
                println!(
                    "{}  {:>12}  {}",
                    entry.last_modified.as_deref().unwrap_or("-"),
                    entry
                        .size
                        .map(|size| size.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    entry.key
                );
            }
        }
        "2" | "restore" => {
            let backup_key = if args.len() > 2 {
                args[2].trim().to_string()
            } else {
                prompt_backup_key()?
            };
            println!("🔄 Restoring backup {}...", backup_key);
            match restore::run_restore_flow(&mut restore_config, &backup_key).await {
                Ok(success) => {
                    info!("restore finished for {}", success.backup_name);
                    println!("{}", serde_json::to_string_pretty(&success)?);
                }
                Err(failure) => return Err(outcome_error(&failure)),
            }
        }
        _ => {
            println!("❌ Invalid choice. Please enter '1' (list) or '2' (restore).");
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}",
        )))
        .build("restoretool.log")?;

    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(Root::builder().appender("logfile").build(LevelFilter::Debug))?;

    log4rs::init_config(log_config)?;
    Ok(())
}

/// Renders a flow failure in the same `{error, message, code?}` shape the
/// flows return to library callers.
fn outcome_error(failure: &restore::RestoreFailure) -> anyhow::Error {
    match serde_json::to_string(failure) {
        Ok(rendered) => anyhow::anyhow!(rendered),
        Err(_) => anyhow::anyhow!(failure.message.clone()),
    }
}

/// Prompts user to select the list or restore operation
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. List Backups (or type 'list')");
    println!("2. Restore Backup (or type 'restore')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    Ok(input.trim().to_string())
}

fn prompt_backup_key() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    print!("Enter the backup key to restore: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    let key = input.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("A backup key is required for restore");
    }
    Ok(key)
}

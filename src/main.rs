mod commands;
mod config;
mod db;
mod models;
mod services;
mod store;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::AppContext;
use crate::config::Config;
use crate::db::Database;

#[derive(Parser)]
#[command(
    name = "seikyu",
    version,
    about = "Invoice intake from Google Drive folders with Gemini extraction and payment tracking"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan enabled Drive folders and ingest new invoice documents
    Sync {
        /// Re-run the sync every N seconds instead of exiting
        #[arg(long, value_name = "SECONDS")]
        every: Option<u64>,
    },
    /// Extract an invoice from a local file and record it
    Upload { path: PathBuf },
    /// Inspect and manage invoices
    #[command(subcommand)]
    Invoices(InvoicesCommand),
    /// Manage watched Drive folders
    #[command(subcommand)]
    Folders(FoldersCommand),
}

#[derive(Subcommand)]
enum InvoicesCommand {
    /// List invoices, newest first
    List {
        /// Only show invoices with this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Flip an invoice between PENDING and PAID
    Toggle {
        id: String,
        /// Payment date recorded when marking as paid (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },
    /// Move past-due PENDING invoices to OVERDUE
    MarkOverdue,
    /// Cancel an unpaid invoice
    Cancel { id: String },
    /// Soft-delete an invoice
    Delete { id: String },
}

#[derive(Subcommand)]
enum FoldersCommand {
    /// Watch a new Drive folder
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, value_name = "DRIVE_FOLDER_ID")]
        folder_id: String,
    },
    /// List watched folders
    List,
    /// Include a folder in sync runs again
    Enable { id: String },
    /// Skip a folder without forgetting it
    Disable { id: String },
    /// Stop watching a folder
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let db = Arc::new(Database::open(&config.db_path)?);
    let ctx = AppContext { config, db };

    match cli.command {
        Command::Sync { every } => commands::sync::run(&ctx, every).await,
        Command::Upload { path } => commands::invoices::upload(&ctx, &path).await,
        Command::Invoices(command) => match command {
            InvoicesCommand::List { status } => commands::invoices::list(&ctx, status),
            InvoicesCommand::Toggle { id, date } => commands::invoices::toggle(&ctx, &id, date),
            InvoicesCommand::MarkOverdue => commands::invoices::mark_overdue(&ctx),
            InvoicesCommand::Cancel { id } => commands::invoices::cancel(&ctx, &id),
            InvoicesCommand::Delete { id } => commands::invoices::delete(&ctx, &id),
        },
        Command::Folders(command) => match command {
            FoldersCommand::Add { name, folder_id } => {
                commands::folders::add(&ctx, &name, &folder_id)
            }
            FoldersCommand::List => commands::folders::list(&ctx),
            FoldersCommand::Enable { id } => commands::folders::set_enabled(&ctx, &id, true),
            FoldersCommand::Disable { id } => commands::folders::set_enabled(&ctx, &id, false),
            FoldersCommand::Remove { id } => commands::folders::remove(&ctx, &id),
        },
    }
}

//! Tandem CLI - shared task list for two from the command line
//!
//! Mutations apply to the local cache immediately and queue durably;
//! `tandem sync` (or any command run while online) reconciles the queue
//! against the remote store.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::assign::run_assign;
use crate::commands::claim::run_claim;
use crate::commands::common::open_context;
use crate::commands::complete::run_complete;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::update::run_update;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tandem=info".parse().map_err(|_| {
                    CliError::Config("invalid default log directive".to_string())
                })?),
        )
        .init();

    let cli = Cli::parse();
    let ctx = open_context(cli.db_path).await?;

    match cli.command {
        Commands::Add {
            title,
            description,
            category,
            due,
        } => {
            run_add(
                &ctx,
                &title,
                description.as_deref(),
                category.as_deref(),
                due.as_deref(),
            )
            .await?;
        }
        Commands::List { status, mine, json } => run_list(&ctx, status, mine, json).await?,
        Commands::Update {
            id,
            title,
            description,
            category,
            due,
            clear_due,
        } => {
            run_update(
                &ctx,
                &id,
                title.as_deref(),
                description.as_deref(),
                category.as_deref(),
                due.as_deref(),
                clear_due,
            )
            .await?;
        }
        Commands::Claim { id } => run_claim(&ctx, &id).await?,
        Commands::Complete { id } => run_complete(&ctx, &id).await?,
        Commands::Assign { id, to, clear } => {
            run_assign(&ctx, &id, to.as_deref(), clear).await?;
        }
        Commands::Delete { id } => run_delete(&ctx, &id).await?,
        Commands::Sync { retry, force, json } => run_sync(&ctx, retry, force, json).await?,
        Commands::Status { json } => run_status(&ctx, json).await?,
    }

    Ok(())
}

//! Shuma CLI - Valuation wizard backend
//!
//! Usage:
//!   shuma init                          Initialize database
//!   shuma session create                Create a valuation session
//!   shuma extract <session>             Run AI extraction
//!   shuma fields <session>              Show resolved field values
//!   shuma serve --port 3000             Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
        Commands::Session { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                SessionAction::Create { data } => {
                    commands::cmd_session_create(&db, data.as_deref()).map(|_| ())
                }
                SessionAction::Show { id } => commands::cmd_session_show(&db, &id),
                SessionAction::List { limit } => commands::cmd_session_list(&db, limit),
            }
        }
        Commands::Fields { session, section } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_fields(&db, &session, section.as_deref())
        }
        Commands::Extract { session, only } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let client = commands::extractor_from_env()?;
            commands::cmd_extract(&db, client, &session, &only)
                .await
                .map(|_| ())
        }
        Commands::Snapshots { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                SnapshotsAction::List {
                    session,
                    extraction_type,
                } => commands::cmd_snapshots_list(&db, &session, extraction_type.as_deref()),
                SnapshotsAction::Restore { session, id } => {
                    commands::cmd_snapshots_restore(&db, &session, id)
                }
            }
        }
        Commands::Edits { session } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_edits(&db, &session)
        }
        Commands::Provenance { session, field } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_provenance(&db, &session, &field)
        }
        Commands::Sections => commands::cmd_sections(),
    }
}

//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Shuma - Real-estate valuation wizard backend
#[derive(Parser)]
#[command(name = "shuma")]
#[command(about = "Extraction, field reconciliation and provenance for property valuations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "shuma.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SHUMA_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, requests need a bearer key from SHUMA_API_KEYS or must
        /// come from SHUMA_TRUSTED_NETWORKS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage valuation sessions (create, show, list)
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Show the resolved value of every field of a session
    Fields {
        /// Session ID
        session: String,

        /// Only this section (see `shuma sections`)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Run AI extraction over a session's uploaded documents
    Extract {
        /// Session ID
        session: String,

        /// Only reprocess these document types (tabu, permit, condo, images)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },

    /// Manage extraction snapshots (list, restore)
    Snapshots {
        #[command(subcommand)]
        action: SnapshotsAction,
    },

    /// Show the manual edit history of a session
    Edits {
        /// Session ID
        session: String,
    },

    /// Show where a field's value came from
    Provenance {
        /// Session ID
        session: String,
        /// Field key (e.g. "gush") or a dotted data path
        field: String,
    },

    /// List field sections and their fields
    Sections,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a new session
    Create {
        /// Initial session data as a JSON object
        #[arg(long)]
        data: Option<String>,
    },

    /// Show a session's data
    Show {
        /// Session ID
        id: String,
    },

    /// List recent sessions
    List {
        /// Maximum number of sessions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum SnapshotsAction {
    /// List the snapshots of a session, newest first
    List {
        /// Session ID
        session: String,

        /// Only snapshots of this extraction type
        #[arg(short = 't', long = "type")]
        extraction_type: Option<String>,
    },

    /// Merge a snapshot back into the session's extracted data
    Restore {
        /// Session ID
        session: String,
        /// Snapshot ID
        id: i64,
    },
}

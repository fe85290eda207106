//! # TRR CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `compact` - Reclaim free space in the database file
//! - `create`, `list`, `show`, `update`, `delete` - Record management
//! - `transition` - Lifecycle transition
//! - `approve`, `advance`, `sdw` - SDW approval pipeline
//! - `dor` - Readiness evaluation
//! - `derive-stage`, `metrics`, `risk` - Read-only views

mod commands;

use crate::config::{AppConfig, StorageKind};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use trr_core::{
    ApprovalDecision, Category, Complexity, Priority, SdwRole, TrrError, TrrStatus,
};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// TRR - Technical Requirement Review workflow
///
/// Tracks validation work through a readiness gate, a status lifecycle,
/// and a role-gated approval pipeline.
#[derive(Parser, Debug)]
#[command(name = "trr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'C', long, global = true, default_value = "trr.toml")]
    pub config: PathBuf,

    /// Path to the database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<StorageKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Reclaim free space in the database file
    Compact,

    /// Create a draft TRR
    Create(CreateArgs),

    /// List TRRs
    List {
        /// Status filter (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        status: Vec<TrrStatus>,

        /// Priority filter (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        priority: Vec<Priority>,

        /// Category filter (comma-separated)
        #[arg(long, value_delimiter = ',')]
        category: Vec<Category>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Include archived records
        #[arg(long)]
        all: bool,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one TRR
    Show { id: u64 },

    /// Update descriptive fields of a TRR
    Update(UpdateArgs),

    /// Archive a TRR (history is kept)
    Delete {
        id: u64,

        /// Version the caller last saw
        #[arg(short = 'e', long)]
        expected_version: u64,
    },

    /// Move a TRR to a new status
    Transition {
        id: u64,

        /// Target status (e.g. pending, in-progress, rejected)
        to: TrrStatus,

        #[arg(short, long)]
        author: String,

        /// Reason; required when rejecting
        #[arg(short, long)]
        note: Option<String>,

        /// Version the caller last saw
        #[arg(short = 'e', long)]
        expected_version: u64,
    },

    /// Record an approval decision for the current SDW stage
    Approve {
        id: u64,

        /// Role slug or display name (e.g. product-owner, "QA Lead")
        role: SdwRole,

        /// approve or reject
        #[arg(short, long, default_value = "approve")]
        decision: ApprovalDecision,

        #[arg(short, long)]
        approver: String,

        #[arg(short, long)]
        note: Option<String>,

        /// Version the caller last saw
        #[arg(short = 'e', long)]
        expected_version: u64,
    },

    /// Advance the SDW pipeline to its next stage
    Advance {
        id: u64,

        /// Version the caller last saw
        #[arg(short = 'e', long)]
        expected_version: u64,
    },

    /// Evaluate the Definition of Ready
    Dor {
        id: u64,

        /// Ask the configured assist service for a second opinion
        #[arg(long)]
        assisted: bool,
    },

    /// Show SDW approval progress
    Sdw { id: u64 },

    /// Map a (phase, status) pair to a validation stage
    DeriveStage {
        phase: String,

        #[arg(default_value = "")]
        status: String,
    },

    /// Compute the playbook metrics view from a JSON file
    Metrics {
        /// JSON file with `framework` and `scenarios`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Score risk for a stored TRR or for explicit inputs
    Risk {
        /// Score a stored TRR as of now
        id: Option<u64>,

        #[arg(long)]
        complexity: Option<Complexity>,

        /// Whole days until due; negative when overdue
        #[arg(long, allow_hyphen_values = true)]
        days_until_due: Option<i64>,

        #[arg(long)]
        priority: Option<Priority>,
    },
}

/// Fields for `create`. Flags override values read from `--file`.
#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    #[arg(short, long)]
    pub author: String,

    /// JSON file with the full field set
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub expected_outcome: Option<String>,

    /// Acceptance criterion (repeatable)
    #[arg(short = 'c', long = "criterion")]
    pub criteria: Vec<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub complexity: Option<Complexity>,

    #[arg(long)]
    pub customer: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

/// Fields for `update`. Only given flags change the record.
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    pub id: u64,

    /// Version the caller last saw
    #[arg(short = 'e', long)]
    pub expected_version: u64,

    /// JSON file with a patch document
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// New assignee; an empty string clears it
    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long)]
    pub expected_outcome: Option<String>,

    /// Replace the acceptance criteria (repeatable)
    #[arg(short = 'c', long = "criterion")]
    pub criteria: Vec<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub complexity: Option<Complexity>,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TrrError> {
    let config = AppConfig::load(&cli.config)?.with_storage_overrides(cli.backend, cli.database);
    let json_mode = cli.json_mode;

    if config.storage.backend == StorageKind::Memory
        && !matches!(cli.command, Commands::Server { .. } | Commands::DeriveStage { .. })
    {
        tracing::warn!("Memory backend: changes are discarded when the command exits");
    }

    match cli.command {
        Commands::Server { host, port } => cmd_server(config, host, port).await,
        Commands::Init { force } => cmd_init(&config, force),
        Commands::Compact => cmd_compact(&config, json_mode),
        Commands::Create(args) => cmd_create(&config, json_mode, args),
        Commands::List {
            status,
            priority,
            category,
            assignee,
            tag,
            all,
            limit,
        } => {
            let filter = trr_core::TrrFilter {
                statuses: status,
                priorities: priority,
                categories: category,
                assignee,
                tag,
                include_archived: all,
                limit,
            };
            cmd_list(&config, json_mode, &filter)
        }
        Commands::Show { id } => cmd_show(&config, json_mode, id),
        Commands::Update(args) => cmd_update(&config, json_mode, args),
        Commands::Delete {
            id,
            expected_version,
        } => cmd_delete(&config, json_mode, id, expected_version),
        Commands::Transition {
            id,
            to,
            author,
            note,
            expected_version,
        } => {
            let request = trr_core::TransitionRequest {
                to,
                author_id: author,
                note,
                expected_version,
            };
            cmd_transition(&config, json_mode, id, request)
        }
        Commands::Approve {
            id,
            role,
            decision,
            approver,
            note,
            expected_version,
        } => {
            let request = trr_core::ApprovalRequest {
                role,
                decision,
                approver_id: approver,
                note,
                expected_version,
            };
            cmd_approve(&config, json_mode, id, request)
        }
        Commands::Advance {
            id,
            expected_version,
        } => cmd_advance(&config, json_mode, id, expected_version),
        Commands::Dor { id, assisted } => cmd_dor(&config, json_mode, id, assisted).await,
        Commands::Sdw { id } => cmd_sdw(&config, json_mode, id),
        Commands::DeriveStage { phase, status } => cmd_derive_stage(json_mode, &phase, &status),
        Commands::Metrics { file } => cmd_metrics(json_mode, &file),
        Commands::Risk {
            id,
            complexity,
            days_until_due,
            priority,
        } => {
            let inputs = trr_core::RiskInputs {
                complexity,
                days_until_due,
                priority,
            };
            cmd_risk(&config, json_mode, id, inputs)
        }
    }
}

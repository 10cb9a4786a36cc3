//! CLI definitions and entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{self, RiskOp, TaskOp};
use riskgraph::output::OutputMode;
use riskgraph::report::TableFormat;

/// riskgraph - threat modeling as code
#[derive(Parser, Debug)]
#[command(
    name = "riskgraph",
    version,
    about = "Threat modeling as code",
    long_about = "Derive security risks from a declarative architecture model.\n\n\
                  A model definition describes components, data flows, assets, and\n\
                  trust boundaries; evaluation matches a threat rule catalog against\n\
                  the graph and tracks remediation state across runs."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the model definition file
    #[arg(short, long, global = true, default_value = "model.toml")]
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and evaluate the model
    Check,

    /// List the derived risks
    Risks {
        /// Table format: plain, github
        #[arg(long, default_value = "plain")]
        format: TableFormat,
    },

    /// List the remediation backlog
    Backlog {
        /// Table format: plain, github
        #[arg(long, default_value = "plain")]
        format: TableFormat,
    },

    /// Export the model as an Open Threat Model document
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the data flow diagram descriptors
    Diagram,

    /// Record a risk disposition
    Risk {
        #[command(subcommand)]
        action: RiskAction,
    },

    /// Record a task state
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum RiskAction {
    /// Accept a risk
    Accept {
        /// Risk ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Transfer a risk to another party
    Transfer {
        /// Risk ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Mark a risk as mitigated
    Mitigate {
        /// Risk ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Discard a risk as a false positive
    Discard {
        /// Risk ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    /// Start a task (mark as in progress)
    Process {
        /// Task ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Complete a task (mark as closed)
    Close {
        /// Task ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Defer a task
    Defer {
        /// Task ID
        id: String,

        /// Tracking ticket
        #[arg(short, long)]
        ticket: Option<String>,

        /// Free-form comment
        #[arg(short, long)]
        comment: Option<String>,
    },
}

/// Run the CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Some(Command::Check) => commands::check(&cli.file, output_mode),
        Some(Command::Risks { format }) => commands::risks(&cli.file, format, output_mode),
        Some(Command::Backlog { format }) => commands::backlog(&cli.file, format, output_mode),
        Some(Command::Export { output }) => commands::export(&cli.file, output.as_deref()),
        Some(Command::Diagram) => commands::diagram(&cli.file, output_mode),
        Some(Command::Risk { action }) => {
            let (op, id, ticket, comment) = match action {
                RiskAction::Accept { id, ticket, comment } => (RiskOp::Accept, id, ticket, comment),
                RiskAction::Transfer { id, ticket, comment } => {
                    (RiskOp::Transfer, id, ticket, comment)
                },
                RiskAction::Mitigate { id, ticket, comment } => {
                    (RiskOp::Mitigate, id, ticket, comment)
                },
                RiskAction::Discard { id, ticket, comment } => {
                    (RiskOp::Discard, id, ticket, comment)
                },
            };
            commands::risk_state(&cli.file, op, &id, ticket, comment, output_mode)
        },
        Some(Command::Task { action }) => {
            let (op, id, ticket, comment) = match action {
                TaskAction::Process { id, ticket, comment } => (TaskOp::Process, id, ticket, comment),
                TaskAction::Close { id, ticket, comment } => (TaskOp::Close, id, ticket, comment),
                TaskAction::Defer { id, ticket, comment } => (TaskOp::Defer, id, ticket, comment),
            };
            commands::task_state(&cli.file, op, &id, ticket, comment, output_mode)
        },
        Some(Command::Version) => {
            if output_mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION")
                    })
                );
            } else {
                println!("riskgraph v{}", env!("CARGO_PKG_VERSION"));
            }
            Ok(())
        },
        None => {
            if output_mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "hint": "Use --help for usage"
                    })
                );
            } else {
                println!("riskgraph v{}", env!("CARGO_PKG_VERSION"));
                println!("\nRun 'riskgraph --help' for usage");
                println!("Run 'riskgraph check' to evaluate model.toml");
            }
            Ok(())
        },
    }
}

//! Performance Suite CLI
//!
//! A command-line tool for starting and stopping performance tests,
//! reading their SLA verdicts, and browsing resource recommendations.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{optimization, runs};

/// Performance Suite CLI
#[derive(Parser)]
#[command(name = "psctl")]
#[command(author, version, about = "CLI for the CI/CD Performance Suite", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PSCTL_API_URL env var)
    #[arg(long, env = "PSCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage performance-test runs
    #[command(subcommand)]
    Runs(RunsCommands),

    /// Show resource right-sizing recommendations
    Recommendations {
        /// Filter by namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Show aggregate savings across recommended containers
    Savings,

    /// Show backend status and the active run
    Health,
}

#[derive(Subcommand)]
pub enum RunsCommands {
    /// List all runs, newest first
    List,

    /// Show a single run
    Show {
        /// Run ID
        id: String,
    },

    /// Show detailed results of a completed run
    Results {
        /// Run ID
        id: String,
    },

    /// Start a new performance test
    Start {
        /// Test name
        #[arg(long)]
        name: String,

        /// Number of simulated users
        #[arg(long)]
        users: i64,

        /// Requested duration (e.g., 90s, 5m, 1h)
        #[arg(long)]
        duration: String,
    },

    /// Stop a run and compute its SLA verdict
    Stop {
        /// Run ID (stops the active run if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Report a latency sample for a running test
    Ingest {
        /// Run ID
        id: String,

        /// Observed request latency in milliseconds
        #[arg(long)]
        latency_ms: f64,

        /// Mark the request as failed
        #[arg(long)]
        failed: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref());

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Runs(runs_cmd) => match runs_cmd {
            RunsCommands::List => runs::list_runs(&client, cli.format).await?,
            RunsCommands::Show { id } => runs::show_run(&client, &id, cli.format).await?,
            RunsCommands::Results { id } => runs::show_results(&client, &id, cli.format).await?,
            RunsCommands::Start {
                name,
                users,
                duration,
            } => runs::start_run(&client, name, users, duration, cli.format).await?,
            RunsCommands::Stop { id } => runs::stop_run(&client, id, cli.format).await?,
            RunsCommands::Ingest {
                id,
                latency_ms,
                failed,
            } => runs::ingest_sample(&client, &id, latency_ms, failed, cli.format).await?,
        },
        Commands::Recommendations { namespace } => {
            let namespace = namespace.or(config.default_namespace);
            optimization::show_recommendations(&client, namespace, cli.format).await?;
        }
        Commands::Savings => optimization::show_savings(&client, cli.format).await?,
        Commands::Health => optimization::show_health(&client, cli.format).await?,
    }

    Ok(())
}

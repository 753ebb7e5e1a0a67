//! Alsvid command-line interface.
//!
//! Operator front end for the job pipeline: submit programs, run the
//! worker stages and inspect records. State lives in a JSON store file
//! so the stages can run from separate invocations, the way deployed
//! workers do against a shared store.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{collect, process, run, status, submit, verify};

/// Alsvid - asynchronous quantum job pipeline
#[derive(Parser)]
#[command(name = "alsvid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Store file holding the job records
    #[arg(long, default_value = "alsvid-store.json", global = true)]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a QASM program as a new job
    Submit {
        /// Input file (OpenQASM 2.0)
        #[arg(short, long)]
        input: PathBuf,

        /// Number of repetitions to sample
        #[arg(short, long, default_value = "100")]
        repetitions: u32,

        /// Run the job alone instead of multiplexing it
        #[arg(long)]
        no_batch: bool,

        /// Attach a note to the record
        #[arg(long)]
        note: Option<String>,
    },

    /// Verify pending jobs against the worker limits
    Verify,

    /// Claim verified jobs, place them and submit to the simulator
    Process {
        /// Simulator grid edge length (n x n)
        #[arg(long, default_value = "4")]
        grid: i32,
    },

    /// Collect results for submitted jobs
    Collect {
        /// Simulator grid edge length (n x n)
        #[arg(long, default_value = "4")]
        grid: i32,
    },

    /// Run verify, process and collect in sequence
    Run {
        /// Simulator grid edge length (n x n)
        #[arg(long, default_value = "4")]
        grid: i32,
    },

    /// Show job records
    Status {
        /// Job key (UUID); shows all jobs if omitted
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Submit {
            input,
            repetitions,
            no_batch,
            note,
        } => {
            submit::execute(
                &cli.store,
                &input,
                repetitions,
                !no_batch,
                note.as_deref(),
            )
            .await
        }
        Commands::Verify => verify::execute(&cli.store).await,
        Commands::Process { grid } => process::execute(&cli.store, grid).await,
        Commands::Collect { grid } => collect::execute(&cli.store, grid).await,
        Commands::Run { grid } => run::execute(&cli.store, grid).await,
        Commands::Status { key } => status::execute(&cli.store, key.as_deref()).await,
    }
}

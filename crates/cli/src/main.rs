// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use mams_cli::commands::record::{AssignArgs, ExpendArgs, PurchaseArgs, TransferArgs};
use mams_cli::commands::{record, report, session, sync};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mams")]
#[command(about = "MAMS field client: record offline, sync when connected", long_about = None)]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, env = "MAMS_SERVER", default_value = "http://127.0.0.1:5050")]
    server: String,

    /// Local cache file
    #[arg(long, global = true, env = "MAMS_CACHE", default_value = "cache.json")]
    cache: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account on the node
    Register {
        username: String,
        password: String,
        /// Admin, Base Commander or Logistics Officer
        #[arg(long)]
        role: String,
    },
    /// Log in and keep the session token in the cache
    Login { username: String, password: String },
    /// Forget the session token; queued operations are kept
    Logout,
    /// Queue a purchase
    Purchase(PurchaseArgs),
    /// Queue a transfer between bases
    Transfer(TransferArgs),
    /// Queue an assignment to personnel
    Assign(AssignArgs),
    /// Queue an expenditure
    Expend(ExpendArgs),
    /// Drop a queued or rejected operation
    Discard { client_ref: Uuid },
    /// Put a rejected operation back in the queue
    Requeue { client_ref: Uuid },
    /// Push queued operations to the node
    Sync {
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
        #[arg(long, default_value_t = 2)]
        retries: u32,
    },
    /// Show the sync state and pending queue
    Status,
    /// Show stock per base and type
    Inventory {
        /// Skip the refresh from the node
        #[arg(long)]
        offline: bool,
    },
    /// Show dashboard metrics
    Metrics {
        #[arg(long)]
        base: Option<String>,
        #[arg(long = "type")]
        equipment_type: Option<String>,
        /// Business day, YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        /// Compute from the local cache instead of asking the node
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mams_cli=warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cache = cli.cache.as_path();
    let server = cli.server.as_str();

    match cli.command {
        Commands::Register { username, password, role } => {
            session::register(server, &username, &password, &role).await
        }
        Commands::Login { username, password } => session::login(cache, server, &username, &password).await,
        Commands::Logout => session::logout(cache),
        Commands::Purchase(args) => record::run(cache, args.into_event(Utc::now())?),
        Commands::Transfer(args) => record::run(cache, args.into_event(Utc::now())?),
        Commands::Assign(args) => record::run(cache, args.into_event(Utc::now())?),
        Commands::Expend(args) => record::run(cache, args.into_event(Utc::now())?),
        Commands::Discard { client_ref } => record::discard(cache, client_ref),
        Commands::Requeue { client_ref } => record::requeue(cache, client_ref),
        Commands::Sync { timeout_secs, retries } => sync::run(cache, server, timeout_secs, retries).await,
        Commands::Status => report::status(cache),
        Commands::Inventory { offline } => report::inventory(cache, server, offline).await,
        Commands::Metrics {
            base,
            equipment_type,
            date,
            offline,
        } => report::metrics(cache, server, base, equipment_type, date, offline).await,
    }
}

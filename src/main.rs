//! Command-line entry point.
//!
//! Translates commands into core service calls and prints results as
//! JSON on stdout. Logs go to stderr so output stays machine-readable.

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use uuid::Uuid;

use tokfleet::{
    config::{FleetConfig, LogFormat, ObservabilityConfig},
    db::DbPool,
    models::User,
    services::Services,
    source::{MetricSource, TikTokSource},
};

#[derive(Parser)]
#[command(name = "tokfleet", version, about = "TikTok account fleet management")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations and exit.
    Migrate,
    /// Probe the upstream metric source.
    Status,
    /// Fetch fresh metrics for one account.
    RefreshAccount {
        /// Username of the acting user.
        #[arg(long)]
        actor: String,
        #[arg(long)]
        account: Uuid,
        /// Upstream fetch deadline in seconds.
        #[arg(long, default_value_t = 15)]
        timeout_secs: u64,
    },
    /// Fetch fresh metrics for every account in a group.
    RefreshGroup {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        group: Uuid,
        #[arg(long, default_value_t = 15)]
        timeout_secs: u64,
    },
    /// Print the caller-scoped dashboard summary.
    Dashboard {
        #[arg(long)]
        actor: String,
    },
    /// Print the trend series for one account.
    Trend {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        account: Uuid,
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Compare several accounts over a shared window.
    Compare {
        #[arg(long)]
        actor: String,
        /// Account ids; repeat the flag for each account.
        #[arg(long = "account", required = true)]
        accounts: Vec<Uuid>,
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Print the snapshot union for a group.
    GroupTrend {
        #[arg(long)]
        actor: String,
        #[arg(long)]
        group: Uuid,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FleetConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {}", e);
                std::process::exit(2);
            }
        },
        None => FleetConfig::default(),
    };

    init_tracing(&config.observability);

    if let Err(e) = run(cli, config).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: FleetConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(DbPool::from_config(&config.database).await?);
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let source: Arc<dyn MetricSource> = Arc::new(TikTokSource::from_config(&config.source)?);
    let services = Services::new(db.clone(), source.clone(), config.dashboard.clone());

    match cli.command {
        Command::Migrate => {
            // Migrations already ran above when enabled; force them
            // here for configurations that disable them at startup.
            db.run_migrations().await?;
            db.health_check().await?;
            println!("{}", serde_json::json!({"migrated": true}));
        }
        Command::Status => {
            let status = source.status().await;
            print_json(&serde_json::json!({"source": status}))?;
        }
        Command::RefreshAccount {
            actor,
            account,
            timeout_secs,
        } => {
            let actor = load_actor(&db, &actor).await?;
            let outcome = services
                .ingest
                .refresh_account(&actor, account, Duration::from_secs(timeout_secs))
                .await?;
            print_json(&outcome)?;
        }
        Command::RefreshGroup {
            actor,
            group,
            timeout_secs,
        } => {
            let actor = load_actor(&db, &actor).await?;
            let report = services
                .ingest
                .batch_refresh(&actor, group, Duration::from_secs(timeout_secs))
                .await?;
            print_json(&report)?;
        }
        Command::Dashboard { actor } => {
            let actor = load_actor(&db, &actor).await?;
            let summary = services.analytics.dashboard(&actor).await?;
            print_json(&summary)?;
        }
        Command::Trend {
            actor,
            account,
            days,
        } => {
            let actor = load_actor(&db, &actor).await?;
            let trend = services.analytics.account_trend(&actor, account, days).await?;
            print_json(&trend)?;
        }
        Command::Compare {
            actor,
            accounts,
            days,
        } => {
            let actor = load_actor(&db, &actor).await?;
            let comparison = services.analytics.compare(&actor, &accounts, days).await?;
            print_json(&comparison)?;
        }
        Command::GroupTrend { actor, group, days } => {
            let actor = load_actor(&db, &actor).await?;
            let trend = services.analytics.group_trend(&actor, group, days).await?;
            print_json(&trend)?;
        }
    }

    Ok(())
}

async fn load_actor(db: &Arc<DbPool>, username: &str) -> Result<User, Box<dyn std::error::Error>> {
    Ok(db
        .users()
        .get_by_username(username)
        .await?
        .ok_or_else(|| format!("no such user: {}", username))?)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.directives()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

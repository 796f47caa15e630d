//! `roti` - operator CLI for the ROTI poll engine.
//!
//! Opens the database configured through the environment (see [`config`])
//! and drives the engine through [`roti_core::RotiService`]:
//!
//! - `create`, `show`, `list`, `vote` cover the poll lifecycle.
//! - `sweep` runs a retention sweep on demand.
//! - `watch` runs the background gauge sampler until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use roti_core::sqlite::SqlitePollRepository;
use roti_core::{
    spawn_gauge_sampler, Database, NewPoll, PollGauges, PollId, RotiError, SqliteRotiService,
};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "roti", about = "Return On Time Invested polls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a poll and print its id.
    Create {
        /// Free-text description, may be empty.
        #[arg(default_value = "")]
        description: String,
        /// Keep the poll out of public listings.
        #[arg(long)]
        hidden: bool,
        /// Collect free-text feedback alongside ratings.
        #[arg(long)]
        feedback: bool,
    },
    /// Show a poll and its statistics.
    Show {
        id: String,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the most recent public polls.
    List,
    /// Record a vote between 1 and 5.
    Vote {
        id: String,
        value: String,
        #[arg(short, long, default_value = "")]
        feedback: String,
    },
    /// Delete polls older than the retention window.
    Sweep,
    /// Sample poll gauges periodically until interrupted.
    Watch,
}

/// Caller mistakes are reported plainly; everything else is a fault.
fn is_user_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RotiError>(),
        Some(RotiError::InvalidId(_) | RotiError::InvalidVote(_) | RotiError::NotFound(_))
    )
}

async fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let db_path = config.database_path();
    tracing::debug!("Using database: {}", db_path.display());
    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let service = SqliteRotiService::sqlite(&db);

    match cli.command {
        Commands::Create {
            description,
            hidden,
            feedback,
        } => {
            let poll = NewPoll::new(description).hidden(hidden).feedback_enabled(feedback);
            let id = service.create_poll(&poll, config.retention_days).await?;
            println!("{id}");
        }
        Commands::Show { id, json } => {
            let id: PollId = id.parse()?;
            let poll = service.get_poll(id).await?;
            let stats = service.poll_stats(id).await?;
            if json {
                let value = serde_json::json!({ "poll": poll, "stats": stats });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("ROTI {} {}", poll.id, poll.description);
                if poll.hidden {
                    println!("(hidden)");
                }
                println!(
                    "votes: {}  avg: {:.2}  min: {:.1}  max: {:.1}",
                    stats.count, stats.average, stats.min, stats.max
                );
                for line in &stats.feedback {
                    println!("  {line}");
                }
            }
        }
        Commands::List => {
            for summary in service.list_recent_polls().await? {
                println!("{}  {}", summary.id, summary.description);
            }
        }
        Commands::Vote {
            id,
            value,
            feedback,
        } => {
            let id: PollId = id.parse()?;
            let rating = service.validate_vote(&value)?;
            service.add_vote(id, rating, &feedback).await?;
            println!("vote {rating} recorded for {id}");
        }
        Commands::Sweep => {
            let report = service
                .polls()
                .sweeper()
                .sweep(config.retention_days)
                .await;
            println!(
                "removed {} poll(s) and {} vote(s), {} failure(s)",
                report.polls_removed, report.votes_removed, report.failures
            );
        }
        Commands::Watch => {
            let polls = Arc::new(SqlitePollRepository::new(db.pool().clone()));
            let gauges = Arc::new(PollGauges::new());
            let sampler = spawn_gauge_sampler(polls, gauges.clone(), config.metrics_interval);

            let mut report = tokio::time::interval(config.metrics_interval);
            loop {
                tokio::select! {
                    _ = report.tick() => {
                        tracing::info!(total = gauges.total(), active = gauges.active(), "Poll gauges");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted, stopping gauge sampler");
                        break;
                    }
                }
            }
            sampler.abort();
        }
    }

    db.pool().close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_user_error(&e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

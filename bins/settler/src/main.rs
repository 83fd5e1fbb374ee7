//! Sarraf settler
//!
//! Loads a remittance book into an in-memory store and proposes or executes
//! settlements against it. Results are printed as JSON.
//!
//! Usage: cargo run --bin settler -- auto-settle --book demos/book.json

mod book;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sarraf_core::settlement::Strategy;
use sarraf_shared::AppConfig;
use sarraf_shared::config::LoggingConfig;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::book::{Book, Session};

#[derive(Parser)]
#[command(name = "settler")]
#[command(about = "Match incoming remittance credit against outgoing debt", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what a strategy would settle for one incoming remittance
    Propose {
        /// Book file (JSON)
        #[arg(long)]
        book: PathBuf,
        /// Reference of the incoming remittance
        #[arg(long)]
        incoming: String,
        /// fifo, lifo, best_rate or manual; the configured default when absent
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Auto-settle every incoming remittance of the book, in book order
    AutoSettle {
        /// Book file (JSON)
        #[arg(long)]
        book: PathBuf,
        /// fifo, lifo or best_rate; the configured default when absent
        #[arg(long)]
        strategy: Option<String>,
    },

    /// Print the book summary without settling anything
    Summary {
        /// Book file (JSON)
        #[arg(long)]
        book: PathBuf,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr so stdout stays valid JSON.
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn parse_strategy(raw: Option<&str>) -> anyhow::Result<Option<Strategy>> {
    raw.map(str::parse::<Strategy>).transpose().context("invalid --strategy")
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging);

    let cli = Cli::parse();
    match cli.command {
        Commands::Propose {
            book,
            incoming,
            strategy,
        } => {
            let session = Session::load(&Book::read(&book)?, &config).await?;
            let strategy = parse_strategy(strategy.as_deref())?.unwrap_or(session.settlements.default_strategy());
            let target = session.incoming_by_reference(&incoming)?;
            let proposals = session
                .settlements
                .propose(session.tenant.id, target.id, strategy)
                .await?;

            let rows: Vec<_> = proposals
                .iter()
                .map(|p| {
                    json!({
                        "outgoing": session.outgoing_reference(p.outgoing_id),
                        "amount_irr": p.proposed_irr.amount,
                        "buy_rate": p.outgoing_buy_rate,
                        "projected_profit_cad": p.projected_profit_cad.amount,
                    })
                })
                .collect();
            print_json(&json!({
                "incoming": incoming,
                "strategy": strategy,
                "proposals": rows,
            }))?;
        }

        Commands::AutoSettle { book, strategy } => {
            let session = Session::load(&Book::read(&book)?, &config).await?;
            let strategy = parse_strategy(strategy.as_deref())?;

            let mut runs = Vec::with_capacity(session.incoming.len());
            for incoming in &session.incoming {
                let outcome = session
                    .settlements
                    .auto_settle(session.tenant.id, incoming.id, strategy, session.actor, None)
                    .await;
                let outcome = match outcome {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(incoming = %incoming.reference, error = %e, "skipped");
                        runs.push(json!({ "incoming": incoming.reference, "error": e.to_string() }));
                        continue;
                    }
                };
                let settled: Vec<_> = outcome
                    .settlements
                    .iter()
                    .map(|s| {
                        json!({
                            "outgoing": session.outgoing_reference(s.outgoing_id),
                            "settled_irr": s.settled_irr.amount,
                            "profit_cad": s.profit_cad.amount,
                        })
                    })
                    .collect();
                runs.push(json!({
                    "incoming": incoming.reference,
                    "settlements": settled,
                    "error": outcome.error.map(|e| e.to_string()),
                }));
            }

            let summary = session.settlements.book_summary(session.tenant.id).await?;
            info!(
                settlements = summary.settlement_count,
                profit = %summary.realized_profit_cad,
                "auto-settlement run complete"
            );
            print_json(&json!({ "runs": runs, "summary": summary }))?;
        }

        Commands::Summary { book } => {
            let session = Session::load(&Book::read(&book)?, &config).await?;
            let summary = session.settlements.book_summary(session.tenant.id).await?;
            let outgoing = session.remittances.list_outgoing(session.tenant.id).await?;
            let open: Vec<_> = outgoing
                .iter()
                .filter(|o| o.is_open())
                .map(|o| json!({ "reference": o.reference, "remaining_irr": o.remaining_irr.amount }))
                .collect();
            print_json(&json!({ "summary": summary, "open_outgoing": open }))?;
        }
    }

    Ok(())
}

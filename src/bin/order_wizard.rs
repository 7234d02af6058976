//! Order Wizard CLI
//!
//! Drives the order workflow against a live backend from the terminal.
//!
//! Usage:
//!   cargo run --bin order-wizard -- companies --search acme
//!   cargo run --bin order-wizard -- agency "Acme Corp"
//!   cargo run --bin order-wizard -- reschedule --record demos/random_test.json
//!
//! Backend location and credentials come from the YAML file given with
//! `--config` (or `ORDER_WIZARD_CONFIG`), overlaid by `ORDER_WIZARD_API_BASE`,
//! `ORDER_WIZARD_AUTH_TOKEN` and `ORDER_WIZARD_ROLE`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_wizard::{
    NoopListener, RandomTestRecord, SessionMode, WizardConfig, WizardServices, WizardSession,
    WizardStep,
};

/// Order workflow driver
#[derive(Parser, Debug)]
#[command(name = "order-wizard", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "ORDER_WIZARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the company directory and list its entries
    Companies {
        /// Only show companies whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Resolve the managing agency email for a company name
    Agency {
        company_name: String,
    },
    /// Mount a reschedule session from a random-test record and print the prefilled form
    Reschedule {
        /// JSON file holding the random-test record
        #[arg(long)]
        record: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_wizard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config_path = args.config.as_ref().map(|p| p.display().to_string());
    let config =
        WizardConfig::load(config_path.as_deref()).context("Failed to load wizard configuration")?;
    let services = WizardServices::from_config(&config).context("Failed to build HTTP services")?;

    match args.command {
        Command::Companies { search } => {
            let mut session =
                WizardSession::new(SessionMode::Create, services, Box::new(NoopListener));
            session.mount();
            session.settle().await;

            let directory = session.directory();
            let matches = directory.search(search.as_deref().unwrap_or_default());
            for company in &matches {
                println!(
                    "{}\t{}\t{} packages\t{} order reasons",
                    company.id,
                    company.display_name,
                    company.packages.len(),
                    company.order_reasons.len()
                );
            }
            tracing::info!(
                shown = matches.len(),
                total = directory.entries().len(),
                status = ?directory.status(),
                "Directory listed"
            );
        }
        Command::Agency { company_name } => {
            tracing::info!(
                company = %company_name,
                strategies = services.resolver.strategy_count(),
                "Resolving managing agency"
            );
            let resolution = services.resolver.resolve(&company_name).await;
            match resolution.error {
                Some(warning) => println!("warning: {}", warning),
                None if resolution.email.is_empty() => println!("no managing agency"),
                None => println!("{}", resolution.email),
            }
        }
        Command::Reschedule { record } => {
            let content = std::fs::read_to_string(&record)
                .with_context(|| format!("Failed to read {}", record.display()))?;
            let record: RandomTestRecord =
                serde_json::from_str(&content).context("Failed to parse random-test record")?;

            let mut session = WizardSession::new(
                SessionMode::Reschedule(record),
                services,
                Box::new(NoopListener),
            );
            session.mount();
            session.settle().await;

            let view = session.view();
            eprintln!(
                "Step {}/{}: {}",
                view.current_position + 1,
                WizardStep::ALL.len(),
                view.step.label()
            );
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}

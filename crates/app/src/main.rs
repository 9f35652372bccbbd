use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tally_core::{Category, CategoryId, DateWindow};
use tally_import::MatchEngine;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod prompt;

use config::Config;
use prompt::TerminalChooser;

#[derive(Parser)]
#[command(name = "tally", about = "Import, categorise and summarise bank statements")]
struct Cli {
    /// Settings file; missing means defaults
    #[arg(long, global = true, default_value = "tally.toml")]
    config: PathBuf,
    /// Overrides the database path from the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every CSV statement in a directory
    Import {
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Use this account for every file instead of asking
        #[arg(long)]
        account: Option<String>,
    },
    /// Assign categories to uncategorised transactions
    Categorise {
        /// Also re-triage everything filed under this category
        #[arg(long = "override")]
        category_override: Option<String>,
    },
    /// Print category totals for a date window
    Summary {
        #[arg(long)]
        from_date: Option<NaiveDate>,
        #[arg(long)]
        to_date: Option<NaiveDate>,
        /// Report only this category's subtree
        #[arg(long)]
        category: Option<String>,
        /// Also list the N largest transactions
        #[arg(long)]
        top: Option<u32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tally=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(database) = cli.database {
        config.database = Some(database);
    }

    let db_path = config.database_path()?;
    tracing::debug!("Opening database at {}", db_path.display());
    let pool = tally_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match cli.command {
        Commands::Import { dir, account } => {
            let dir = dir.unwrap_or_else(|| config.statements.clone());
            let mut chooser = TerminalChooser::new(std::io::stdin().lock(), std::io::stdout());
            let report = commands::import_statements(&pool, &dir, &config.layout, |file, existing| {
                match &account {
                    Some(name) => Ok(name.clone()),
                    None => chooser.choose_account(file, existing),
                }
            })
            .await?;
            println!(
                "Imported {} transactions from {} files ({} new, {} updated)",
                report.processed, report.files, report.inserted, report.updated
            );
        }
        Commands::Categorise { category_override } => {
            let tree = Category::load(&config.categories)
                .with_context(|| format!("Failed to load {}", config.categories.display()))?;
            let category_override = category_override.map(CategoryId::new);
            if let Some(id) = &category_override {
                if tree.find(id).is_none() {
                    anyhow::bail!("Unknown category: {id}");
                }
            }
            let engine = MatchEngine::new(
                config.matching.threshold,
                config.matching.excluded_markers.clone(),
            );
            let mut chooser = TerminalChooser::new(std::io::stdin().lock(), std::io::stdout());
            let report = commands::categorise_pending(
                &pool,
                &tree,
                &engine,
                &mut chooser,
                category_override.as_ref(),
            )
            .await?;
            println!(
                "Categorised {} transactions ({} automatically, {} by hand)",
                report.automatic + report.manual,
                report.automatic,
                report.manual
            );
        }
        Commands::Summary {
            from_date,
            to_date,
            category,
            top,
        } => {
            let tree = Category::load(&config.categories)
                .with_context(|| format!("Failed to load {}", config.categories.display()))?;
            let window = DateWindow::new(from_date, to_date);
            let root = category.map(CategoryId::new);
            let report =
                commands::summary_report(&pool, &tree, &window, root.as_ref(), top).await?;
            print!("{report}");
        }
    }

    pool.close().await;
    Ok(())
}

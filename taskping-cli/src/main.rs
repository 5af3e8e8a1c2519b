use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod notion;
mod run;
mod sink;

#[derive(Parser, Debug)]
#[command(name = "taskping", version, about = "Task alerts from your Notion database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the alert daemon (refresh + check timers)
    Run {
        /// Do a single fetch + check cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Verify Notion credentials and database access
    Test,

    /// Write a default ~/.taskping/config.toml
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { once } => {
            let cfg = config::load_config()?;
            let secrets = config::load_secrets()?;
            run::run(cfg, secrets, once).await?;
        }

        Command::Test => {
            test_connection().await?;
        }

        Command::InitConfig => {
            config::init_config()?;
        }
    }

    Ok(())
}

/// Connectivity self-test: retrieve the database and show its schema so a
/// misconfigured token/id/share fails here instead of inside the daemon.
async fn test_connection() -> Result<()> {
    let secrets = config::load_secrets()
        .context("credentials missing; put NOTION_TOKEN and NOTION_DATABASE_ID in .env")?;
    println!("Environment variables loaded");

    let client = notion::NotionClient::new(secrets.notion_token, secrets.database_id)?;

    let (title, properties) = client.retrieve_database().await.context(
        "database retrieve failed; check the token, the database id, \
         and that the integration has access to the database",
    )?;

    println!("Database found: {title}");
    println!("\nDatabase properties:");
    for (name, kind) in &properties {
        println!("  - {name}: {kind}");
    }

    println!("\nEverything looks good. Start the daemon with: taskping run");
    Ok(())
}

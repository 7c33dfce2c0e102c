use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::*;
use settlement_engine::{
    db_types::{GroupId, OperationId},
    helpers::billing_cycle_key,
    EngineConfig,
    LedgerApi,
    SqliteDatabase,
};

mod formatting;

use crate::formatting::{format_group_history, format_group_state, format_operation};

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Inspect and maintain the settlement ledger")]
pub struct Arguments {
    /// The ledger database. Defaults to STL_DATABASE_URL.
    #[arg(short = 'd', long = "database")]
    database: Option<String>,
    /// Print results as JSON instead of tables
    #[arg(short = 'j', long = "json")]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "migrate", about = "Create the ledger database if needed and bring its schema up to date")]
    Migrate,
    #[clap(name = "history", about = "List every record in a group, oldest first")]
    History(GroupParams),
    #[clap(name = "state", about = "Show the current state of a group")]
    State(GroupParams),
    #[clap(name = "operation", about = "Show a single operation by its id")]
    Operation {
        /// The operation id, which is also its idempotency key
        id: String,
    },
    #[clap(name = "billing-key", about = "Print the idempotency key for a subscription's billing cycle")]
    BillingKey(BillingKeyParams),
}

#[derive(Debug, Args)]
pub struct GroupParams {
    /// The transaction group id
    group_id: String,
}

#[derive(Debug, Args)]
pub struct BillingKeyParams {
    /// The subscription identifier
    subscription_id: String,
    /// The billing date, as YYYY-MM-DD
    billing_date: NaiveDate,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Arguments) -> Result<()> {
    let mut config = EngineConfig::from_env_or_default();
    if let Some(url) = cli.database {
        config.database_url = url;
    }
    match cli.command {
        Command::Migrate => {
            config.run_migrations = true;
            let _db = SqliteDatabase::from_config(&config).await?;
            info!("🗃️ Ledger at {} is up to date", config.database_url);
            println!("Migrations complete for {}", config.database_url);
        },
        Command::History(params) => {
            let api = ledger_api(&config).await?;
            let group_id = GroupId::from(params.group_id);
            let history =
                api.group_history(&group_id).await?.ok_or_else(|| anyhow!("Group {group_id} has no records"))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                println!("{}", format_group_history(&history)?);
            }
        },
        Command::State(params) => {
            let api = ledger_api(&config).await?;
            let group_id = GroupId::from(params.group_id);
            let state = api.group_state(&group_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("{}", format_group_state(&group_id, &state)?);
            }
        },
        Command::Operation { id } => {
            let api = ledger_api(&config).await?;
            let id = OperationId::from(id);
            let op = api.operation(&id).await?.ok_or_else(|| anyhow!("Operation {id} does not exist"))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&op)?);
            } else {
                println!("{}", format_operation(&op)?);
            }
        },
        Command::BillingKey(params) => {
            let key = billing_cycle_key(&params.subscription_id, params.billing_date);
            println!("{key}");
        },
    }
    Ok(())
}

async fn ledger_api(config: &EngineConfig) -> Result<LedgerApi<SqliteDatabase>> {
    // Read-only commands never alter the schema
    let config = EngineConfig { run_migrations: false, ..config.clone() };
    let db = SqliteDatabase::from_config(&config).await?;
    Ok(LedgerApi::new(db))
}

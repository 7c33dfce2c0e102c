//! Engine configuration, read from `STL_*` environment variables.
//!
//! | Variable                | Default                      | Meaning                                            |
//! |-------------------------|------------------------------|----------------------------------------------------|
//! | `STL_DATABASE_URL`      | `sqlite://data/settlement.db`| The ledger database                                |
//! | `STL_MAX_CONNECTIONS`   | 25                           | Size of the database connection pool               |
//! | `STL_EVENT_BUFFER_SIZE` | 64                           | Capacity of each event hook's channel              |
//! | `STL_RUN_MIGRATIONS`    | true                         | Bring the schema up to date when connecting        |
use std::{env, str::FromStr};

use log::*;
use settle_common::parse_boolean_flag;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/settlement.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub event_buffer_size: usize,
    pub run_migrations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            run_migrations: true,
        }
    }
}

impl EngineConfig {
    pub fn new(database_url: &str) -> Self {
        Self { database_url: database_url.to_string(), ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let database_url = env::var("STL_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ STL_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let max_connections = parse_env_or("STL_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let event_buffer_size = parse_env_or("STL_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let run_migrations = parse_boolean_flag(env::var("STL_RUN_MIGRATIONS").ok(), true);
        Self { database_url, max_connections, event_buffer_size, run_migrations }
    }
}

fn parse_env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

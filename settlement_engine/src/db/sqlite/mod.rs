//! # SQLite ledger backend
//!
//! The "low-level" SQLite interactions live in [`operations`] as simple functions that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or open a transaction as the need
//! arises and call through to the functions without any other changes.
//!
//! [`SqliteDatabase`] wraps a connection pool and implements [`crate::LedgerStore`] on top of those functions.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod operations;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

const SQLITE_DB_URL: &str = "sqlite://data/settlement.db";

/// The embedded schema migrations for the ledger.
pub static MIGRATOR: Migrator = sqlx::migrate!("./src/db/sqlite/migrations");

pub fn db_url() -> String {
    let result = env::var("STL_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ STL_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

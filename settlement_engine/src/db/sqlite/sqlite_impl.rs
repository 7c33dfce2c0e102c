//! `SqliteDatabase` is a concrete implementation of a settlement ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements [`LedgerStore`].
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, operations, MIGRATOR};
use crate::{
    config::EngineConfig,
    db::traits::{InsertOperationResult, LedgerError, LedgerStore},
    db_types::{GroupId, NewOperation, Operation, OperationId},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

#[async_trait]
impl LedgerStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_operation(&self, id: &OperationId) -> Result<Option<Operation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        operations::fetch_operation(id, &mut conn).await
    }

    async fn fetch_group_history(&self, group_id: &GroupId) -> Result<Vec<Operation>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let history = operations::fetch_group_history(group_id, &mut conn).await?;
        trace!("🗃️ Fetched {} records for group {group_id}", history.len());
        Ok(history)
    }

    async fn insert_operation(&self, operation: NewOperation) -> Result<InsertOperationResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = operations::idempotent_insert(operation, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from `STL_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Connects using the engine configuration, running the schema migrations first if the configuration asks for it.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, LedgerError> {
        let db = Self::new_with_url(&config.database_url, config.max_connections).await?;
        if config.run_migrations {
            db.migrate().await?;
        }
        Ok(db)
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        MIGRATOR.run(&self.pool).await?;
        info!("🗃️ Ledger migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

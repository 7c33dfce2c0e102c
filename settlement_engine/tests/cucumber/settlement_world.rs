use std::collections::HashMap;

use cucumber::World;
use log::*;
use settlement_engine::{
    db_types::{GroupId, OperationId},
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        ScriptedGateway,
    },
    ExecutedOperation,
    MerchantCredentials,
    OperationFlowApi,
    OperationFlowError,
    SqliteDatabase,
};
use tokio::time::sleep;

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
    /// Scenario names for groups, mapped to the ids the engine assigned them.
    pub groups: HashMap<String, GroupId>,
    pub last_result: Option<Result<ExecutedOperation, OperationFlowError>>,
    pub last_capture: HashMap<String, OperationId>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub db_path: String,
    pub api: OperationFlowApi<SqliteDatabase, ScriptedGateway>,
}

impl SettlementWorld {
    pub fn api(&self) -> &OperationFlowApi<SqliteDatabase, ScriptedGateway> {
        &self.system.as_ref().expect("OperationFlowApi not initialised").api
    }

    pub fn gateway(&self) -> &ScriptedGateway {
        self.api().gateway()
    }

    pub fn merchant(&self) -> MerchantCredentials {
        MerchantCredentials::new("merchant_1", "sk_test_merchant_1".into())
    }

    pub fn group(&self, name: &str) -> GroupId {
        self.groups.get(name).cloned().unwrap_or_else(|| GroupId::from(name))
    }

    pub fn record_result(&mut self, group: &str, result: Result<ExecutedOperation, OperationFlowError>) {
        match &result {
            Ok(op) => {
                self.groups.entry(group.to_string()).or_insert_with(|| op.group_id().clone());
            },
            Err(OperationFlowError::Declined(op)) => {
                self.groups.entry(group.to_string()).or_insert_with(|| op.group_id.clone());
            },
            Err(e) => debug!("🚀️ Operation on group {group} failed: {e}"),
        }
        self.last_result = Some(result);
    }

    pub fn last_result(&self) -> &Result<ExecutedOperation, OperationFlowError> {
        self.last_result.as_ref().expect("No operation has been executed yet")
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let api = OperationFlowApi::new(db, ScriptedGateway::new(), Default::default());
        Self { db_path: url, api }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}

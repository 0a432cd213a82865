//! `taskflow serve` 子命令

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::state::AppState;
use crate::api;
use crate::config::ChatConfig;
use crate::storage::{self, sqlite::SqliteTaskTable};
use crate::store::TaskStore;

pub async fn execute(port: u16, host: &str, db: Option<PathBuf>) {
    let config = ChatConfig::load();
    if config.api_key.is_none() {
        eprintln!("Warning: no AI gateway key configured (TASKFLOW_API_KEY); chat endpoints will return errors.");
    }

    let db_path = db.unwrap_or_else(storage::default_db_path);
    let table = match SqliteTaskTable::open(&db_path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Failed to open task database {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    let store = TaskStore::new(Arc::new(table));
    let state = match AppState::new(store, config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("Failed to initialize server state: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = api::start_server(host, port, state).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

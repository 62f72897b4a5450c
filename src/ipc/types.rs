use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::identity::SqliteIdentity;
use crate::remote::SqliteRemote;
use crate::session::SessionGate;

pub type Gate = SessionGate<SqliteIdentity, SqliteRemote>;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    /// Workspace settings connection.
    pub db: Option<Connection>,
    pub gate: Option<Gate>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            gate: None,
        }
    }
}

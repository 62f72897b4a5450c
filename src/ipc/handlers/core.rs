use crate::identity::SqliteIdentity;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::types::{AppState, Request};
use crate::remote::SqliteRemote;
use crate::session::SessionGate;
use crate::sync::SyncEngine;
use crate::db;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens (or creates) the workspace database and replaces any previous
/// workspace. The previous session does not carry over.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;
    let identity = SqliteIdentity::open(path)?;
    let remote = SqliteRemote::open(path)?;

    let mut engine = SyncEngine::new(remote);
    engine.set_seed_classes(setup::seed_classes(&conn)?);

    if let Some(mut previous) = state.gate.take() {
        previous.sign_out();
    }
    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    state.gate = Some(SessionGate::new(identity, engine));
    tracing::info!(workspace = %path.display(), "workspace opened");
    Ok(())
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "authenticated": state.gate.as_ref().is_some_and(|g| g.is_authenticated()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}

use serde::Serialize;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Session;
use crate::remote::SqliteRemote;
use crate::session::GateError;
use crate::store::EntityStore;
use crate::sync::{Outcome, SyncEngine, SyncError};

pub fn param_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn opt_str<'a>(req: &'a Request, key: &str) -> Result<Option<&'a str>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be a string", key), None)),
    }
}

pub fn param_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn opt_f64(req: &Request, key: &str) -> Result<Option<f64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be a number", key), None)),
    }
}

pub fn opt_bool(req: &Request, key: &str) -> Result<Option<bool>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be a boolean", key), None)),
    }
}

pub fn param_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn param_str_list(req: &Request, key: &str) -> Result<Vec<String>, serde_json::Value> {
    let Some(arr) = req.params.get(key).and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    arr.iter()
        .map(|v| {
            v.as_str().map(|s| s.to_string()).ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must be an array of strings", key),
                    None,
                )
            })
        })
        .collect()
}

pub fn gate_err(id: &str, e: &GateError) -> serde_json::Value {
    match e {
        GateError::NotAuthenticated => err(id, "not_authenticated", e.to_string(), None),
        GateError::Identity(inner) => err(id, inner.code(), inner.message(), None),
    }
}

/// Remote write failures carry the message the user is shown.
pub fn sync_err(id: &str, e: &SyncError) -> serde_json::Value {
    let SyncError::RemoteWrite { action, source } = e;
    err(
        id,
        "remote_write_failed",
        e.to_string(),
        Some(json!({
            "action": action,
            "remoteCode": source.code(),
            "table": source.table(),
        })),
    )
}

pub fn authed<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<(&'a Session, &'a mut SyncEngine<SqliteRemote>), serde_json::Value> {
    let Some(gate) = state.gate.as_mut() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    gate.authed().map_err(|e| gate_err(&req.id, &e))
}

pub fn authed_store<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a EntityStore, serde_json::Value> {
    let (_, engine) = authed(state, req)?;
    let engine: &'a SyncEngine<SqliteRemote> = engine;
    Ok(engine.store())
}

/// `{applied: true, <key>: value}` or `{applied: false, reason}`; a remote
/// failure becomes an error response.
pub fn outcome<T: Serialize>(
    req: &Request,
    key: &str,
    res: Result<Outcome<T>, SyncError>,
) -> serde_json::Value {
    match res {
        Ok(Outcome::Applied(v)) => {
            let mut result = json!({ "applied": true });
            result[key] = json!(v);
            ok(&req.id, result)
        }
        Ok(Outcome::Refused(reason)) => ok(&req.id, json!({ "applied": false, "reason": reason })),
        Err(e) => sync_err(&req.id, &e),
    }
}

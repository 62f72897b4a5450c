use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::{self, PickerDefaults};
use crate::ipc::helpers::{authed_store, param_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::picker;
use serde_json::json;

fn picker_defaults(state: &AppState, req: &Request) -> Result<PickerDefaults, serde_json::Value> {
    let Some(conn) = state.db.as_ref() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    setup::picker_defaults(conn).map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))
}

fn opt_u64(req: &Request, key: &str) -> Result<Option<u64>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a non-negative integer", key),
                None,
            )
        }),
    }
}

fn handle_picker_spin(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match param_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let from_rotation = match opt_u64(req, "fromRotation") {
        Ok(v) => v.unwrap_or(0),
        Err(resp) => return resp,
    };
    let defaults = match picker_defaults(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if store.class(class_id).is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }

    let roster: Vec<&Student> = store.students_in_class(class_id).collect();
    match picker::spin(&roster, from_rotation, defaults.spin, &mut rand::rng()) {
        Some(spin) => ok(&req.id, json!({ "spun": true, "spin": spin })),
        None => ok(
            &req.id,
            json!({ "spun": false, "reason": "need at least 2 students to spin" }),
        ),
    }
}

fn handle_picker_sample(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match param_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let size = match opt_u64(req, "size") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let defaults = match picker_defaults(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let size = size.map(|n| n as usize).unwrap_or(defaults.sample_size);
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if store.class(class_id).is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }

    let roster: Vec<&Student> = store.students_in_class(class_id).collect();
    let picked = picker::sample(&roster, size, &mut rand::rng());
    ok(&req.id, json!({ "students": picked }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "picker.spin" => Some(handle_picker_spin(state, req)),
        "picker.sample" => Some(handle_picker_sample(state, req)),
        _ => None,
    }
}

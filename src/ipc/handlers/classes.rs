use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{authed, authed_store, outcome, param_f64, param_str};
use crate::ipc::types::{AppState, Request};
use crate::views;
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    // Include counts so the dashboard cards need no second call.
    let classes: Vec<_> = store
        .classes
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": store.students_in_class(&c.id).count(),
                "assignmentCount": store.assignments.iter().filter(|a| a.targets(&c.id)).count(),
            })
        })
        .collect();
    ok(&req.id, json!({ "classes": classes }))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match param_str(req, "name") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "class", engine.add_class(session, name))
}

fn handle_classes_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (class_id, name) = match (param_str(req, "classId"), param_str(req, "name")) {
        (Ok(c), Ok(n)) => (c, n),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "class", engine.rename_class(session, class_id, name))
}

fn handle_classes_adjust_points(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (class_id, delta) = match (param_str(req, "classId"), param_f64(req, "delta")) {
        (Ok(c), Ok(d)) => (c, d),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(
        req,
        "updatedStudents",
        engine.adjust_class_points(session, class_id, delta),
    )
}

fn handle_classes_detail(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match param_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match views::class_detail(store, class_id) {
        Some(detail) => ok(&req.id, json!(detail)),
        None => err(&req.id, "not_found", "class not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.rename" => Some(handle_classes_rename(state, req)),
        "classes.adjustPoints" => Some(handle_classes_adjust_points(state, req)),
        "classes.detail" => Some(handle_classes_detail(state, req)),
        _ => None,
    }
}

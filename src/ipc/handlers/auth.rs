use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{gate_err, opt_str, param_str};
use crate::ipc::types::{AppState, Gate, Request};
use crate::sync::LoadReport;
use serde_json::json;

fn gate<'a>(state: &'a mut AppState, req: &Request) -> Result<&'a mut Gate, serde_json::Value> {
    state
        .gate
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn signed_in(req: &Request, gate: &Gate, report: LoadReport) -> serde_json::Value {
    let failures: Vec<_> = report
        .fetch_failures
        .iter()
        .map(|f| json!({ "table": f.table, "message": f.message }))
        .collect();
    ok(
        &req.id,
        json!({
            "session": gate.session(),
            "seededClasses": report.seeded_classes,
            "fetchFailures": failures,
        }),
    )
}

fn handle_sign_up(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (email, password) = match (param_str(req, "email"), param_str(req, "password")) {
        (Ok(e), Ok(p)) => (e, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let gate = match gate(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match gate.sign_up(email, password) {
        Ok(report) => signed_in(req, gate, report),
        Err(e) => gate_err(&req.id, &e),
    }
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (email, password) = match (param_str(req, "email"), param_str(req, "password")) {
        (Ok(e), Ok(p)) => (e, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let gate = match gate(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match gate.sign_in(email, password) {
        Ok(report) => signed_in(req, gate, report),
        Err(e) => gate_err(&req.id, &e),
    }
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gate = match gate(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    gate.sign_out();
    ok(&req.id, json!({ "session": null }))
}

/// Current session; with `token`, resumes that session first.
fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = match opt_str(req, "token") {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let gate = match gate(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match token {
        Some(token) => match gate.restore(token) {
            Ok(report) => signed_in(req, gate, report),
            Err(e) => gate_err(&req.id, &e),
        },
        None => ok(&req.id, json!({ "session": gate.session() })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signUp" => Some(handle_sign_up(state, req)),
        "auth.signIn" => Some(handle_sign_in(state, req)),
        "auth.signOut" => Some(handle_sign_out(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}

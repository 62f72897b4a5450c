use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{
    authed, authed_store, opt_bool, opt_f64, opt_str, outcome, param_bool, param_str,
    param_str_list,
};
use crate::ipc::types::{AppState, Request};
use crate::remote::AssignmentPatch;
use crate::sync::{NewAssignment, SubmissionChange};
use crate::views;
use serde_json::json;

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match opt_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let assignments: Vec<_> = match class_id {
        Some(cid) => views::assignments_for_class(store, cid),
        None => store.assignments.iter().collect(),
    };
    ok(&req.id, json!({ "assignments": assignments }))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let title = match param_str(req, "title") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_ids = match param_str_list(req, "classIds") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let total_points = match opt_f64(req, "totalPoints") {
        Ok(Some(v)) => v,
        Ok(None) => {
            let Some(conn) = state.db.as_ref() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            match setup::dashboard_defaults(conn) {
                Ok(d) => d.assignment_points,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            }
        }
        Err(resp) => return resp,
    };
    let new = NewAssignment {
        title: title.to_string(),
        total_points,
        class_ids,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "assignment", engine.add_assignment(session, new))
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let assignment_id = match param_str(req, "assignmentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (title, total_points) = match (opt_str(req, "title"), opt_f64(req, "totalPoints")) {
        (Ok(t), Ok(p)) => (t, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let patch = AssignmentPatch {
        title: title.map(|s| s.to_string()),
        total_points,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(
        req,
        "assignment",
        engine.update_assignment(session, assignment_id, patch),
    )
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let assignment_id = match param_str(req, "assignmentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "deleted", engine.delete_assignment(session, assignment_id))
}

fn handle_submissions_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (assignment_id, student_id) =
        match (param_str(req, "assignmentId"), param_str(req, "studentId")) {
            (Ok(a), Ok(s)) => (a, s),
            (Err(resp), _) | (_, Err(resp)) => return resp,
        };

    // Exactly one of `submitted` or `grade` per call.
    let (submitted, grade) = match (opt_bool(req, "submitted"), opt_f64(req, "grade")) {
        (Ok(s), Ok(g)) => (s, g),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let change = match (submitted, grade) {
        (Some(b), None) => SubmissionChange::Submitted(b),
        (None, Some(g)) => SubmissionChange::Grade(g),
        _ => {
            return err(
                &req.id,
                "bad_params",
                "provide exactly one of submitted or grade",
                None,
            )
        }
    };

    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(
        req,
        "submission",
        engine.set_submission(session, assignment_id, student_id, change),
    )
}

fn handle_submissions_set_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (assignment_id, class_id) = match (param_str(req, "assignmentId"), param_str(req, "classId"))
    {
        (Ok(a), Ok(c)) => (a, c),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let checked = match param_bool(req, "checked") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(
        req,
        "updatedCount",
        engine.set_all_submitted(session, assignment_id, class_id, checked),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        "submissions.set" => Some(handle_submissions_set(state, req)),
        "submissions.setAllForClass" => Some(handle_submissions_set_all(state, req)),
        _ => None,
    }
}

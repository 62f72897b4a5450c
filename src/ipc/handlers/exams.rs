use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{
    authed, authed_store, opt_f64, opt_str, outcome, param_f64, param_str, param_str_list,
};
use crate::ipc::types::{AppState, Request};
use crate::remote::ExamPatch;
use crate::sync::NewExam;
use crate::views;
use serde_json::json;

fn handle_exams_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match opt_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let exams: Vec<_> = match class_id {
        Some(cid) => views::exams_for_class(store, cid),
        None => store.exams.iter().collect(),
    };
    ok(&req.id, json!({ "exams": exams }))
}

fn handle_exams_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let title = match param_str(req, "title") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let class_ids = match param_str_list(req, "classIds") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let max_score = match opt_f64(req, "maxScore") {
        Ok(Some(v)) => v,
        Ok(None) => {
            let Some(conn) = state.db.as_ref() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            match setup::dashboard_defaults(conn) {
                Ok(d) => d.exam_max_score,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            }
        }
        Err(resp) => return resp,
    };
    let new = NewExam {
        title: title.to_string(),
        max_score,
        class_ids,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "exam", engine.add_exam(session, new))
}

fn handle_exams_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let exam_id = match param_str(req, "examId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (title, max_score) = match (opt_str(req, "title"), opt_f64(req, "maxScore")) {
        (Ok(t), Ok(m)) => (t, m),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let patch = ExamPatch {
        title: title.map(|s| s.to_string()),
        max_score,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "exam", engine.update_exam(session, exam_id, patch))
}

fn handle_exams_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let exam_id = match param_str(req, "examId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "deleted", engine.delete_exam(session, exam_id))
}

fn handle_exam_results_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (exam_id, student_id) = match (param_str(req, "examId"), param_str(req, "studentId")) {
        (Ok(e), Ok(s)) => (e, s),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let score = match param_f64(req, "score") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(
        req,
        "result",
        engine.set_exam_score(session, exam_id, student_id, score),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.list" => Some(handle_exams_list(state, req)),
        "exams.create" => Some(handle_exams_create(state, req)),
        "exams.update" => Some(handle_exams_update(state, req)),
        "exams.delete" => Some(handle_exams_delete(state, req)),
        "examResults.set" => Some(handle_exam_results_set(state, req)),
        _ => None,
    }
}

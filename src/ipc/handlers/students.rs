use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{authed, authed_store, opt_str, outcome, param_f64, param_str};
use crate::ipc::types::{AppState, Request};
use crate::remote::StudentPatch;
use crate::sync::NewStudent;
use crate::views;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match opt_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let students: Vec<_> = match class_id {
        Some(cid) => store.students_in_class(cid).collect(),
        None => store.students.iter().collect(),
    };
    ok(&req.id, json!({ "students": students }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (class_id, name) = match (param_str(req, "classId"), param_str(req, "name")) {
        (Ok(c), Ok(n)) => (c, n),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let (form_class, photo_url) = match (opt_str(req, "formClass"), opt_str(req, "photoUrl")) {
        (Ok(f), Ok(p)) => (f, p),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let new = NewStudent {
        class_id: class_id.to_string(),
        name: name.to_string(),
        form_class: form_class.unwrap_or_default().to_string(),
        photo_url: photo_url.map(|s| s.to_string()),
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "student", engine.add_student(session, new))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match param_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (name, form_class) = match (opt_str(req, "name"), opt_str(req, "formClass")) {
        (Ok(n), Ok(f)) => (n, f),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let patch = StudentPatch {
        name: name.map(|s| s.to_string()),
        form_class: form_class.map(|s| s.to_string()),
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "student", engine.update_student(session, student_id, patch))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match param_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(req, "deleted", engine.delete_student(session, student_id))
}

fn handle_students_adjust_points(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (student_id, delta) = match (param_str(req, "studentId"), param_f64(req, "delta")) {
        (Ok(s), Ok(d)) => (s, d),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let (session, engine) = match authed(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    outcome(
        req,
        "student",
        engine.adjust_manual_points(session, student_id, delta),
    )
}

fn handle_students_exam_profile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match param_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    if store.student(student_id).is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }
    ok(
        &req.id,
        json!({ "exams": views::student_exam_profile(store, student_id) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.adjustPoints" => Some(handle_students_adjust_points(state, req)),
        "students.examProfile" => Some(handle_students_exam_profile(state, req)),
        _ => None,
    }
}

use crate::ipc::helpers::authed_store;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::views;
use serde_json::json;

fn handle_dashboard_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    ok(
        &req.id,
        json!({
            "totals": views::totals(store),
            "leaderboard": views::leaderboard(store),
            "classPerformance": views::class_performance(store),
            "classAssignmentCounts": views::class_assignment_counts(store),
            "assignmentStats": views::assignment_stats(store),
        }),
    )
}

fn handle_leaderboard_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = match req.params.get("limit") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_u64() {
            Some(n) => Some(n as usize),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "limit must be a non-negative integer",
                    None,
                )
            }
        },
    };
    let store = match authed_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let mut board = views::leaderboard(store);
    if let Some(n) = limit {
        board.truncate(n);
    }
    let rows: Vec<_> = board
        .iter()
        .enumerate()
        .map(|(i, s)| {
            json!({
                "rank": i + 1,
                "studentId": s.id,
                "name": s.name,
                "classId": s.class_id,
                "className": store.class(&s.class_id).map(|c| c.name.as_str()),
                "points": s.points,
                "assignmentsCompleted": s.assignments_completed,
            })
        })
        .collect();
    ok(&req.id, json!({ "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.get" => Some(handle_dashboard_get(state, req)),
        "leaderboard.get" => Some(handle_leaderboard_get(state, req)),
        _ => None,
    }
}

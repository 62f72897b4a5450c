mod test_support;

use serde_json::json;
use test_support::{
    error_code, first_class_id, request, request_applied, request_ok, signed_in_sidecar,
};

#[test]
fn class_and_student_lifecycle() {
    let (_child, mut stdin, mut reader, _ws) = signed_in_sidecar("gradebook-students");
    let class_id = first_class_id(&mut stdin, &mut reader);

    let renamed = request_applied(
        &mut stdin,
        &mut reader,
        "1",
        "classes.rename",
        json!({ "classId": class_id, "name": "  Homeroom  " }),
    );
    assert_eq!(renamed["class"]["name"], json!("Homeroom"));

    let refused = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "classId": class_id, "name": "   " }),
    );
    assert_eq!(refused["applied"], json!(false));
    assert!(refused["reason"].is_string());

    let ana = request_applied(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "classId": class_id, "name": "Ana", "formClass": "7B" }),
    );
    let ana_id = ana["student"]["id"].as_str().expect("id").to_string();
    assert_eq!(ana["student"]["points"], json!(0.0));
    assert_eq!(ana["student"]["formClass"], json!("7B"));

    let ben = request_applied(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "classId": class_id, "name": "Ben" }),
    );
    let ben_id = ben["student"]["id"].as_str().expect("id").to_string();

    let bumped = request_applied(
        &mut stdin,
        &mut reader,
        "5",
        "students.adjustPoints",
        json!({ "studentId": ana_id, "delta": 10 }),
    );
    assert_eq!(bumped["student"]["manualPoints"], json!(10.0));
    assert_eq!(bumped["student"]["points"], json!(10.0));

    let class_wide = request_applied(
        &mut stdin,
        &mut reader,
        "6",
        "classes.adjustPoints",
        json!({ "classId": class_id, "delta": 2 }),
    );
    assert_eq!(class_wide["updatedStudents"], json!(2));

    let updated = request_applied(
        &mut stdin,
        &mut reader,
        "7",
        "students.update",
        json!({ "studentId": ben_id, "name": "Benjamin" }),
    );
    assert_eq!(updated["student"]["name"], json!("Benjamin"));
    assert_eq!(updated["student"]["points"], json!(2.0));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "students.list",
        json!({ "classId": class_id }),
    );
    let students = listed["students"].as_array().expect("students");
    assert_eq!(students.len(), 2);
    assert_eq!(students[0]["points"], json!(12.0));

    let _ = request_applied(
        &mut stdin,
        &mut reader,
        "9",
        "students.delete",
        json!({ "studentId": ana_id }),
    );
    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "classes.detail",
        json!({ "classId": class_id }),
    );
    assert_eq!(detail["students"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(detail["class"]["name"], json!("Homeroom"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "11",
        "classes.detail",
        json!({ "classId": "nope" }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));

    let gone = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "students.delete",
        json!({ "studentId": ana_id }),
    );
    assert_eq!(gone["applied"], json!(false));
}

#[test]
fn empty_class_points_are_refused() {
    let (_child, mut stdin, mut reader, _ws) = signed_in_sidecar("gradebook-class-points");
    let created = request_applied(
        &mut stdin,
        &mut reader,
        "1",
        "classes.create",
        json!({ "name": "Empty" }),
    );
    let class_id = created["class"]["id"].as_str().expect("id").to_string();
    let resp = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classes.adjustPoints",
        json!({ "classId": class_id, "delta": 5 }),
    );
    assert_eq!(resp["applied"], json!(false));
}

#[test]
fn points_recover_after_a_concurrent_write() {
    let (_child, mut stdin, mut reader, workspace) = signed_in_sidecar("gradebook-points-conflict");
    let class_id = first_class_id(&mut stdin, &mut reader);
    let created = request_applied(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "classId": class_id, "name": "Ana" }),
    );
    let ana = created["student"]["id"].as_str().expect("id").to_string();

    // Another client writes the same row behind this sidecar's back.
    let conn = rusqlite::Connection::open(workspace.join("gradebook.sqlite3")).expect("open db");
    conn.execute(
        "UPDATE students SET manual_points = 7, version = version + 1 WHERE id = ?",
        [&ana],
    )
    .expect("concurrent write");
    drop(conn);

    let stale = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.adjustPoints",
        json!({ "studentId": ana, "delta": 1 }),
    );
    assert_eq!(error_code(&stale), Some("remote_write_failed"));
    assert_eq!(stale["error"]["details"]["remoteCode"], json!("remote_conflict"));

    let fresh = request_applied(
        &mut stdin,
        &mut reader,
        "3",
        "students.adjustPoints",
        json!({ "studentId": ana, "delta": 1 }),
    );
    assert_eq!(fresh["student"]["manualPoints"], json!(8.0));

    let class_wide = request_applied(
        &mut stdin,
        &mut reader,
        "4",
        "classes.adjustPoints",
        json!({ "classId": class_id, "delta": 2 }),
    );
    assert_eq!(class_wide["updatedStudents"], json!(1));
}

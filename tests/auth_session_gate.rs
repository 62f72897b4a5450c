mod test_support;

use serde_json::json;
use test_support::{error_code, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn entity_methods_need_workspace_then_session() {
    let workspace = temp_dir("gradebook-auth-gate");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "classes.list", json!({}));
    assert_eq!(error_code(&resp), Some("no_workspace"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let resp = request(&mut stdin, &mut reader, "3", "classes.list", json!({}));
    assert_eq!(error_code(&resp), Some("not_authenticated"));
    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "classes.create",
        json!({ "name": "Class 12-C" }),
    );
    assert_eq!(error_code(&resp), Some("not_authenticated"));

    let health = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));
    assert_eq!(health["authenticated"], json!(false));
}

#[test]
fn sign_up_seeds_and_sign_out_clears() {
    let workspace = temp_dir("gradebook-auth-seed");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let weak = request(
        &mut stdin,
        &mut reader,
        "2",
        "auth.signUp",
        json!({ "email": "t@school.org", "password": "abc" }),
    );
    assert_eq!(error_code(&weak), Some("weak_password"));

    let signed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.signUp",
        json!({ "email": " T@School.org ", "password": "hunter22" }),
    );
    assert_eq!(signed["seededClasses"], json!(3));
    assert_eq!(signed["session"]["email"], json!("t@school.org"));
    let token = signed["session"]["accessToken"]
        .as_str()
        .expect("token")
        .to_string();

    let listed = request_ok(&mut stdin, &mut reader, "4", "classes.list", json!({}));
    let names: Vec<&str> = listed["classes"]
        .as_array()
        .expect("classes")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Class 10-A", "Class 10-B", "Class 11-A"]);

    let _ = request_ok(&mut stdin, &mut reader, "5", "auth.signOut", json!({}));
    let resp = request(&mut stdin, &mut reader, "6", "classes.list", json!({}));
    assert_eq!(error_code(&resp), Some("not_authenticated"));

    // The revoked token no longer resumes.
    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "auth.session",
        json!({ "token": token }),
    );
    assert_eq!(error_code(&resp), Some("session_not_found"));

    let bad = request(
        &mut stdin,
        &mut reader,
        "8",
        "auth.signIn",
        json!({ "email": "t@school.org", "password": "wrong-one" }),
    );
    assert_eq!(error_code(&bad), Some("invalid_credentials"));

    // Seeding happens once per account.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "auth.signIn",
        json!({ "email": "t@school.org", "password": "hunter22" }),
    );
    assert_eq!(again["seededClasses"], json!(0));
    let listed = request_ok(&mut stdin, &mut reader, "10", "classes.list", json!({}));
    assert_eq!(listed["classes"].as_array().map(|a| a.len()), Some(3));

    let current = request_ok(&mut stdin, &mut reader, "11", "auth.session", json!({}));
    assert_eq!(current["session"]["email"], json!("t@school.org"));
}

#[test]
fn session_token_resumes_in_a_new_process() {
    let workspace = temp_dir("gradebook-auth-resume");
    let token = {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let signed = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "auth.signUp",
            json!({ "email": "t@school.org", "password": "hunter22" }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "classes.create",
            json!({ "name": "Robotics Club" }),
        );
        signed["session"]["accessToken"]
            .as_str()
            .expect("token")
            .to_string()
    };

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let resumed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.session",
        json!({ "token": token }),
    );
    assert_eq!(resumed["session"]["email"], json!("t@school.org"));
    let listed = request_ok(&mut stdin, &mut reader, "3", "classes.list", json!({}));
    assert!(listed["classes"]
        .as_array()
        .expect("classes")
        .iter()
        .any(|c| c["name"] == json!("Robotics Club")));
}

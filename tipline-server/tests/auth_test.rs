//! Tests for sign-up, sign-in and sign-out

mod common;

use serde_json::{json, Value};

use common::{create_test_server, SESSION_COOKIE};

/// Test: sign-up creates a participant and signs them in
#[tokio::test]
async fn test_sign_up_sets_session() {
    let (server, _, _) = create_test_server();

    let response = server
        .post("/sign-up.json")
        .json(&json!({"username": "alice", "password": "hunter2hunter2"}))
        .await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], "alice");

    let session = response.cookie(SESSION_COOKIE);
    let response = server
        .get("/alice/emails.json")
        .add_cookie(session)
        .await;
    assert_eq!(response.status_code(), 200);
}

/// Test: usernames are unique regardless of case
#[tokio::test]
async fn test_sign_up_username_taken() {
    let (server, _, _) = create_test_server();

    server
        .post("/sign-up.json")
        .json(&json!({"username": "alice", "password": "hunter2hunter2"}))
        .await;

    let response = server
        .post("/sign-up.json")
        .json(&json!({"username": "ALICE", "password": "hunter2hunter2"}))
        .await;
    assert_eq!(response.status_code(), 409);
}

/// Test: password length bounds
#[tokio::test]
async fn test_sign_up_password_length() {
    let (server, _, _) = create_test_server();

    let response = server
        .post("/sign-up.json")
        .json(&json!({"username": "alice", "password": "short"}))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/sign-up.json")
        .json(&json!({"username": "alice", "password": "x".repeat(81)}))
        .await;
    assert_eq!(response.status_code(), 400);
}

/// Test: invalid usernames are rejected
#[tokio::test]
async fn test_sign_up_invalid_username() {
    let (server, _, _) = create_test_server();

    let too_long = "a".repeat(33);
    for username in ["", "has space", "<script>", too_long.as_str()] {
        let response = server
            .post("/sign-up.json")
            .json(&json!({"username": username, "password": "hunter2hunter2"}))
            .await;
        assert_eq!(response.status_code(), 400, "username {username:?}");
    }
}

/// Test: sign-in checks the password
#[tokio::test]
async fn test_sign_in() {
    let (server, _, _) = create_test_server();

    server
        .post("/sign-up.json")
        .json(&json!({"username": "alice", "password": "hunter2hunter2"}))
        .await;

    let response = server
        .post("/sign-in.json")
        .json(&json!({"username": "alice", "password": "wrong password"}))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .post("/sign-in.json")
        .json(&json!({"username": "nobody", "password": "hunter2hunter2"}))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .post("/sign-in.json")
        .json(&json!({"username": "Alice", "password": "hunter2hunter2"}))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response.maybe_cookie(SESSION_COOKIE).is_some());
}

/// Test: sign-out ends the session
#[tokio::test]
async fn test_sign_out() {
    let (server, state, _) = create_test_server();
    let (_, session) = common::make_participant(&state, "alice", true);

    let response = server
        .post("/sign-out.json")
        .add_cookie(common::session_cookie(&session))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server
        .get("/alice/emails.json")
        .add_cookie(common::session_cookie(&session))
        .await;
    assert_eq!(response.status_code(), 403);
}

//! End-to-end tests for signup, login and logout

mod common;

use common::{json_body, TestClient, TestServer, ADMIN_EMAIL, ADMIN_PASS, VIEWER_EMAIL};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_first_signup_becomes_admin_later_ones_viewers() {
    let server = TestServer::spawn_empty().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.signup("first@example.com", "firstpass").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], 201);
    assert_eq!(body["message"], "User created successfully.");

    let response = client.signup("second@example.com", "secondpass").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let admin =
        TestClient::authenticated_as(server.base_url.clone(), "first@example.com", "firstpass")
            .await;
    let response = admin.list_users(&[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for user in users {
        let expected = if user["email"] == "first@example.com" {
            "admin"
        } else {
            "viewer"
        };
        assert_eq!(user["role"], expected);
        assert!(user.get("password").is_none());
    }

    let second =
        TestClient::authenticated_as(server.base_url.clone(), "second@example.com", "secondpass")
            .await;
    let response = second.list_users(&[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_signup_duplicate_email_is_conflict() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.signup(VIEWER_EMAIL, "anotherpass").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Email already exists.");

    // Normalized before comparison
    let response = client.signup(" Viewer@Example.com ", "anotherpass").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_missing_field_is_bad_request() {
    let server = TestServer::spawn_empty().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .signup_with_body(json!({ "email": "someone@example.com" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.signup_with_body(json!({ "password": "whatever" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.signup("not-an-email", "whatever1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_returns_token() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(ADMIN_EMAIL, ADMIN_PASS).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Login successful");
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn test_login_failures_look_alike() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let wrong_password = client.login(ADMIN_EMAIL, "not-the-password").await;
    assert_eq!(wrong_password.status(), StatusCode::NOT_FOUND);
    let wrong_password = json_body(wrong_password).await;

    let unknown_email = client.login("nobody@example.com", ADMIN_PASS).await;
    assert_eq!(unknown_email.status(), StatusCode::NOT_FOUND);
    let unknown_email = json_body(unknown_email).await;

    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
async fn test_login_missing_field_is_bad_request() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(ADMIN_EMAIL, "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Bad Request, Reason: password missing");
}

#[tokio::test]
async fn test_logout() {
    let server = TestServer::spawn().await;

    let anonymous = TestClient::new(server.base_url.clone());
    let response = anonymous.logout().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Unauthorized Access");

    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;
    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "User logged out successfully.");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::new(server.base_url.clone());
    client.token = Some("definitely.not.valid".to_string());

    let response = client.list_artists(&[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_unauthorized() {
    let server = TestServer::spawn().await;
    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    let viewer = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = admin.list_users(&[("role", "viewer")]).await;
    let body = json_body(response).await;
    let viewer_id = body["data"][0]["user_id"].as_str().unwrap().to_string();

    let response = admin.delete_user(&viewer_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = viewer.list_artists(&[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

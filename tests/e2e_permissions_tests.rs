//! End-to-end tests for the role matrix
//!
//! Viewers read, editors also write the catalog, admins also delete artists
//! and albums and manage accounts.

mod common;

use common::{json_body, TestClient, TestServer, ARTIST_1_NAME};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_anonymous_requests_are_unauthorized() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    assert_eq!(
        client.list_artists(&[]).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client.get_album(&server.catalog.album_1).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client.delete_track(&server.catalog.track_1).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client.list_favorites("artist", &[]).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_viewer_can_read_catalog() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    assert_eq!(client.list_artists(&[]).await.status(), StatusCode::OK);
    assert_eq!(client.list_albums(&[]).await.status(), StatusCode::OK);
    assert_eq!(client.list_tracks(&[]).await.status(), StatusCode::OK);

    let response = client.get_artist(&server.catalog.artist_1).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["name"], ARTIST_1_NAME);
}

#[tokio::test]
async fn test_viewer_cannot_create_artist() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = client
        .create_artist(json!({ "name": "Sneaky", "grammy": 1, "hidden": false }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Forbidden Access");

    // Nothing was written
    let response = client.list_artists(&[("limit", "100")]).await;
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_viewer_cannot_update_catalog() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = client
        .update_album(&server.catalog.album_1, json!({ "year": 2002 }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .update_track(&server.catalog.track_1, json!({ "duration": 10 }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_viewer_can_delete_track() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = client.delete_track(&server.catalog.track_1).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_editor_writes_but_cannot_delete_artists_or_albums() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_editor(server.base_url.clone()).await;

    let response = client
        .create_artist(json!({ "name": "Editor Pick", "grammy": 0, "hidden": false }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .update_artist(&server.catalog.artist_2, json!({ "grammy": 7 }))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.delete_artist(&server.catalog.artist_2).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.delete_album(&server.catalog.album_2).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.get_album(&server.catalog.album_2).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_only_admin_manages_users() {
    let server = TestServer::spawn().await;

    for client in [
        TestClient::authenticated_viewer(server.base_url.clone()).await,
        TestClient::authenticated_editor(server.base_url.clone()).await,
    ] {
        assert_eq!(client.list_users(&[]).await.status(), StatusCode::FORBIDDEN);
        let response = client
            .add_user(json!({ "email": "new@example.com", "password": "newpass123" }))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let admin = TestClient::authenticated_admin(server.base_url.clone()).await;
    assert_eq!(admin.list_users(&[]).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_viewer_cannot_add_favorites() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = client
        .add_favorite("artist", &server.catalog.artist_1)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.list_favorites("artist", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_role_checked_before_body() {
    let server = TestServer::spawn().await;
    let viewer = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = viewer.create_artist(json!({ "grammy": "lots" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = viewer
        .update_track(&server.catalog.track_1, json!({ "duration": "long" }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = viewer.add_favorite_with_body(json!({ "category": 5 })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = viewer.add_user(json!({ "email": ["x"] })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = viewer.list_users(&[("limit", "many")]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // An editor gets past the gate and sees the body error
    let editor = TestClient::authenticated_editor(server.base_url.clone()).await;
    let response = editor.create_artist(json!({ "grammy": "lots" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all catalog-server endpoints.
//!
//! When API routes or request formats change, update only this file.
#![allow(dead_code)]

use super::constants::*;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{json, Value};
use std::time::Duration;

const API: &str = "/api/v1";

/// HTTP test client carrying an optional bearer token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Access token sent as `Authorization: Bearer ...`
    pub token: Option<String>,
}

/// Reads the response body as JSON, panicking on anything else.
pub async fn json_body(response: Response) -> Value {
    let text = response.text().await.expect("Failed to read response body");
    serde_json::from_str(&text)
        .unwrap_or_else(|err| panic!("Response is not JSON ({}): {}", err, text))
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    /// For most tests, use one of the `authenticated_*` constructors instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client holding the token of the given account
    ///
    /// # Panics
    ///
    /// Panics if the login fails (indicates test infrastructure problem).
    pub async fn authenticated_as(base_url: String, email: &str, password: &str) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Authentication of {} failed",
            email
        );
        let body = json_body(response).await;
        let token = body["data"]["token"]
            .as_str()
            .expect("Login response carries no token")
            .to_string();
        client.token = Some(token);

        client
    }

    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_EMAIL, ADMIN_PASS).await
    }

    pub async fn authenticated_editor(base_url: String) -> Self {
        Self::authenticated_as(base_url, EDITOR_EMAIL, EDITOR_PASS).await
    }

    pub async fn authenticated_viewer(base_url: String) -> Self {
        Self::authenticated_as(base_url, VIEWER_EMAIL, VIEWER_PASS).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}{}", self.base_url, API, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder, what: &str) -> Response {
        builder
            .send()
            .await
            .unwrap_or_else(|err| panic!("{} request failed: {}", what, err))
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /api/v1/signup
    pub async fn signup(&self, email: &str, password: &str) -> Response {
        self.signup_with_body(json!({ "email": email, "password": password }))
            .await
    }

    /// POST /api/v1/signup with an arbitrary body
    pub async fn signup_with_body(&self, body: Value) -> Response {
        Self::send(self.request(Method::POST, "/signup").json(&body), "Signup").await
    }

    /// POST /api/v1/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        let body = json!({ "email": email, "password": password });
        Self::send(self.request(Method::POST, "/login").json(&body), "Login").await
    }

    /// GET /api/v1/logout
    pub async fn logout(&self) -> Response {
        Self::send(self.request(Method::GET, "/logout"), "Logout").await
    }

    // ========================================================================
    // Catalog Endpoints
    // ========================================================================

    /// GET /api/v1/{kind}s with query parameters, kind is artist, album or track
    pub async fn list(&self, kind: &str, query: &[(&str, &str)]) -> Response {
        let builder = self.request(Method::GET, &format!("/{}s", kind)).query(query);
        Self::send(builder, "List").await
    }

    /// GET /api/v1/{kind}s/{id}
    pub async fn get(&self, kind: &str, id: &str) -> Response {
        Self::send(self.request(Method::GET, &format!("/{}s/{}", kind, id)), "Get").await
    }

    /// POST /api/v1/{kind}s/add-{kind}
    pub async fn create(&self, kind: &str, body: Value) -> Response {
        let builder = self
            .request(Method::POST, &format!("/{}s/add-{}", kind, kind))
            .json(&body);
        Self::send(builder, "Create").await
    }

    /// PUT /api/v1/{kind}s/{id}
    pub async fn update(&self, kind: &str, id: &str, body: Value) -> Response {
        let builder = self
            .request(Method::PUT, &format!("/{}s/{}", kind, id))
            .json(&body);
        Self::send(builder, "Update").await
    }

    /// DELETE /api/v1/{kind}s/{id}
    pub async fn delete(&self, kind: &str, id: &str) -> Response {
        Self::send(
            self.request(Method::DELETE, &format!("/{}s/{}", kind, id)),
            "Delete",
        )
        .await
    }

    pub async fn list_artists(&self, query: &[(&str, &str)]) -> Response {
        self.list("artist", query).await
    }

    pub async fn get_artist(&self, id: &str) -> Response {
        self.get("artist", id).await
    }

    pub async fn create_artist(&self, body: Value) -> Response {
        self.create("artist", body).await
    }

    pub async fn update_artist(&self, id: &str, body: Value) -> Response {
        self.update("artist", id, body).await
    }

    pub async fn delete_artist(&self, id: &str) -> Response {
        self.delete("artist", id).await
    }

    pub async fn list_albums(&self, query: &[(&str, &str)]) -> Response {
        self.list("album", query).await
    }

    pub async fn get_album(&self, id: &str) -> Response {
        self.get("album", id).await
    }

    pub async fn create_album(&self, body: Value) -> Response {
        self.create("album", body).await
    }

    pub async fn update_album(&self, id: &str, body: Value) -> Response {
        self.update("album", id, body).await
    }

    pub async fn delete_album(&self, id: &str) -> Response {
        self.delete("album", id).await
    }

    pub async fn list_tracks(&self, query: &[(&str, &str)]) -> Response {
        self.list("track", query).await
    }

    pub async fn get_track(&self, id: &str) -> Response {
        self.get("track", id).await
    }

    pub async fn create_track(&self, body: Value) -> Response {
        self.create("track", body).await
    }

    pub async fn update_track(&self, id: &str, body: Value) -> Response {
        self.update("track", id, body).await
    }

    pub async fn delete_track(&self, id: &str) -> Response {
        self.delete("track", id).await
    }

    // ========================================================================
    // Favorites Endpoints
    // ========================================================================

    /// GET /api/v1/favorites/{category}
    pub async fn list_favorites(&self, category: &str, query: &[(&str, &str)]) -> Response {
        let builder = self
            .request(Method::GET, &format!("/favorites/{}", category))
            .query(query);
        Self::send(builder, "List favorites").await
    }

    /// POST /api/v1/favorites/add-favorite
    pub async fn add_favorite(&self, category: &str, item_id: &str) -> Response {
        self.add_favorite_with_body(json!({ "category": category, "item_id": item_id }))
            .await
    }

    pub async fn add_favorite_with_body(&self, body: Value) -> Response {
        let builder = self
            .request(Method::POST, "/favorites/add-favorite")
            .json(&body);
        Self::send(builder, "Add favorite").await
    }

    /// DELETE /api/v1/favorites/remove-favorite/{id}
    pub async fn remove_favorite(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::DELETE, &format!("/favorites/remove-favorite/{}", id)),
            "Remove favorite",
        )
        .await
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /api/v1/users
    pub async fn list_users(&self, query: &[(&str, &str)]) -> Response {
        Self::send(self.request(Method::GET, "/users").query(query), "List users").await
    }

    /// POST /api/v1/users/add-user
    pub async fn add_user(&self, body: Value) -> Response {
        let builder = self.request(Method::POST, "/users/add-user").json(&body);
        Self::send(builder, "Add user").await
    }

    /// PUT /api/v1/users/update-password/{id}
    pub async fn update_password(&self, id: &str, old: &str, new: &str) -> Response {
        self.update_password_with_body(id, json!({ "old_password": old, "new_password": new }))
            .await
    }

    /// PUT /api/v1/users/update-password/{id} with an arbitrary body
    pub async fn update_password_with_body(&self, id: &str, body: Value) -> Response {
        let builder = self
            .request(Method::PUT, &format!("/users/update-password/{}", id))
            .json(&body);
        Self::send(builder, "Update password").await
    }

    /// PUT /api/v1/users/{id}
    pub async fn update_user(&self, id: &str, body: Value) -> Response {
        let builder = self
            .request(Method::PUT, &format!("/users/{}", id))
            .json(&body);
        Self::send(builder, "Update user").await
    }

    /// DELETE /api/v1/users/{id}
    pub async fn delete_user(&self, id: &str) -> Response {
        Self::send(
            self.request(Method::DELETE, &format!("/users/{}", id)),
            "Delete user",
        )
        .await
    }
}

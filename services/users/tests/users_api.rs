//! HTTP tests for the users service
//!
//! These drive the full router (guards included) over the in-memory store:
//! - status codes for every endpoint
//! - password never echoed
//! - token and role enforcement

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()

use users::{
    AppState, create_router,
    jwt::{Claims, JwtConfig, JwtService},
    models::{CreateUser, Role, UserResponse},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{InMemoryUserStore, UserStore},
};

const SECRET: &str = "integration-test-secret-0123456789abcdef";

struct TestApp {
    router: Router,
    state: AppState,
    admin_token: String,
    user_token: String,
    seed: Vec<UserResponse>,
}

fn seed_input(username: &str, first: &str, last: &str, roles: Option<BTreeSet<Role>>) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        password: format!("{username}-password"),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{username}@example.com"),
        roles,
    }
}

async fn spawn_app() -> TestApp {
    let store: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let jwt = JwtService::new(&JwtConfig {
        secret: SECRET.to_string(),
        expiry_seconds: 600,
    })
    .unwrap();
    let limiter = RateLimiter::new(RateLimiterConfig {
        max_attempts: 3,
        window_seconds: 300,
        lockout_seconds: 600,
    });
    let state = AppState::new(store, jwt, limiter);

    let mut seed = Vec::new();
    for input in [
        seed_input(
            "admin",
            "Alice",
            "Admin",
            Some(BTreeSet::from([Role::Admin, Role::User])),
        ),
        seed_input("jdoe", "John", "Doe", None),
        seed_input("msmith", "Mary", "Smith", None),
    ] {
        seed.push(state.users.create(input).await.unwrap());
    }

    let admin_token = state.auth.login(&seed[0]).unwrap().access_token;
    let user_token = state.auth.login(&seed[1]).unwrap().access_token;

    TestApp {
        router: create_router(state.clone()),
        state,
        admin_token,
        user_token,
        seed,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> Response {
        self.send(method, uri, Some(&self.admin_token), body).await
    }
}

// Helper to parse JSON response body
async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn new_user_body() -> Value {
    json!({
        "username": "newcomer",
        "password": "newcomer-password",
        "firstName": "New",
        "lastName": "Comer",
        "email": "newcomer@example.com"
    })
}

fn assert_no_password(user: &Value) {
    let object = user.as_object().expect("user is an object");
    assert!(!object.contains_key("password"));
    assert!(!object.contains_key("passwordHash"));
}

#[tokio::test]
async fn test_create_returns_201_without_password() {
    let app = spawn_app().await;

    let response = app.admin("POST", "/users", Some(new_user_body())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let user = json_body(response).await;
    assert_eq!(user["id"], 4);
    assert_eq!(user["username"], "newcomer");
    assert_eq!(user["firstName"], "New");
    assert_eq!(user["lastName"], "Comer");
    assert_eq!(user["email"], "newcomer@example.com");
    assert_eq!(user["roles"], json!(["user"]));
    assert_no_password(&user);
}

#[tokio::test]
async fn test_create_duplicate_username_returns_400() {
    let app = spawn_app().await;

    let mut body = new_user_body();
    body["username"] = json!("jdoe");

    let response = app.admin("POST", "/users", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = json_body(response).await;
    assert!(error["error"].as_str().unwrap().contains("jdoe"));
}

#[tokio::test]
async fn test_create_with_bad_fields_returns_400() {
    let app = spawn_app().await;

    let mut bad_email = new_user_body();
    bad_email["email"] = json!("not-an-email");
    let response = app.admin("POST", "/users", Some(bad_email)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let missing_field = json!({ "username": "incomplete" });
    let response = app.admin("POST", "/users", Some(missing_field)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_role = new_user_body();
    bad_role["roles"] = json!(["superuser"]);
    let response = app.admin("POST", "/users", Some(bad_role)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_preserves_creation_order_without_passwords() {
    let app = spawn_app().await;

    let response = app.admin("GET", "/users", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let users = json_body(response).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 3);

    let usernames: Vec<&str> = users
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["admin", "jdoe", "msmith"]);

    let ids: Vec<i64> = users.iter().map(|u| u["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    users.iter().for_each(assert_no_password);
}

#[tokio::test]
async fn test_create_then_fetch_round_trip() {
    let app = spawn_app().await;

    let created = json_body(app.admin("POST", "/users", Some(new_user_body())).await).await;
    let id = created["id"].as_i64().unwrap();

    let response = app.admin("GET", &format!("/users/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let fetched = json_body(response).await;
    assert_eq!(fetched, created);

    let submitted = new_user_body();
    for field in ["username", "firstName", "lastName", "email"] {
        assert_eq!(fetched[field], submitted[field], "{field}");
    }
    assert_no_password(&fetched);
}

#[tokio::test]
async fn test_get_missing_or_malformed_id() {
    let app = spawn_app().await;

    let response = app.admin("GET", "/users/999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.admin("GET", "/users/abc", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_find_by_email() {
    let app = spawn_app().await;

    let response = app
        .admin("GET", "/users/byEMail?email=jdoe@example.com", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = json_body(response).await;
    assert_eq!(user["username"], "jdoe");
    assert_no_password(&user);

    let response = app
        .admin("GET", "/users/byEMail?email=nobody@example.com", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.admin("GET", "/users/byEMail", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_changes_only_given_fields() {
    let app = spawn_app().await;
    let before = &app.seed[1];

    let response = app
        .admin(
            "PATCH",
            &format!("/users/{}", before.id),
            Some(json!({ "firstName": "updated", "lastName": "updated" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let after: UserResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(after.first_name, "updated");
    assert_eq!(after.last_name, "updated");
    assert_eq!(after.username, before.username);
    assert_eq!(after.email, before.email);
    assert_eq!(after.roles, before.roles);
}

#[tokio::test]
async fn test_patch_password_changes_login() {
    let app = spawn_app().await;

    let response = app
        .admin(
            "PATCH",
            "/users/2",
            Some(json!({ "password": "brand-new-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_no_password(&json_body(response).await);

    let old = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "jdoe", "password": "jdoe-password" })),
        )
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "jdoe", "password": "brand-new-password" })),
        )
        .await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_patch_missing_user_returns_404() {
    let app = spawn_app().await;

    let response = app
        .admin("PATCH", "/users/999", Some(json!({ "firstName": "x" })))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_twice() {
    let app = spawn_app().await;

    let response = app.admin("DELETE", "/users/3", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());

    let response = app.admin("DELETE", "/users/3", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.admin("GET", "/users/3", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_and_remove_role_are_idempotent() {
    let app = spawn_app().await;

    let first = json_body(app.admin("POST", "/users/2/addRole/admin", None).await).await;
    assert_eq!(first["roles"], json!(["admin", "user"]));

    let response = app.admin("POST", "/users/2/addRole/admin", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["roles"], json!(["admin", "user"]));

    let removed = json_body(app.admin("POST", "/users/2/removeRole/admin", None).await).await;
    assert_eq!(removed["roles"], json!(["user"]));

    let response = app.admin("POST", "/users/2/removeRole/admin", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["roles"], json!(["user"]));
}

#[tokio::test]
async fn test_role_mutation_rejects_bad_role_and_missing_user() {
    let app = spawn_app().await;

    let response = app.admin("POST", "/users/2/addRole/superuser", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.admin("POST", "/users/2/removeRole/ADMIN", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.admin("POST", "/users/999/addRole/user", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guarded_routes_require_token() {
    let app = spawn_app().await;

    let routes = [
        ("POST", "/users", Some(new_user_body())),
        ("GET", "/users", None),
        ("GET", "/users/byEMail?email=jdoe@example.com", None),
        ("GET", "/users/1", None),
        ("PATCH", "/users/1", Some(json!({ "firstName": "x" }))),
        ("DELETE", "/users/1", None),
        ("POST", "/users/1/addRole/admin", None),
        ("POST", "/users/1/removeRole/admin", None),
        ("GET", "/auth/profile", None),
    ];

    for (method, uri, body) in routes {
        let response = app.send(method, uri, None, body.clone()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");

        let response = app.send(method, uri, Some("not-a-token"), body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    // Nothing was deleted by the rejected requests
    assert_eq!(app.state.users.find_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = spawn_app().await;

    let routes = [
        ("POST", "/users", Some(new_user_body())),
        ("GET", "/users", None),
        ("GET", "/users/1", None),
        ("DELETE", "/users/1", None),
        ("POST", "/users/2/addRole/admin", None),
    ];

    for (method, uri, body) in routes {
        let response = app.send(method, uri, Some(&app.user_token), body).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
    }

    let roles = app.state.users.find_by_id(2).await.unwrap().roles;
    assert_eq!(roles, BTreeSet::from([Role::User]));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = spawn_app().await;
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: 1,
        username: "admin".to_string(),
        iat: now - 7200,
        exp: now - 3600,
        jti: uuid::Uuid::new_v4(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let response = app.send("GET", "/users", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_granted_role_applies_to_existing_token() {
    let app = spawn_app().await;

    let response = app.send("GET", "/users", Some(&app.user_token), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.admin("POST", "/users/2/addRole/admin", None).await;

    let response = app.send("GET", "/users", Some(&app.user_token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let app = spawn_app().await;

    app.admin("DELETE", "/users/2", None).await;

    let response = app
        .send("GET", "/auth/profile", Some(&app.user_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_issues_usable_token() {
    let app = spawn_app().await;

    let response = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "admin-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = json_body(response).await;
    assert_eq!(token["token_type"], "Bearer");
    assert_eq!(token["expires_in"], 600);
    let access_token = token["access_token"].as_str().unwrap();

    let response = app.send("GET", "/users", Some(access_token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send("GET", "/auth/profile", Some(access_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let profile = json_body(response).await;
    assert_eq!(profile["username"], "admin");
    assert_no_password(&profile);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let response = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "ghost", "password": "whatever-pass" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send("POST", "/auth/login", None, Some(json!({ "username": "admin" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_locks_after_repeated_failures() {
    let app = spawn_app().await;
    let wrong = json!({ "username": "msmith", "password": "wrong-password" });

    for _ in 0..3 {
        let response = app
            .send("POST", "/auth/login", None, Some(wrong.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "msmith", "password": "msmith-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app
        .send(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "jdoe", "password": "jdoe-password" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let response = app.send("GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

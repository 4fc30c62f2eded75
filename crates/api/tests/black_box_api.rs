use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use warden_api::app::{AppServices, build_app};
use warden_api::config::BootstrapAdmin;
use warden_auth::{PasswordHasher, TokenConfig, TokenIssuer};
use warden_infra::{RecordingResetNotifier, Stores};

const ACCESS_SECRET: &str = "test-access-secret";
const REFRESH_SECRET: &str = "test-refresh-secret";
const ADMIN_EMAIL: &str = "root@example.com";
const ADMIN_PASSWORD: &str = "root-password";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    notifier: Arc<RecordingResetNotifier>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let stores = Stores::in_memory();
        let issuer = TokenIssuer::new(TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET)).unwrap();
        let notifier = Arc::new(RecordingResetNotifier::new());
        let services = Arc::new(AppServices::new(&stores, issuer, PasswordHasher::min_cost(), notifier.clone()));
        services
            .seed(Some(&BootstrapAdmin {
                email: ADMIN_EMAIL.into(),
                password: ADMIN_PASSWORD.into(),
            }))
            .await
            .unwrap();

        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            notifier,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self.client.delete(self.url(path)).bearer_auth(token).send().await.unwrap();
        (res.status(), res.json().await.unwrap_or(Value::Null))
    }

    /// Register and return `(user id, access token, refresh token)`.
    async fn register(&self, email: &str) -> (String, String, String) {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": email,
                    "password": "correct-horse",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let data = &body["data"];
        (
            data["user"]["id"].as_str().unwrap().to_string(),
            data["tokens"]["access_token"].as_str().unwrap().to_string(),
            data["tokens"]["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post("/auth/login", None, json!({ "email": email, "password": password }))
            .await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["tokens"]["access_token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = srv.get("/users", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_wrong_secret_is_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now().timestamp();
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": uuid::Uuid::now_v7(),
            "email": "mallory@example.com",
            "role_id": uuid::Uuid::now_v7(),
            "permissions": ["*:*"],
            "type": "access",
            "jti": uuid::Uuid::now_v7(),
            "iat": now,
            "exp": now + 600,
        }),
        &EncodingKey::from_secret(REFRESH_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt");

    let (status, _) = srv.get("/audit-logs", Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_issues_tokens_and_default_role() {
    let srv = TestServer::spawn().await;
    let (id, access, _) = srv.register("ada@example.com").await;

    let (status, body) = srv.get("/auth/me", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["role"]["name"], "user");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = srv
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Ada",
                "last_name": "Again",
                "email": "ADA@example.com",
                "password": "correct-horse",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn invalid_registration_lists_field_errors() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .post(
            "/auth/register",
            None,
            json!({ "first_name": "", "last_name": "L", "email": "nope", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"first_name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn self_registration_cannot_claim_super_role() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (_, body) = srv.get("/roles", Some(&admin)).await;
    let super_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "super-admin")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = srv
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Mallory",
                "last_name": "M",
                "email": "mallory@example.com",
                "password": "correct-horse",
                "role_id": super_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = srv.login("mallory@example.com", "correct-horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn overlong_password_is_rejected_at_registration() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "password": "x".repeat(73),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "password");
}

#[tokio::test]
async fn failed_login_is_uninformative_and_audited() {
    let srv = TestServer::spawn().await;
    srv.register("ada@example.com").await;

    let (wrong_password, body_a) = srv.login("ada@example.com", "wrong-password").await;
    let (unknown_user, body_b) = srv.login("nobody@example.com", "wrong-password").await;
    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a["message"], body_b["message"]);

    let admin = srv.admin_token().await;
    let (status, body) = srv.get("/audit-logs?action=LOGIN_FAILED", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|r| r["user_id"].is_null()));
    assert!(items.iter().any(|r| r["after"]["email"] == "ada@example.com"));
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
    let srv = TestServer::spawn().await;
    let (id, _, _) = srv.register("ada@example.com").await;
    let admin = srv.admin_token().await;

    let (status, body) = srv
        .put(&format!("/users/{id}/status"), &admin, json!({ "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, body) = srv.login("ada@example.com", "correct-horse").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn self_scoped_permissions_cover_own_record_only() {
    let srv = TestServer::spawn().await;
    let (ada, ada_token, _) = srv.register("ada@example.com").await;
    let (grace, _, _) = srv.register("grace@example.com").await;

    let (status, _) = srv.get(&format!("/users/{ada}"), Some(&ada_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv.get(&format!("/users/{grace}"), Some(&ada_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("users:read"));

    let (status, _) = srv.get("/users", Some(&ada_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv
        .put(&format!("/users/{ada}"), &ada_token, json!({ "bio": "Analyst" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bio"], "Analyst");

    let (status, _) = srv
        .put(&format!("/users/{grace}"), &ada_token, json!({ "bio": "Hacked" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refresh_rotates_pair_and_rejects_access_token() {
    let srv = TestServer::spawn().await;
    let (_, access, refresh) = srv.register("ada@example.com").await;

    let (status, body) = srv
        .post("/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());
    assert_ne!(body["data"]["refresh_token"], refresh.as_str());

    let (status, _) = srv
        .post("/auth/refresh", None, json!({ "refresh_token": access }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_is_single_use() {
    let srv = TestServer::spawn().await;
    srv.register("ada@example.com").await;

    let (known, known_body) = srv
        .post("/auth/forgot-password", None, json!({ "email": "ada@example.com" }))
        .await;
    let (unknown, unknown_body) = srv
        .post("/auth/forgot-password", None, json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(known, StatusCode::OK);
    assert_eq!(unknown, StatusCode::OK);
    assert_eq!(known_body, unknown_body);
    assert_eq!(srv.notifier.sent_count(), 1);

    let token = srv.notifier.last_token_for("ada@example.com").unwrap();
    let (status, _) = srv
        .post("/auth/reset-password", None, json!({ "token": token, "password": "new-password" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv
        .post("/auth/reset-password", None, json!({ "token": token, "password": "other-password" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = srv.login("ada@example.com", "new-password").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_requires_current_secret() {
    let srv = TestServer::spawn().await;
    let (_, access, _) = srv.register("ada@example.com").await;

    let (status, body) = srv
        .put(
            "/auth/change-password",
            &access,
            json!({ "current_password": "wrong-horse", "new_password": "battery-staple" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "current_password");

    let (status, _) = srv
        .put(
            "/auth/change-password",
            &access,
            json!({ "current_password": "correct-horse", "new_password": "battery-staple" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.login("ada@example.com", "battery-staple").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn role_lifecycle_and_protections() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (ada, _, _) = srv.register("ada@example.com").await;

    let (status, body) = srv
        .post(
            "/roles",
            Some(&admin),
            json!({ "name": "Auditor", "permissions": ["audit:read", "users:read"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let role_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["name"], "auditor");

    let (status, _) = srv
        .post("/roles", Some(&admin), json!({ "name": "auditor" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = srv
        .put(&format!("/users/{ada}/role"), &admin, json!({ "role_id": role_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.delete(&format!("/roles/{role_id}"), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The new role takes effect on the next login.
    let (_, body) = srv.login("ada@example.com", "correct-horse").await;
    let ada_token = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let (status, _) = srv.get("/audit-logs", Some(&ada_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = srv.get("/roles", Some(&admin)).await;
    let super_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "super-admin")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = srv.delete(&format!("/roles/{super_id}"), &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv
        .put(&format!("/roles/{super_id}"), &admin, json!({ "permissions": ["users:read"] }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_cannot_delete_self_but_can_delete_others() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let (_, me) = srv.get("/auth/me", Some(&admin)).await;
    let admin_id = me["data"]["id"].as_str().unwrap().to_string();
    let (ada, _, _) = srv.register("ada@example.com").await;

    let (status, _) = srv.delete(&format!("/users/{admin_id}"), &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.delete(&format!("/users/{ada}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = srv.get(&format!("/users/{ada}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = srv
        .get(&format!("/audit-logs?action=delete&resource=user&user_id={admin_id}"), Some(&admin))
        .await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["resource_id"], ada.as_str());
    assert_eq!(items[0]["before"]["email"], "ada@example.com");
    assert!(items[0]["before"].get("password_hash").is_none());
}

#[tokio::test]
async fn registration_audit_record_has_created_principal_as_actor() {
    let srv = TestServer::spawn().await;
    let (ada, _, _) = srv.register("ada@example.com").await;
    let admin = srv.admin_token().await;

    let (status, body) = srv
        .get("/audit-logs?action=CREATE&resource=user", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let record = &body["data"]["items"][0];
    assert_eq!(record["user_id"], ada.as_str());
    assert_eq!(record["resource_id"], ada.as_str());
    assert!(record["after"].get("tokens").is_none());

    let id = record["id"].as_str().unwrap();
    let (status, body) = srv.get(&format!("/audit-logs/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "CREATE");

    let (status, _) = srv.get("/audit-logs?action=explode", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

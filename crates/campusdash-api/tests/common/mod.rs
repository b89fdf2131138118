#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use campusdash_api::routes::router;
use campusdash_api::state::{ApiOptions, AppState, AppStateInner};
use campusdash_api::tokens::{TokenConfig, TokenService};
use campusdash_db::Database;
use campusdash_db::models::NewUser;
use campusdash_types::api::TokenKind;
use campusdash_types::models::{Role, User};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub fn token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "integration-access-secret-0123456789abcdef".into(),
        refresh_secret: "integration-refresh-secret-0123456789abcdef".into(),
        access_ttl: Duration::seconds(TokenConfig::DEFAULT_ACCESS_TTL_SECS),
        refresh_ttl: Duration::seconds(TokenConfig::DEFAULT_REFRESH_TTL_SECS),
    }
}

/// Fresh in-memory app loaded with the demo campus.
pub fn app(options: ApiOptions) -> TestApp {
    let db = Database::open_in_memory().unwrap();
    db.seed_demo().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenService::new(&token_config()),
        options,
    });
    TestApp {
        router: router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Adds a user straight to the store and returns it with an access token.
    pub fn user(&self, name: &str, role: Role) -> (User, String) {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@campusdash.test", name.to_lowercase()),
            role,
            created_at: Utc::now(),
        };
        self.state
            .db
            .create_user(&NewUser {
                id: user.id.to_string(),
                name: user.name.clone(),
                email: user.email.clone(),
                role,
            })
            .unwrap();
        let token = self.state.tokens.issue(&user, TokenKind::Access).unwrap();
        (user, token)
    }

    pub async fn location_ids(&self) -> Vec<String> {
        let (_, body) = self.get("/locations", None).await;
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap().to_string())
            .collect()
    }
}

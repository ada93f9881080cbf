//! Router fixtures: an in-memory store, quiet collaborators and signed
//! tokens.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use futures_util::future::BoxFuture;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use convo_core::clients::{NullSearch, TracingMail};
use convo_core::{Notification, NotificationClient, Services};
use convo_db::Database;
use convo_types::User;
use convo_types::api::{Claims, VerifyClaims};

use crate::{AppStateInner, router};

pub const SECRET: &str = "test-secret";

struct QuietNotifications;

impl NotificationClient for QuietNotifications {
    fn generate_token(&self, user_id: Uuid) -> String {
        format!("rt-{user_id}")
    }

    fn notify<'a>(&'a self, _notification: &'a Notification) -> BoxFuture<'a, Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

pub struct TestApp {
    pub db: Arc<Database>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let services = Services {
            db: db.clone(),
            mail: Arc::new(TracingMail),
            search: Arc::new(NullSearch),
            notifications: Arc::new(QuietNotifications),
        };
        let state = Arc::new(AppStateInner {
            services,
            jwt_secret: SECRET.into(),
        });
        Self {
            db,
            router: router(state),
        }
    }

    pub fn user(&self, first: &str) -> User {
        let mut user = User::new_incomplete(&format!("{}@example.com", first.to_lowercase()));
        user.first_name = first.to_string();
        user.password_digest = "digest".into();
        user.verified = true;
        self.db.put_user(&mut user).unwrap();
        user
    }

    /// Send one request and return the status and the parsed body (`Null`
    /// when empty).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn sign<T: Serialize>(claims: &T) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn expiry() -> usize {
    (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize
}

pub fn session_token(user: &User) -> String {
    sign(&Claims {
        sub: user.id.unwrap(),
        exp: expiry(),
    })
}

pub fn verify_token(user: &User, email: &str) -> String {
    sign(&VerifyClaims {
        sub: user.id.unwrap(),
        email: email.into(),
        exp: expiry(),
    })
}

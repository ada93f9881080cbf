use anyhow::Result;
use futures_util::future::BoxFuture;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use convo_core::{Notification, NotificationClient};

/// Realtime tokens live for a day; clients fetch a fresh one with the user.
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeClaims {
    pub sub: Uuid,
    pub exp: usize,
}

/// Issues HS256 realtime tokens and logs notifications. Fan-out to
/// connected clients is handled by the realtime service.
pub struct JwtNotifications {
    key: EncodingKey,
}

impl JwtNotifications {
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl NotificationClient for JwtNotifications {
    fn generate_token(&self, user_id: Uuid) -> String {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp();
        let claims = RealtimeClaims {
            sub: user_id,
            exp: exp as usize,
        };
        encode(&Header::default(), &claims, &self.key).unwrap_or_else(|e| {
            warn!(user_id = %user_id, "Failed to sign realtime token: {}", e);
            String::new()
        })
    }

    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            info!(
                recipients = notification.user_ids.len(),
                target = notification.target,
                target_id = %notification.target_id,
                "{} {} in {}",
                notification.actor,
                notification.verb,
                notification.target_name
            );
            Ok(())
        })
    }
}

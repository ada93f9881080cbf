//! Email verification and the account merge it can trigger.

use tracing::{debug, info};
use uuid::Uuid;

use convo_types::User;

use crate::clients::index_user;
use crate::context::Services;
use crate::error::CoreError;
use crate::merge::merge_users;

/// Attach a verified `email` to `user_id`.
///
/// When another stored user already owns the address, that user is merged
/// into `user_id`. The returned user carries a fresh realtime token.
pub async fn verify_email(
    services: &Services,
    user_id: Uuid,
    email: &str,
) -> Result<User, CoreError> {
    let lookup = email.to_lowercase();
    let (mut user, owner) = services
        .blocking(move |db| {
            let user = db.get_user(user_id)?.ok_or(CoreError::NotFound("user"))?;
            let owner = db.get_user_by_email(&lookup)?;
            Ok((user, owner))
        })
        .await?;

    user.add_email(email);

    let mut user = match owner {
        Some(other) if other.id != user.id => {
            info!(user_id = %user_id, superseded = ?other.id, "email owned by another user, merging");
            merge_users(services, user, other).await?
        }
        _ => {
            debug!(user_id = %user_id, "email verified");
            services
                .blocking(move |db| {
                    db.put_user(&mut user)?;
                    Ok(user)
                })
                .await?
        }
    };

    user.realtime_token = services.notifications.generate_token(user_id);
    index_user(services.search.as_ref(), &user).await;
    Ok(user)
}

/// Load a user for an API response, with its realtime token filled in.
pub async fn load_user(services: &Services, user_id: Uuid) -> Result<User, CoreError> {
    let mut user = services
        .blocking(move |db| db.get_user(user_id)?.ok_or(CoreError::NotFound("user")))
        .await?;
    user.realtime_token = services.notifications.generate_token(user_id);
    Ok(user)
}

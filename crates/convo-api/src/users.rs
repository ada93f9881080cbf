use axum::{Extension, Json, extract::State};
use tracing::warn;

use convo_core::users;
use convo_types::User;
use convo_types::api::{Claims, VerifyClaims, VerifyEmailRequest};

use crate::error::ApiError;
use crate::middleware::decode_token;
use crate::state::AppState;

/// The signed-in user with a fresh realtime token.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let user = users::load_user(&state.services, claims.sub).await?;
    Ok(Json(user))
}

/// Redeem an email verification token for the signed-in user. If the
/// address belongs to another account, that account is merged into this one.
pub async fn verify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<User>, ApiError> {
    let verify: VerifyClaims = decode_token(&state.jwt_secret, &req.token)?;
    if verify.sub != claims.sub {
        warn!(session = %claims.sub, token_sub = %verify.sub, "verification token for another user");
        return Err(ApiError::unauthorized("Verification token belongs to another user"));
    }

    let user = users::verify_email(&state.services, claims.sub, &verify.email).await?;
    Ok(Json(user))
}

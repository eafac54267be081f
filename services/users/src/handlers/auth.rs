//! Login and profile endpoints

use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    guards::AuthUser,
    jwt::AccessToken,
    models::UserResponse,
    services::{AuthError, UserError},
    state::AppState,
};

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Exchange local credentials for an access token
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<AccessToken>> {
    info!("Login attempt for user: {}", payload.username);

    if !state.login_limiter.is_allowed(&payload.username).await {
        warn!("Login for {} refused while locked", payload.username);
        return Err(ApiError::TooManyRequests);
    }

    let user = match state
        .auth
        .validate_user(&payload.username, &payload.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            state.login_limiter.record_failure(&payload.username).await;
            return Err(AuthError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    state.login_limiter.reset(&payload.username).await;

    Ok(Json(state.auth.login(&user)?))
}

/// The authenticated caller's own record
///
/// GET /auth/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<UserResponse>> {
    match state.users.find_by_id(caller.id).await {
        Ok(user) => Ok(Json(user)),
        Err(UserError::NotFound(_)) => Err(ApiError::unauthorized()),
        Err(e) => Err(e.into()),
    }
}

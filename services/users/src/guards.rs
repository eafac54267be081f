//! Request guards: bearer-token authentication and role checks
//!
//! Each route declares an ordered list of [`Guard`]s. [`enforce`] runs them
//! in order before the handler; the first failure short-circuits the
//! request. `Jwt` attaches an [`AuthUser`] to the request, which `Roles`
//! reads, so `Jwt` must come first.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use crate::{
    error::ApiError, jwt::JwtService, models::Role, services::UsersService, state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// A valid, unexpired bearer token is required
    Jwt,
    /// The caller must hold at least one of these roles
    Roles(&'static [Role]),
}

/// Caller identity established by the token guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Guards of one route together with the state they need
#[derive(Clone)]
pub struct GuardChain {
    state: AppState,
    guards: &'static [Guard],
}

impl GuardChain {
    pub fn new(state: AppState, guards: &'static [Guard]) -> Self {
        Self { state, guards }
    }
}

/// Middleware evaluating a route's guard chain
pub async fn enforce(
    State(chain): State<GuardChain>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    for guard in chain.guards {
        match *guard {
            Guard::Jwt => {
                let user = authenticate(chain.state.auth.jwt(), req.headers())?;
                req.extensions_mut().insert(user);
            }
            Guard::Roles(allowed) => {
                let user = req
                    .extensions()
                    .get::<AuthUser>()
                    .cloned()
                    .ok_or_else(ApiError::unauthorized)?;
                authorize(&chain.state.users, &user, allowed).await?;
            }
        }
    }

    Ok(next.run(req).await)
}

/// Verify the bearer token and return the identity it asserts
pub fn authenticate(jwt: &JwtService, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        debug!("Request without bearer token");
        return Err(ApiError::unauthorized());
    };

    let claims = jwt.validate_token(bearer.token()).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::unauthorized()
    })?;

    Ok(AuthUser {
        id: claims.sub,
        username: claims.username,
    })
}

/// Check the caller's current roles against a route's allow-list
///
/// Roles are read from the store on every call, so grants and revocations
/// apply to tokens already issued.
pub async fn authorize(
    users: &UsersService,
    user: &AuthUser,
    allowed: &[Role],
) -> Result<(), ApiError> {
    let Some(roles) = users.roles_of(user.id).await? else {
        debug!(user_id = user.id, "Token for a user that no longer exists");
        return Err(ApiError::unauthorized());
    };

    if allowed.iter().any(|role| roles.contains(role)) {
        Ok(())
    } else {
        debug!(user_id = user.id, ?allowed, "Caller lacks required role");
        Err(ApiError::Forbidden)
    }
}

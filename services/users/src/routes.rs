//! Route table for the users service
//!
//! Every endpoint is one [`RouteEntry`]: a path, a method router and the
//! ordered guards evaluated before the handler.

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{MethodRouter, delete, get, patch, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::{
    error::{ApiError, ApiResult},
    guards::{self, Guard, GuardChain},
    handlers::{auth, users},
    models::Role,
    state::AppState,
};

/// Token required, caller must be an administrator
pub const ADMIN_ONLY: &[Guard] = &[Guard::Jwt, Guard::Roles(&[Role::Admin])];

/// Token required, any role
pub const AUTHENTICATED: &[Guard] = &[Guard::Jwt];

pub const PUBLIC: &[Guard] = &[];

pub struct RouteEntry {
    pub path: &'static str,
    pub handler: MethodRouter<AppState>,
    pub guards: &'static [Guard],
}

impl RouteEntry {
    fn new(path: &'static str, handler: MethodRouter<AppState>, guards: &'static [Guard]) -> Self {
        Self {
            path,
            handler,
            guards,
        }
    }
}

/// All endpoints of the service
pub fn route_table() -> Vec<RouteEntry> {
    vec![
        RouteEntry::new("/health", get(health_check), PUBLIC),
        RouteEntry::new("/auth/login", post(auth::login), PUBLIC),
        RouteEntry::new("/auth/profile", get(auth::profile), AUTHENTICATED),
        RouteEntry::new("/users", post(users::create), ADMIN_ONLY),
        RouteEntry::new("/users", get(users::find_all), ADMIN_ONLY),
        RouteEntry::new("/users/byEMail", get(users::find_by_email), ADMIN_ONLY),
        RouteEntry::new("/users/:id", get(users::find_by_id), ADMIN_ONLY),
        RouteEntry::new("/users/:id", patch(users::update), ADMIN_ONLY),
        RouteEntry::new("/users/:id", delete(users::remove), ADMIN_ONLY),
        RouteEntry::new("/users/:id/addRole/:role", post(users::add_role), ADMIN_ONLY),
        RouteEntry::new(
            "/users/:id/removeRole/:role",
            post(users::remove_role),
            ADMIN_ONLY,
        ),
    ]
}

/// Create the router for the users service
pub fn create_router(state: AppState) -> Router {
    let router = route_table()
        .into_iter()
        .fold(Router::new(), |router, entry| {
            let handler = if entry.guards.is_empty() {
                entry.handler
            } else {
                entry.handler.route_layer(middleware::from_fn_with_state(
                    GuardChain::new(state.clone(), entry.guards),
                    guards::enforce,
                ))
            };
            router.route(entry.path, handler)
        });

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    match state.store.health_check().await {
        Ok(true) => Ok(Json(json!({
            "status": "ok",
            "service": "users-service"
        }))),
        Ok(false) => Err(ApiError::Unavailable),
        Err(e) => {
            error!("Store health check failed: {}", e);
            Err(ApiError::Unavailable)
        }
    }
}

//! User management endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    models::{CreateUser, Role, UpdateUser, UserResponse},
    state::AppState,
};

/// Query string of `GET /users/byEMail`
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// Create a new user
///
/// POST /users
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<CreateUser>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.create(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List all users
///
/// GET /users
pub async fn find_all(State(state): State<AppState>) -> ApiResult<Json<Vec<UserResponse>>> {
    Ok(Json(state.users.find_all().await?))
}

/// GET /users/byEMail?email=
pub async fn find_by_email(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<EmailQuery>, ApiError>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(state.users.find_by_email(&query.email).await?))
}

/// GET /users/:id
pub async fn find_by_id(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(state.users.find_by_id(id).await?))
}

/// Partially update a user
///
/// PATCH /users/:id
pub async fn update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateUser>, ApiError>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(state.users.update(id, input).await?))
}

/// Delete a user; answers 200 with an empty body
///
/// DELETE /users/:id
pub async fn remove(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<StatusCode> {
    state.users.remove(id).await?;
    Ok(StatusCode::OK)
}

/// POST /users/:id/addRole/:role
pub async fn add_role(
    State(state): State<AppState>,
    WithRejection(Path((id, role)), _): WithRejection<Path<(i64, String)>, ApiError>,
) -> ApiResult<Json<UserResponse>> {
    let role = parse_role(&role)?;
    Ok(Json(state.users.add_role(id, role).await?))
}

/// POST /users/:id/removeRole/:role
pub async fn remove_role(
    State(state): State<AppState>,
    WithRejection(Path((id, role)), _): WithRejection<Path<(i64, String)>, ApiError>,
) -> ApiResult<Json<UserResponse>> {
    let role = parse_role(&role)?;
    Ok(Json(state.users.remove_role(id, role).await?))
}

fn parse_role(raw: &str) -> ApiResult<Role> {
    raw.parse()
        .map_err(|e: crate::models::role::UnknownRole| ApiError::Validation(e.to_string()))
}

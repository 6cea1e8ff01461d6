use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{delete, get, post},
};
use tiffin_service::models::{Role, User};
use tiffin_service::store::StaffStore;
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::models::*;
use crate::session::AdminSession;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/AddStaff", post(add_staff))
        .route("/api/admin/getallusers", get(list_users))
        .route("/api/admin/getallStaffusers", get(list_staff_users))
        .route("/api/admin/getallusersbyfilter", get(filter_users))
        .route("/api/admin/updateUser", post(update_user))
        .route("/api/admin/removeUser", delete(remove_user))
}

#[utoipa::path(
    post,
    path = "/api/admin/AddStaff",
    request_body = AddStaffRequest,
    responses(
        (status = 200, description = "User registered", body = ApiResponse<User>),
        (status = 400, description = "Missing fields or duplicate email", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "staff"
)]
#[instrument(skip(state, payload))]
pub async fn add_staff(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<AddStaffRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let input = payload.validate()?;

    let mut conn = state.connect().await?;
    let user = StaffStore::new(&mut conn).register(input).await?;

    Ok(Json(ApiResponse::new("User registered successfully", user)))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallusers",
    responses(
        (status = 200, description = "All users", body = ApiResponse<Vec<User>>),
    ),
    security(("bearer" = [])),
    tag = "staff"
)]
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let mut conn = state.connect().await?;
    let users = StaffStore::new(&mut conn).list().await?;

    Ok(Json(ApiResponse::new("Users fetched successfully", users)))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallStaffusers",
    responses(
        (status = 200, description = "Users with the staff role", body = ApiResponse<Vec<User>>),
    ),
    security(("bearer" = [])),
    tag = "staff"
)]
#[instrument(skip(state))]
pub async fn list_staff_users(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let mut conn = state.connect().await?;
    let users = StaffStore::new(&mut conn).list_by_role(Role::Staff).await?;

    Ok(Json(ApiResponse::new("Staff users fetched successfully", users)))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallusersbyfilter",
    params(UserFilterQuery),
    responses(
        (status = 200, description = "Matching users", body = ApiResponse<Vec<User>>),
        (status = 400, description = "No filter given or malformed filter", body = ApiErrorResponse),
        (status = 404, description = "No user matches", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "staff"
)]
#[instrument(skip(state))]
pub async fn filter_users(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<UserFilterQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let filter = query.into_filter()?;

    let mut conn = state.connect().await?;
    let users = StaffStore::new(&mut conn).filter(&filter).await?;
    if users.is_empty() {
        return Err(ApiError::NotFound("No users found".to_string()));
    }

    Ok(Json(ApiResponse::new("Users fetched successfully", users)))
}

#[utoipa::path(
    post,
    path = "/api/admin/updateUser",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<User>),
        (status = 400, description = "Missing id or invalid field", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "staff"
)]
#[instrument(skip(state))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let (id, changes) = payload.validate()?;

    let mut conn = state.connect().await?;
    let user = StaffStore::new(&mut conn).update(id, changes).await?;

    Ok(Json(ApiResponse::new("User updated successfully", user)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/removeUser",
    params(RemoveUserQuery),
    responses(
        (status = 200, description = "User removed", body = MessageResponse),
        (status = 400, description = "Missing or malformed id", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "staff"
)]
#[instrument(skip(state))]
pub async fn remove_user(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<RemoveUserQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = require_id(query.user_id, "User ID is required", "user ID")?;

    let mut conn = state.connect().await?;
    StaffStore::new(&mut conn).remove(id).await?;

    Ok(Json(MessageResponse {
        message: "User removed successfully".to_string(),
    }))
}

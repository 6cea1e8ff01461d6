use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, header},
    routing::post,
};
use tiffin_service::models::{Role, User};
use tiffin_service::store::StaffStore;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::models::*;
use crate::session::SessionKeys;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(admin_login))
        .route("/api/admin/logout", post(admin_logout))
        .route("/api/deliveries/login", post(worker_login))
}

type LoginReply = ([(HeaderName, String); 1], Json<ApiResponse<LoginResponse>>);

async fn login(state: &AppState, payload: LoginRequest) -> Result<User, ApiError> {
    let (email, password) = payload.validate()?;
    let mut conn = state.connect().await?;
    Ok(StaffStore::new(&mut conn)
        .authenticate(&email, &password)
        .await?)
}

fn issue(state: &AppState, user: &User) -> Result<LoginReply, ApiError> {
    let token = state.keys.issue(user)?;
    info!(user_id = %user.id, role = %user.role, "session issued");

    Ok((
        [(header::SET_COOKIE, state.keys.cookie(&token))],
        Json(ApiResponse::new(
            "Login successful",
            LoginResponse {
                token_type: "bearer".to_string(),
                access_token: token,
                expires_in: state.keys.access_token_expires.num_seconds(),
                email: user.email.clone(),
                role: user.role,
            },
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing fields or invalid credentials", body = ApiErrorResponse),
        (status = 403, description = "Not an admin", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> Result<LoginReply, ApiError> {
    let user = login(&state, payload).await?;
    if user.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    issue(&state, &user)
}

#[utoipa::path(
    post,
    path = "/api/admin/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse),
    ),
    tag = "auth"
)]
pub async fn admin_logout() -> ([(HeaderName, String); 1], Json<MessageResponse>) {
    (
        [(header::SET_COOKIE, SessionKeys::expired_cookie())],
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

#[utoipa::path(
    post,
    path = "/api/deliveries/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Missing fields or invalid credentials", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn worker_login(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> Result<LoginReply, ApiError> {
    let user = login(&state, payload).await?;
    issue(&state, &user)
}

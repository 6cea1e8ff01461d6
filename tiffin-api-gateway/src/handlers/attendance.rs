use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tiffin_service::models::{Attendance, User};
use tiffin_service::store::{AttendanceMark, AttendanceStore, AttendanceWithUser};
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::models::*;
use crate::session::AdminSession;

use super::{AppState, today};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/AddAttendance", post(add_attendance))
        .route("/api/admin/getTodayAttendance", get(today_attendance))
        .route(
            "/api/admin/getAllUserAttendanceForToday",
            get(all_user_attendance_today),
        )
        .route(
            "/api/admin/getUsersWithoutAttendanceToday",
            get(users_without_attendance_today),
        )
}

#[utoipa::path(
    post,
    path = "/api/admin/AddAttendance",
    request_body = AddAttendanceRequest,
    responses(
        (status = 200, description = "Attendance added or status changed", body = ApiResponse<Attendance>),
        (status = 400, description = "Missing fields or same status already marked", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "attendance"
)]
#[instrument(skip(state))]
pub async fn add_attendance(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<AddAttendanceRequest>,
) -> Result<Json<ApiResponse<Attendance>>, ApiError> {
    let (user_id, date, status) = payload.validate()?;

    let mut conn = state.connect().await?;
    let response = match AttendanceStore::new(&mut conn)
        .mark(user_id, date, status)
        .await?
    {
        AttendanceMark::Created(attendance) => {
            ApiResponse::new("Attendance added successfully", attendance)
        }
        AttendanceMark::Updated(attendance) => {
            ApiResponse::new("Attendance status updated", attendance)
        }
    };
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/admin/getTodayAttendance",
    responses(
        (status = 200, description = "Today's attendance with user details", body = ApiResponse<Vec<AttendanceWithUser>>),
    ),
    security(("bearer" = [])),
    tag = "attendance"
)]
#[instrument(skip(state))]
pub async fn today_attendance(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<AttendanceWithUser>>>, ApiError> {
    let mut conn = state.connect().await?;
    let attendance = AttendanceStore::new(&mut conn).for_date(today()).await?;

    Ok(Json(ApiResponse::new(
        "Today's attendance fetched successfully",
        attendance,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/getAllUserAttendanceForToday",
    responses(
        (status = 200, description = "Today's attendance of registered users", body = ApiResponse<Vec<AttendanceWithUser>>),
        (status = 404, description = "No user registered", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "attendance"
)]
#[instrument(skip(state))]
pub async fn all_user_attendance_today(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<AttendanceWithUser>>>, ApiError> {
    let mut conn = state.connect().await?;
    let attendance = AttendanceStore::new(&mut conn)
        .for_date_of_registered_users(today())
        .await?;

    Ok(Json(ApiResponse::new(
        "Today's attendance for all users fetched successfully",
        attendance,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/getUsersWithoutAttendanceToday",
    responses(
        (status = 200, description = "Staff users with no attendance today", body = ApiResponse<Vec<User>>),
    ),
    security(("bearer" = [])),
    tag = "attendance"
)]
#[instrument(skip(state))]
pub async fn users_without_attendance_today(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let mut conn = state.connect().await?;
    let users = AttendanceStore::new(&mut conn)
        .staff_without_attendance(today())
        .await?;

    Ok(Json(ApiResponse::new(
        "Staff users who have not marked attendance today",
        users,
    )))
}

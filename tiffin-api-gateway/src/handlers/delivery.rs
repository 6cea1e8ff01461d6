use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use tiffin_service::models::Delivery;
use tiffin_service::store::{DashboardSummary, DeliveryDetails, DeliveryStore, StatusChange};
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::models::*;
use crate::session::AdminSession;

use super::{AppState, today};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/createDelivery", post(create_deliveries))
        .route("/api/admin/assignDeliveryPerson", post(assign_delivery_person))
        .route("/api/admin/updateDelivery", post(update_delivery))
        .route("/api/admin/getallDeliveries", get(list_deliveries))
        .route("/api/admin/getallDeliveriesbyfilter", get(today_deliveries))
        .route("/api/admin/dashboardDetails", get(dashboard_details))
}

#[utoipa::path(
    post,
    path = "/api/admin/createDelivery",
    request_body = CreateDeliveriesRequest,
    responses(
        (status = 201, description = "Deliveries created", body = ApiResponse<Vec<Delivery>>),
        (status = 200, description = "Every matching customer already has this delivery", body = ApiResponse<Vec<Delivery>>),
        (status = 400, description = "Missing or invalid meal type or date", body = ApiErrorResponse),
        (status = 404, description = "No customer subscribes to the meal", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "deliveries"
)]
#[instrument(skip(state))]
pub async fn create_deliveries(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<CreateDeliveriesRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Delivery>>>), ApiError> {
    let (meal_type, delivery_date) = payload.validate()?;

    let mut conn = state.connect().await?;
    let created = DeliveryStore::new(&mut conn)
        .create_for_meal(meal_type, delivery_date)
        .await?;

    if created.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::new(
                "Deliveries already exist for all matching customers",
                created,
            )),
        ));
    }
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            format!("Successfully created {} deliveries", created.len()),
            created,
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/assignDeliveryPerson",
    request_body = AssignDeliveryRequest,
    responses(
        (status = 200, description = "Deliveries assigned", body = ApiResponse<Vec<Delivery>>),
        (status = 400, description = "Missing or malformed ids", body = ApiErrorResponse),
        (status = 404, description = "Worker or delivery not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "deliveries"
)]
#[instrument(skip(state))]
pub async fn assign_delivery_person(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<AssignDeliveryRequest>,
) -> Result<Json<ApiResponse<Vec<Delivery>>>, ApiError> {
    let (delivery_ids, delivery_person_id) = payload.validate()?;

    let mut conn = state.connect().await?;
    let assigned = DeliveryStore::new(&mut conn)
        .assign(&delivery_ids, delivery_person_id)
        .await?;

    Ok(Json(ApiResponse::new(
        "Delivery person assigned successfully",
        assigned,
    )))
}

#[utoipa::path(
    post,
    path = "/api/admin/updateDelivery",
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<StatusChange>),
        (status = 400, description = "Missing fields, unknown status, mismatched customer or no meals left", body = ApiErrorResponse),
        (status = 404, description = "Delivery or customer not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "deliveries"
)]
#[instrument(skip(state))]
pub async fn update_delivery(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<UpdateDeliveryRequest>,
) -> Result<Json<ApiResponse<StatusChange>>, ApiError> {
    let (delivery_id, customer_id, status) = payload.validate()?;

    let mut conn = state.connect().await?;
    let change = DeliveryStore::new(&mut conn)
        .transition_status(delivery_id, customer_id, status)
        .await?;

    Ok(Json(ApiResponse::new(
        "Delivery status updated successfully",
        change,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallDeliveries",
    responses(
        (status = 200, description = "All deliveries", body = ApiResponse<Vec<Delivery>>),
    ),
    security(("bearer" = [])),
    tag = "deliveries"
)]
#[instrument(skip(state))]
pub async fn list_deliveries(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<Delivery>>>, ApiError> {
    let mut conn = state.connect().await?;
    let deliveries = DeliveryStore::new(&mut conn).list().await?;

    Ok(Json(ApiResponse::new(
        "Deliveries fetched successfully",
        deliveries,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallDeliveriesbyfilter",
    params(TodayDeliveriesQuery),
    responses(
        (status = 200, description = "Today's deliveries with customer and worker details", body = ApiResponse<Vec<DeliveryDetails>>),
        (status = 400, description = "Malformed filter", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "deliveries"
)]
#[instrument(skip(state))]
pub async fn today_deliveries(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<TodayDeliveriesQuery>,
) -> Result<Json<ApiResponse<Vec<DeliveryDetails>>>, ApiError> {
    let filter = query.into_filter(today())?;

    let mut conn = state.connect().await?;
    let deliveries = DeliveryStore::new(&mut conn).find_details(&filter).await?;

    let message = if deliveries.is_empty() {
        "No deliveries found for today"
    } else {
        "Today's deliveries fetched successfully"
    };
    Ok(Json(ApiResponse::new(message, deliveries)))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboardDetails",
    responses(
        (status = 200, description = "Headline counts", body = ApiResponse<DashboardSummary>),
    ),
    security(("bearer" = [])),
    tag = "deliveries"
)]
#[instrument(skip(state))]
pub async fn dashboard_details(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let mut conn = state.connect().await?;
    let summary = DeliveryStore::new(&mut conn).dashboard(today()).await?;

    Ok(Json(ApiResponse::new(
        "Dashboard details fetched successfully",
        summary,
    )))
}

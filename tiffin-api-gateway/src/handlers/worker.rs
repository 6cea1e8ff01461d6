//! Endpoints used by delivery workers from the field app.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use tiffin_service::models::Delivery;
use tiffin_service::store::{DeliveryDetails, DeliveryStore, StatusChange};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;
use crate::session::Session;

use super::{AppState, today};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/deliveries/deliveries", get(list_deliveries))
        .route("/api/deliveries/deliveries/search", get(search_deliveries))
        .route(
            "/api/deliveries/deliveries/{delivery_id}/complete",
            put(complete_delivery),
        )
        .route("/api/deliveries/getUserOrder", get(user_orders))
        .route("/api/deliveries/updateDelivery", post(update_delivery))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/deliveries",
    responses(
        (status = 200, description = "All deliveries", body = ApiResponse<Vec<Delivery>>),
        (status = 401, description = "Not signed in", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "worker"
)]
#[instrument(skip(state))]
pub async fn list_deliveries(
    State(state): State<AppState>,
    _session: Session,
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
    path = "/api/deliveries/deliveries/search",
    params(DeliverySearchQuery),
    responses(
        (status = 200, description = "Matching deliveries", body = ApiResponse<Vec<Delivery>>),
        (status = 400, description = "No filter given or malformed filter", body = ApiErrorResponse),
        (status = 404, description = "No delivery matches", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "worker"
)]
#[instrument(skip(state))]
pub async fn search_deliveries(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<DeliverySearchQuery>,
) -> Result<Json<ApiResponse<Vec<Delivery>>>, ApiError> {
    let filter = query.into_filter()?;

    let mut conn = state.connect().await?;
    let deliveries = DeliveryStore::new(&mut conn).find(&filter).await?;
    if deliveries.is_empty() {
        return Err(ApiError::NotFound("No deliveries found".to_string()));
    }

    Ok(Json(ApiResponse::new(
        "Deliveries fetched successfully",
        deliveries,
    )))
}

#[utoipa::path(
    put,
    path = "/api/deliveries/deliveries/{delivery_id}/complete",
    params(
        ("delivery_id" = String, Path, description = "Delivery ID")
    ),
    responses(
        (status = 200, description = "Delivery marked delivered", body = ApiResponse<StatusChange>),
        (status = 400, description = "Malformed id or no meals left", body = ApiErrorResponse),
        (status = 404, description = "Delivery not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "worker"
)]
#[instrument(skip(state))]
pub async fn complete_delivery(
    State(state): State<AppState>,
    _session: Session,
    Path(delivery_id): Path<String>,
) -> Result<Json<ApiResponse<StatusChange>>, ApiError> {
    let delivery_id = require_id(Some(delivery_id), "Delivery ID is required", "delivery ID")?;

    let mut conn = state.connect().await?;
    let change = DeliveryStore::new(&mut conn).complete(delivery_id).await?;

    Ok(Json(ApiResponse::new("Delivery marked as completed", change)))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/getUserOrder",
    params(UserOrderQuery),
    responses(
        (status = 200, description = "Today's assigned orders of the worker", body = ApiResponse<Vec<DeliveryDetails>>),
        (status = 400, description = "Email missing", body = ApiErrorResponse),
        (status = 404, description = "Unknown worker or no orders", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "worker"
)]
#[instrument(skip(state))]
pub async fn user_orders(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<UserOrderQuery>,
) -> Result<Json<ApiResponse<Vec<DeliveryDetails>>>, ApiError> {
    let email = query
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let mut conn = state.connect().await?;
    let orders = DeliveryStore::new(&mut conn)
        .worker_orders(&email, today())
        .await?;

    Ok(Json(ApiResponse::new("Orders fetched successfully", orders)))
}

#[utoipa::path(
    post,
    path = "/api/deliveries/updateDelivery",
    params(UpdateDeliveryRequest),
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<StatusChange>),
        (status = 400, description = "Missing fields, unknown status, mismatched customer or no meals left", body = ApiErrorResponse),
        (status = 404, description = "Delivery or customer not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "worker"
)]
#[instrument(skip(state))]
pub async fn update_delivery(
    State(state): State<AppState>,
    _session: Session,
    Query(query): Query<UpdateDeliveryRequest>,
) -> Result<Json<ApiResponse<StatusChange>>, ApiError> {
    let (delivery_id, customer_id, status) = query.validate()?;

    let mut conn = state.connect().await?;
    let change = DeliveryStore::new(&mut conn)
        .transition_status(delivery_id, customer_id, status)
        .await?;

    Ok(Json(ApiResponse::new(
        "Delivery status updated successfully",
        change,
    )))
}

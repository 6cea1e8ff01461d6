use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{delete, get, post},
};
use tiffin_service::models::Customer;
use tiffin_service::store::CustomerStore;
use tracing::instrument;

use crate::error::ApiError;
use crate::extract::JsonOrForm;
use crate::models::*;
use crate::session::AdminSession;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/AddCustomer", post(add_customer))
        .route("/api/admin/getallcustomers", get(list_customers))
        .route("/api/admin/getallcustomersbyfilter", get(filter_customers))
        .route("/api/admin/updateCustomer", post(update_customer))
        .route("/api/admin/removeCustomer", delete(remove_customer))
}

#[utoipa::path(
    post,
    path = "/api/admin/AddCustomer",
    request_body = AddCustomerRequest,
    responses(
        (status = 200, description = "Customer added", body = ApiResponse<Customer>),
        (status = 400, description = "Missing fields or duplicate email", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
#[instrument(skip(state))]
pub async fn add_customer(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<AddCustomerRequest>,
) -> Result<Json<ApiResponse<Customer>>, ApiError> {
    let input = payload.validate()?;

    let mut conn = state.connect().await?;
    let customer = CustomerStore::new(&mut conn).create(input).await?;

    Ok(Json(ApiResponse::new("Customer added successfully", customer)))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallcustomers",
    responses(
        (status = 200, description = "All customers", body = ApiResponse<Vec<Customer>>),
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
#[instrument(skip(state))]
pub async fn list_customers(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<ApiResponse<Vec<Customer>>>, ApiError> {
    let mut conn = state.connect().await?;
    let customers = CustomerStore::new(&mut conn).list().await?;

    Ok(Json(ApiResponse::new("Customers fetched successfully", customers)))
}

#[utoipa::path(
    get,
    path = "/api/admin/getallcustomersbyfilter",
    params(CustomerFilterQuery),
    responses(
        (status = 200, description = "Matching customers", body = ApiResponse<Vec<Customer>>),
        (status = 400, description = "Malformed filter", body = ApiErrorResponse),
        (status = 404, description = "No customer matches", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
#[instrument(skip(state))]
pub async fn filter_customers(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<CustomerFilterQuery>,
) -> Result<Json<ApiResponse<Vec<Customer>>>, ApiError> {
    let filter = query.into_filter()?;

    let mut conn = state.connect().await?;
    let customers = CustomerStore::new(&mut conn).filter(&filter).await?;
    if customers.is_empty() {
        return Err(ApiError::NotFound("No customers found".to_string()));
    }

    Ok(Json(ApiResponse::new("Customers fetched successfully", customers)))
}

#[utoipa::path(
    post,
    path = "/api/admin/updateCustomer",
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<Customer>),
        (status = 400, description = "Missing id or invalid field", body = ApiErrorResponse),
        (status = 404, description = "Customer not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
#[instrument(skip(state))]
pub async fn update_customer(
    State(state): State<AppState>,
    _admin: AdminSession,
    JsonOrForm(payload): JsonOrForm<UpdateCustomerRequest>,
) -> Result<Json<ApiResponse<Customer>>, ApiError> {
    let (id, changes) = payload.validate()?;

    let mut conn = state.connect().await?;
    let customer = CustomerStore::new(&mut conn).update(id, changes).await?;

    Ok(Json(ApiResponse::new("Customer updated successfully", customer)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/removeCustomer",
    params(RemoveCustomerQuery),
    responses(
        (status = 200, description = "Customer removed", body = MessageResponse),
        (status = 400, description = "Missing or malformed id", body = ApiErrorResponse),
        (status = 404, description = "Customer not found", body = ApiErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
#[instrument(skip(state))]
pub async fn remove_customer(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(query): Query<RemoveCustomerQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = require_id(query.customer_id, "Customer ID is required", "customer ID")?;

    let mut conn = state.connect().await?;
    CustomerStore::new(&mut conn).remove(id).await?;

    Ok(Json(MessageResponse {
        message: "Customer removed successfully".to_string(),
    }))
}

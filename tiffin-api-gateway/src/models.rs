//! Request and response bodies of the HTTP API.
//!
//! Request fields are optional so that missing values are reported as
//! `400` with a readable message before any database work happens.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tiffin_service::lifecycle::{parse_delivery_ids, parse_meal_slots};
use tiffin_service::models::{
    AttendanceStatus, CustomerChangeset, DeliveryStatus, MealType, PaymentStatus, Role,
    UserChangeset,
};
use tiffin_service::store::{
    CustomerFilter, DeliveryFilter, NewCustomerInput, NewStaffInput, StaffFilter,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error message
    pub message: String,
}

/// A list given either as JSON array or as one comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Many(Vec<String>),
    One(String),
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringList::Many(values) => values,
            StringList::One(value) => vec![value],
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<T>(value: Option<T>, message: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(message))
}

fn parse_uuid(value: &str, label: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {label} format")))
}

fn parse_optional_uuid(value: Option<String>, label: &str) -> Result<Option<Uuid>, ApiError> {
    present(value).map(|v| parse_uuid(&v, label)).transpose()
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| ApiError::bad_request(format!("Invalid date: {value:?}")))
}

fn parse_optional_date(value: Option<String>) -> Result<Option<NaiveDate>, ApiError> {
    present(value).map(|v| parse_date(&v)).transpose()
}

fn parse_optional<T: std::str::FromStr>(value: Option<String>) -> Result<Option<T>, ApiError>
where
    ApiError: From<T::Err>,
{
    Ok(present(value).map(|v| v.parse::<T>()).transpose()?)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDeliveriesRequest {
    /// breakfast, lunch or dinner
    pub meal_type: Option<String>,
    pub delivery_date: Option<String>,
}

impl CreateDeliveriesRequest {
    pub fn validate(self) -> Result<(MealType, NaiveDate), ApiError> {
        const MISSING: &str = "Meal type and delivery date are required";
        let meal_type = required(present(self.meal_type), MISSING)?;
        let delivery_date = required(present(self.delivery_date), MISSING)?;

        let meal_type = meal_type.parse::<MealType>().map_err(|_| {
            ApiError::bad_request("Invalid meal type. Must be breakfast, lunch, or dinner")
        })?;
        Ok((meal_type, parse_date(&delivery_date)?))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDeliveryRequest {
    /// One id, a list of ids, or a comma-joined string of ids
    #[schema(value_type = Option<Vec<String>>)]
    pub delivery_id: Option<StringList>,
    pub delivery_person_id: Option<String>,
}

impl AssignDeliveryRequest {
    pub fn validate(self) -> Result<(Vec<Uuid>, Uuid), ApiError> {
        const MISSING: &str = "Delivery person ID and delivery ID are required";
        let person = required(present(self.delivery_person_id), MISSING)?;
        let ids = required(self.delivery_id, MISSING)?.into_vec();

        let ids = parse_delivery_ids(&ids)?;
        Ok((ids, parse_uuid(&person, "delivery person ID")?))
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpdateDeliveryRequest {
    pub delivery_id: Option<String>,
    pub customer_id: Option<String>,
    /// Delivery status label, case-insensitive
    pub status: Option<String>,
}

impl UpdateDeliveryRequest {
    pub fn validate(self) -> Result<(Uuid, Uuid, DeliveryStatus), ApiError> {
        const MISSING: &str = "delivery_id, customer_id, and status are required";
        let delivery_id = required(present(self.delivery_id), MISSING)?;
        let customer_id = required(present(self.customer_id), MISSING)?;
        let status = required(present(self.status), MISSING)?;

        Ok((
            parse_uuid(&delivery_id, "delivery ID")?,
            parse_uuid(&customer_id, "customer ID")?,
            status.parse()?,
        ))
    }
}

/// Filters for today's deliveries.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TodayDeliveriesQuery {
    pub delivery_person_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<String>,
}

impl TodayDeliveriesQuery {
    pub fn into_filter(self, today: NaiveDate) -> Result<DeliveryFilter, ApiError> {
        Ok(DeliveryFilter {
            delivery_person_id: parse_optional_uuid(self.delivery_person_id, "delivery person ID")?,
            customer_id: parse_optional_uuid(self.customer_id, "customer ID")?,
            delivery_date: Some(today),
            status: parse_optional(self.status)?,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeliverySearchQuery {
    pub delivery_person_id: Option<String>,
    pub customer_id: Option<String>,
    pub delivery_date: Option<String>,
    pub status: Option<String>,
}

impl DeliverySearchQuery {
    pub fn into_filter(self) -> Result<DeliveryFilter, ApiError> {
        let filter = DeliveryFilter {
            delivery_person_id: parse_optional_uuid(self.delivery_person_id, "delivery person ID")?,
            customer_id: parse_optional_uuid(self.customer_id, "customer ID")?,
            delivery_date: parse_optional_date(self.delivery_date)?,
            status: parse_optional(self.status)?,
        };
        if filter.is_empty() {
            return Err(ApiError::bad_request("At least one filter is required"));
        }
        Ok(filter)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserOrderQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String), ApiError> {
        const MISSING: &str = "All fields are required";
        Ok((
            required(present(self.email), MISSING)?,
            required(self.password.filter(|p| !p.is_empty()), MISSING)?,
        ))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token_type: String,
    pub access_token: String,
    pub expires_in: i64,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddStaffRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub contact: Option<String>,
    #[schema(value_type = Option<String>)]
    pub total_salary: Option<BigDecimal>,
    /// admin or staff
    #[serde(alias = "roles")]
    pub role: Option<String>,
}

impl AddStaffRequest {
    pub fn validate(self) -> Result<NewStaffInput, ApiError> {
        const MISSING: &str = "All fields are required";
        Ok(NewStaffInput {
            name: required(present(self.name), MISSING)?,
            email: required(present(self.email), MISSING)?,
            passphrase: required(self.password.filter(|p| !p.is_empty()), MISSING)?,
            contact: required(present(self.contact), MISSING)?,
            total_salary: required(self.total_salary, MISSING)?,
            role: required(present(self.role), MISSING)?.parse()?,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    #[schema(value_type = Option<String>)]
    pub total_salary: Option<BigDecimal>,
    #[serde(alias = "roles")]
    pub role: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<(Uuid, UserChangeset), ApiError> {
        let id = required(present(self.id), "User ID is required")?;
        Ok((
            parse_uuid(&id, "user ID")?,
            UserChangeset {
                name: present(self.name),
                email: present(self.email),
                contact: present(self.contact),
                total_salary: self.total_salary,
                role: parse_optional(self.role)?,
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterQuery {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub total_salary: Option<String>,
    #[serde(alias = "roles")]
    pub role: Option<String>,
}

impl UserFilterQuery {
    pub fn into_filter(self) -> Result<StaffFilter, ApiError> {
        let total_salary = present(self.total_salary)
            .map(|v| {
                v.parse::<BigDecimal>()
                    .map_err(|_| ApiError::bad_request(format!("Invalid total_salary: {v:?}")))
            })
            .transpose()?;

        let filter = StaffFilter {
            id: parse_optional_uuid(self.id, "user ID")?,
            name: present(self.name),
            email: present(self.email),
            contact: present(self.contact),
            total_salary,
            role: parse_optional(self.role)?,
        };
        if filter.is_empty() {
            return Err(ApiError::bad_request("At least one filter is required"));
        }
        Ok(filter)
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RemoveUserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub subscription: Option<String>,
    pub subscription_start_date: Option<String>,
    pub subscription_end_date: Option<String>,
    pub meals: Option<i32>,
    /// Meal slots as a list or a comma-separated string
    #[schema(value_type = Option<Vec<String>>)]
    #[serde(alias = "meals_timeing")]
    pub meals_timing: Option<StringList>,
    /// done / paid or pending
    pub payment: Option<String>,
}

impl AddCustomerRequest {
    pub fn validate(self) -> Result<NewCustomerInput, ApiError> {
        const MISSING: &str = "All fields are required";
        let start = required(present(self.subscription_start_date), MISSING)?;
        let end = required(present(self.subscription_end_date), MISSING)?;
        let slots = required(self.meals_timing, MISSING)?.into_vec();

        Ok(NewCustomerInput {
            name: required(present(self.name), MISSING)?,
            email: required(present(self.email), MISSING)?,
            contact: required(present(self.contact), MISSING)?,
            address: required(present(self.address), MISSING)?,
            subscription: required(present(self.subscription), MISSING)?,
            subscription_start_date: parse_date(&start)?,
            subscription_end_date: parse_date(&end)?,
            meals: required(self.meals, MISSING)?,
            meals_timing: parse_meal_slots(&slots)?,
            payment: required(present(self.payment), MISSING)?.parse::<PaymentStatus>()?,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub subscription: Option<String>,
    pub subscription_start_date: Option<String>,
    pub subscription_end_date: Option<String>,
    pub meals: Option<i32>,
    #[schema(value_type = Option<Vec<String>>)]
    #[serde(alias = "meals_timeing")]
    pub meals_timing: Option<StringList>,
    pub payment: Option<String>,
}

impl UpdateCustomerRequest {
    pub fn validate(self) -> Result<(Uuid, CustomerChangeset), ApiError> {
        let id = required(present(self.id), "Customer ID is required")?;
        let meals_timing = match self.meals_timing {
            Some(slots) => Some(
                parse_meal_slots(&slots.into_vec())?
                    .iter()
                    .map(|slot| slot.as_str().to_string())
                    .collect(),
            ),
            None => None,
        };

        Ok((
            parse_uuid(&id, "customer ID")?,
            CustomerChangeset {
                name: present(self.name),
                email: present(self.email),
                contact: present(self.contact),
                address: present(self.address),
                subscription: present(self.subscription),
                subscription_start_date: parse_optional_date(self.subscription_start_date)?,
                subscription_end_date: parse_optional_date(self.subscription_end_date)?,
                meals: self.meals,
                meals_timing,
                payment: parse_optional(self.payment)?,
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerFilterQuery {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub subscription: Option<String>,
    pub subscription_start_date: Option<String>,
    pub subscription_end_date: Option<String>,
}

impl CustomerFilterQuery {
    pub fn into_filter(self) -> Result<CustomerFilter, ApiError> {
        Ok(CustomerFilter {
            id: parse_optional_uuid(self.id, "customer ID")?,
            name: present(self.name),
            email: present(self.email),
            contact: present(self.contact),
            address: present(self.address),
            subscription: present(self.subscription),
            subscription_start_date: parse_optional_date(self.subscription_start_date)?,
            subscription_end_date: parse_optional_date(self.subscription_end_date)?,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RemoveCustomerQuery {
    #[serde(alias = "coustomer_id")]
    pub customer_id: Option<String>,
}

pub fn require_id(value: Option<String>, missing: &str, label: &str) -> Result<Uuid, ApiError> {
    let value = required(present(value), missing)?;
    parse_uuid(&value, label)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAttendanceRequest {
    pub user_id: Option<String>,
    pub date: Option<String>,
    /// present or absent
    pub status: Option<String>,
}

impl AddAttendanceRequest {
    pub fn validate(self) -> Result<(Uuid, NaiveDate, AttendanceStatus), ApiError> {
        const MISSING: &str = "All fields are required";
        let user_id = required(present(self.user_id), MISSING)?;
        let date = required(present(self.date), MISSING)?;
        let status = required(present(self.status), MISSING)?;

        Ok((
            parse_uuid(&user_id, "user ID")?,
            parse_date(&date)?,
            status.parse()?,
        ))
    }
}

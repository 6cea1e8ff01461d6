use std::fmt;
use std::io::Write;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::{attendances, customers, deliveries, users};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lowercases and folds spaces and dashes to underscores so that
/// `"ND IOT"`, `"nd-iot"` and `"nd_iot"` compare equal.
fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::MealType)]
#[serde(try_from = "String", into = "&'static str", rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl FromStr for MealType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            _ => Err(ParseEnumError::new("meal type", s)),
        }
    }
}

impl ToSql<crate::schema::sql_types::MealType, Pg> for MealType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            MealType::Breakfast => out.write_all(b"BREAKFAST")?,
            MealType::Lunch => out.write_all(b"LUNCH")?,
            MealType::Dinner => out.write_all(b"DINNER")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::MealType, Pg> for MealType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"BREAKFAST" => Ok(MealType::Breakfast),
            b"LUNCH" => Ok(MealType::Lunch),
            b"DINNER" => Ok(MealType::Dinner),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

/// Status of a single delivery.
///
/// `NdIot` and `NdIl` are the "not delivered" outcome codes recorded by
/// delivery staff. Only [`DeliveryStatus::Delivered`] consumes a meal credit.
#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::DeliveryStatus)]
#[serde(try_from = "String", into = "&'static str", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    Delivered,
    Cancelled,
    NdIot,
    NdIl,
    TakenExtraTiffin,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
            DeliveryStatus::NdIot => "nd_iot",
            DeliveryStatus::NdIl => "nd_il",
            DeliveryStatus::TakenExtraTiffin => "taken_extra_tiffin",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "pending" => Ok(DeliveryStatus::Pending),
            "assigned" => Ok(DeliveryStatus::Assigned),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "cancelled" | "canceled" => Ok(DeliveryStatus::Cancelled),
            "nd_iot" => Ok(DeliveryStatus::NdIot),
            "nd_il" => Ok(DeliveryStatus::NdIl),
            "taken_extra_tiffin" => Ok(DeliveryStatus::TakenExtraTiffin),
            _ => Err(ParseEnumError::new("delivery status", s)),
        }
    }
}

impl ToSql<crate::schema::sql_types::DeliveryStatus, Pg> for DeliveryStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            DeliveryStatus::Pending => out.write_all(b"PENDING")?,
            DeliveryStatus::Assigned => out.write_all(b"ASSIGNED")?,
            DeliveryStatus::Delivered => out.write_all(b"DELIVERED")?,
            DeliveryStatus::Cancelled => out.write_all(b"CANCELLED")?,
            DeliveryStatus::NdIot => out.write_all(b"ND_IOT")?,
            DeliveryStatus::NdIl => out.write_all(b"ND_IL")?,
            DeliveryStatus::TakenExtraTiffin => out.write_all(b"TAKEN_EXTRA_TIFFIN")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::DeliveryStatus, Pg> for DeliveryStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"PENDING" => Ok(DeliveryStatus::Pending),
            b"ASSIGNED" => Ok(DeliveryStatus::Assigned),
            b"DELIVERED" => Ok(DeliveryStatus::Delivered),
            b"CANCELLED" => Ok(DeliveryStatus::Cancelled),
            b"ND_IOT" => Ok(DeliveryStatus::NdIot),
            b"ND_IL" => Ok(DeliveryStatus::NdIl),
            b"TAKEN_EXTRA_TIFFIN" => Ok(DeliveryStatus::TakenExtraTiffin),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, ToSchema, PartialEq, Eq, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::PaymentStatus)]
#[serde(try_from = "String", into = "&'static str", rename_all = "snake_case")]
pub enum PaymentStatus {
    Done,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Done => "done",
            PaymentStatus::Pending => "pending",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "done" | "paid" => Ok(PaymentStatus::Done),
            "pending" => Ok(PaymentStatus::Pending),
            _ => Err(ParseEnumError::new("payment status", s)),
        }
    }
}

impl ToSql<crate::schema::sql_types::PaymentStatus, Pg> for PaymentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            PaymentStatus::Done => out.write_all(b"DONE")?,
            PaymentStatus::Pending => out.write_all(b"PENDING")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::PaymentStatus, Pg> for PaymentStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"DONE" => Ok(PaymentStatus::Done),
            b"PENDING" => Ok(PaymentStatus::Pending),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, ToSchema, PartialEq, Eq, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::UserRole)]
#[serde(try_from = "String", into = "&'static str", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

impl ToSql<crate::schema::sql_types::UserRole, Pg> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            Role::Admin => out.write_all(b"ADMIN")?,
            Role::Staff => out.write_all(b"STAFF")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::UserRole, Pg> for Role {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"ADMIN" => Ok(Role::Admin),
            b"STAFF" => Ok(Role::Staff),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(
    FromSqlRow, AsExpression, Serialize, Deserialize, ToSchema, PartialEq, Eq, Copy, Clone, Debug,
)]
#[diesel(sql_type = crate::schema::sql_types::AttendanceStatus)]
#[serde(try_from = "String", into = "&'static str", rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            _ => Err(ParseEnumError::new("attendance status", s)),
        }
    }
}

impl ToSql<crate::schema::sql_types::AttendanceStatus, Pg> for AttendanceStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            AttendanceStatus::Present => out.write_all(b"PRESENT")?,
            AttendanceStatus::Absent => out.write_all(b"ABSENT")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::AttendanceStatus, Pg> for AttendanceStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"PRESENT" => Ok(AttendanceStatus::Present),
            b"ABSENT" => Ok(AttendanceStatus::Absent),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

macro_rules! impl_wire_label {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl From<$ty> for &'static str {
                fn from(value: $ty) -> Self {
                    value.as_str()
                }
            }

            impl TryFrom<String> for $ty {
                type Error = ParseEnumError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )*
    };
}

impl_wire_label!(MealType, DeliveryStatus, PaymentStatus, Role, AttendanceStatus);

#[derive(Queryable, Selectable, Identifiable, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub subscription: String,
    pub subscription_start_date: NaiveDate,
    pub subscription_end_date: NaiveDate,
    /// Remaining meal credit.
    pub meals: i32,
    pub meals_timing: Vec<String>,
    pub payment: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = customers)]
pub struct NewCustomer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub subscription: String,
    pub subscription_start_date: NaiveDate,
    pub subscription_end_date: NaiveDate,
    pub meals: i32,
    pub meals_timing: Vec<String>,
    pub payment: PaymentStatus,
}

#[derive(AsChangeset, Default, Debug, PartialEq)]
#[diesel(table_name = customers)]
pub struct CustomerChangeset {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub subscription: Option<String>,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
    pub meals: Option<i32>,
    pub meals_timing: Option<Vec<String>>,
    pub payment: Option<PaymentStatus>,
}

impl CustomerChangeset {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Display fields of a customer attached to delivery listings.
#[derive(Queryable, Selectable, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[diesel(table_name = customers)]
pub struct CustomerContact {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub contact: String,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Serialize, ToSchema, Debug, Clone, PartialEq,
)]
#[diesel(belongs_to(Customer))]
#[diesel(table_name = deliveries)]
pub struct Delivery {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub delivery_person_id: Option<Uuid>,
    pub delivery_date: NaiveDate,
    pub meal_type: MealType,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = deliveries)]
pub struct NewDelivery {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub delivery_date: NaiveDate,
    pub meal_type: MealType,
    pub status: DeliveryStatus,
}

impl NewDelivery {
    pub fn pending(customer_id: Uuid, meal_type: MealType, delivery_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            delivery_date,
            meal_type,
            status: DeliveryStatus::Pending,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub passphrase_hash: String,
    pub contact: String,
    #[schema(value_type = String)]
    pub total_salary: BigDecimal,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub passphrase_hash: String,
    pub contact: String,
    pub total_salary: BigDecimal,
    pub role: Role,
}

#[derive(AsChangeset, Default, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub total_salary: Option<BigDecimal>,
    pub role: Option<Role>,
}

impl UserChangeset {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Display fields of a staff member attached to delivery and attendance listings.
#[derive(Queryable, Selectable, Serialize, ToSchema, Debug, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct StaffContact {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Serialize, ToSchema, Debug, Clone, PartialEq,
)]
#[diesel(belongs_to(User))]
#[diesel(table_name = attendances)]
pub struct Attendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = attendances)]
pub struct NewAttendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_status_accepts_ui_labels() {
        assert_eq!("Delivered".parse(), Ok(DeliveryStatus::Delivered));
        assert_eq!(" DELIVERED ".parse(), Ok(DeliveryStatus::Delivered));
        assert_eq!("ND IOT".parse(), Ok(DeliveryStatus::NdIot));
        assert_eq!("nd-il".parse(), Ok(DeliveryStatus::NdIl));
        assert_eq!(
            "Taken Extra Tiffin".parse(),
            Ok(DeliveryStatus::TakenExtraTiffin)
        );
        assert_eq!("canceled".parse(), Ok(DeliveryStatus::Cancelled));
    }

    #[test]
    fn delivery_status_rejects_unknown_label() {
        let err = "completed".parse::<DeliveryStatus>().unwrap_err();
        assert_eq!(err.kind, "delivery status");
        assert_eq!(err.value, "completed");
    }

    #[test]
    fn meal_type_is_normalized() {
        assert_eq!("  Lunch".parse(), Ok(MealType::Lunch));
        assert_eq!("BREAKFAST".parse(), Ok(MealType::Breakfast));
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn enums_serialize_as_wire_labels() {
        let json = serde_json::to_string(&DeliveryStatus::TakenExtraTiffin).unwrap();
        assert_eq!(json, "\"taken_extra_tiffin\"");

        let status: DeliveryStatus = serde_json::from_str("\"ND IL\"").unwrap();
        assert_eq!(status, DeliveryStatus::NdIl);

        assert!(serde_json::from_str::<Role>("\"owner\"").is_err());
    }
}

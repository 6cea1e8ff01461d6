//! Rules of the delivery lifecycle that do not need the database.
//!
//! The store modules load rows, ask these functions what should happen,
//! and persist the outcome inside a single transaction.

use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{AttendanceStatus, DeliveryStatus, MealType};

/// A requested change of a delivery's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub previous: DeliveryStatus,
    pub next: DeliveryStatus,
}

impl StatusTransition {
    pub fn new(previous: DeliveryStatus, next: DeliveryStatus) -> Self {
        Self { previous, next }
    }

    /// Only a transition *into* delivered consumes a meal. There is no
    /// billed marker, so delivered -> pending -> delivered consumes twice.
    pub fn consumes_meal(&self) -> bool {
        self.next == DeliveryStatus::Delivered && self.previous != DeliveryStatus::Delivered
    }
}

/// Returns the balance left after one meal is consumed.
pub fn consume_meal(balance: i32) -> Result<i32, ServiceError> {
    if balance <= 0 {
        return Err(ServiceError::CreditExhausted);
    }
    Ok(balance - 1)
}

/// Parses delivery ids sent either as a list or as comma-joined strings.
/// Duplicates are dropped, order is kept.
pub fn parse_delivery_ids<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Uuid>, ServiceError> {
    let mut ids = Vec::new();
    for part in raw.iter().flat_map(|s| s.as_ref().split(',')) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse::<Uuid>()
            .map_err(|_| ServiceError::invalid(format!("Invalid delivery id: {part}")))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(ServiceError::invalid(
            "Delivery person ID and delivery ID are required",
        ));
    }
    Ok(ids)
}

/// Parses a comma-separated list of meal slots such as `"lunch, dinner"`.
pub fn parse_meal_slots<S: AsRef<str>>(raw: &[S]) -> Result<Vec<MealType>, ServiceError> {
    let mut slots = Vec::new();
    for part in raw.iter().flat_map(|s| s.as_ref().split(',')) {
        if part.trim().is_empty() {
            continue;
        }
        let slot = part.parse::<MealType>()?;
        if !slots.contains(&slot) {
            slots.push(slot);
        }
    }
    if slots.is_empty() {
        return Err(ServiceError::invalid("At least one meal timing is required"));
    }
    Ok(slots)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceChange {
    Create,
    Update,
}

/// Decides how marking attendance for a day applies to the existing record.
pub fn attendance_change(
    existing: Option<AttendanceStatus>,
    requested: AttendanceStatus,
) -> Result<AttendanceChange, ServiceError> {
    match existing {
        None => Ok(AttendanceChange::Create),
        Some(current) if current != requested => Ok(AttendanceChange::Update),
        Some(_) => Err(ServiceError::DuplicateAttendance),
    }
}

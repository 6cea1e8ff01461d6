use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::ServiceError;

pub mod attendance;
pub mod customer;
pub mod delivery;
pub mod staff;

pub use attendance::{AttendanceMark, AttendanceStore, AttendanceWithUser};
pub use customer::{CustomerFilter, CustomerStore, NewCustomerInput};
pub use delivery::{DashboardSummary, DeliveryDetails, DeliveryFilter, DeliveryStore, StatusChange};
pub use staff::{NewStaffInput, StaffFilter, StaffStore};

/// Maps a unique-key violation to [`ServiceError::AlreadyExists`].
fn map_unique_violation(entity: &'static str) -> impl FnOnce(DieselError) -> ServiceError {
    move |err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ServiceError::AlreadyExists(entity)
        }
        err => ServiceError::Database(err),
    }
}

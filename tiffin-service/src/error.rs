use thiserror::Error;

use crate::models::ParseEnumError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(&'static str),
    #[error("No meals left in subscription")]
    CreditExhausted,
    #[error("Attendance already marked with same status")]
    DuplicateAttendance,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("cannot hash passphrase: {0}")]
    PassphraseHash(String),
    #[error("cannot connect to database")]
    Connection(#[from] diesel::ConnectionError),
    #[error("database error")]
    Database(#[from] diesel::result::Error),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        ServiceError::NotFound(format!("{entity} not found"))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }
}

impl From<ParseEnumError> for ServiceError {
    fn from(err: ParseEnumError) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

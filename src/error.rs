use std::fmt;

use actix_web::{http::StatusCode, ResponseError};
use thiserror::Error;

/// PostgreSQL error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
pub const CHECK_VIOLATION: &str = "23514";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{message} (code {code})")]
    Rejected { code: String, message: String },

    #[error("not signed in")]
    Unauthenticated,

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("local storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl GatewayError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Type,
    Location,
    Description,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Type => "type",
            Field::Location => "location",
            Field::Description => "description",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("required fields missing: {0}")]
    MissingField(Field),

    #[error("invalid rating {0}, expected a value between 1 and 5")]
    InvalidRating(i64),

    #[error("no location selected on the map")]
    MissingLocation,

    #[error("invalid coordinates {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("email and password are required")]
    MissingCredentials,
}

/// What the viewer was trying to do when an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddPlace,
    Like,
    Report,
    UploadPhoto,
    SignIn,
    SignUp,
    SignOut,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::AddPlace => "add a place",
            Action::Like => "like a place",
            Action::Report => "report a place",
            Action::UploadPhoto => "upload a photo",
            Action::SignIn => "sign in",
            Action::SignUp => "sign up",
            Action::SignOut => "sign out",
        })
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("you must be signed in to {0}")]
    SignInRequired(Action),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("unknown place {0}")]
    UnknownPlace(String),

    #[error("sign in rejected: {0}")]
    CredentialsRejected(GatewayError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::SignInRequired(_) => StatusCode::UNAUTHORIZED,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::UnknownPlace(_) => StatusCode::NOT_FOUND,
            StoreError::CredentialsRejected(_) => StatusCode::UNAUTHORIZED,
            StoreError::Gateway(GatewayError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            StoreError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_recognised_by_code() {
        assert!(GatewayError::rejected(UNIQUE_VIOLATION, "duplicate key").is_unique_violation());
        assert!(!GatewayError::rejected(CHECK_VIOLATION, "rating").is_unique_violation());
        assert!(!GatewayError::Unauthenticated.is_unique_violation());
    }

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(
            StoreError::SignInRequired(Action::Like).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StoreError::from(ValidationError::InvalidRating(6)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StoreError::from(GatewayError::rejected("XX000", "boom")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            StoreError::CredentialsRejected(GatewayError::rejected("invalid_grant", "bad password"))
                .status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn messages_name_the_action_and_field() {
        assert_eq!(
            StoreError::SignInRequired(Action::AddPlace).to_string(),
            "you must be signed in to add a place"
        );
        assert_eq!(
            ValidationError::MissingField(Field::Name).to_string(),
            "required fields missing: name"
        );
    }
}

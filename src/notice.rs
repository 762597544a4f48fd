use std::fmt;

use serde::Serialize;

use crate::error::{Action, ValidationError};

/// User-facing notification published by [crate::sync::PlaceStore].
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    PlaceAdded { name: String },
    ReportSent,
    AlreadyReported,
    PhotoUploaded { url: String },
    AccountCreated,
    SignedIn,
    SignInRequired { action: String },
    Invalid { message: String },
    LoadFailed { message: String },
    ActionFailed { action: String, message: String },
}

impl Notice {
    pub fn sign_in_required(action: Action) -> Self {
        Notice::SignInRequired {
            action: action.to_string(),
        }
    }

    pub fn invalid(err: &ValidationError) -> Self {
        Notice::Invalid {
            message: err.to_string(),
        }
    }

    pub fn action_failed(action: Action, message: impl fmt::Display) -> Self {
        Notice::ActionFailed {
            action: action.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::AlreadyReported
                | Notice::SignInRequired { .. }
                | Notice::Invalid { .. }
                | Notice::LoadFailed { .. }
                | Notice::ActionFailed { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PlaceAdded { name } => write!(f, "{name} was added"),
            Notice::ReportSent => f.write_str("Thanks for reporting this place"),
            Notice::AlreadyReported => f.write_str("You already reported this place"),
            Notice::PhotoUploaded { .. } => f.write_str("Photo uploaded"),
            Notice::AccountCreated => f.write_str("Account created, check your email to confirm it"),
            Notice::SignedIn => f.write_str("Signed in"),
            Notice::SignInRequired { action } => write!(f, "You must be signed in to {action}"),
            Notice::Invalid { message } => f.write_str(message),
            Notice::LoadFailed { message } => write!(f, "Could not load places: {message}"),
            Notice::ActionFailed { action, message } => {
                write!(f, "Could not {action}: {message}")
            }
        }
    }
}

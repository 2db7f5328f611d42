//! Error taxonomy of the user actions and the envelope every result is
//! normalized into before rendering.

use crate::{repo::StoreError, services::AuthError};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field name to human readable message. Empty means the form passed.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ActionError {
    #[display("Please fix the highlighted fields")]
    Validation(#[error(not(source))] FieldErrors),

    #[display("You don't have permission to perform this action")]
    PermissionDenied,

    #[display("{message}")]
    NotFound {
        message: String,
        suggestions: Vec<String>,
    },

    #[display("{_0}")]
    Conflict(#[error(not(source))] String),

    #[display("This tag was already claimed by another user")]
    AlreadyClaimed,

    #[display("This action needs to be confirmed")]
    NeedsConfirmation,

    #[display("Data integrity problem: {_0}")]
    IntegrityDefect(#[error(not(source))] String),

    /// The pet was saved but the tag could not be linked to it
    #[display("{message}")]
    PartialClaim { pet_id: Uuid, message: String },

    #[display("Something went wrong, please try again: {_0}")]
    Transport(#[error(not(source))] String),
}

impl ActionError {
    /// Classifies a failure raised by the store or the auth provider
    pub fn from_store(err: anyhow::Error) -> Self {
        if let Some(store_error) = err.downcast_ref::<StoreError>() {
            return match store_error {
                StoreError::PermissionDenied => ActionError::PermissionDenied,
                StoreError::Conflict(message) => ActionError::Conflict(message.to_string()),
                StoreError::Transport(message) => ActionError::Transport(message.to_string()),
            };
        }

        if let Some(auth_error) = err.downcast_ref::<AuthError>() {
            return match auth_error {
                AuthError::InvalidCredentials => ActionError::Validation(FieldErrors::from([(
                    "email",
                    auth_error.to_string(),
                )])),
                AuthError::EmailTaken => ActionError::Conflict(auth_error.to_string()),
                AuthError::Transport(message) => ActionError::Transport(message.to_string()),
            };
        }

        ActionError::Transport(err.to_string())
    }

    pub fn title(&self) -> &'static str {
        match self {
            ActionError::Validation(_) => "Invalid data",
            ActionError::PermissionDenied => "Not allowed",
            ActionError::NotFound { .. } => "Not found",
            ActionError::Conflict(_) => "Conflict",
            ActionError::AlreadyClaimed => "Tag unavailable",
            ActionError::NeedsConfirmation => "Confirm action",
            ActionError::IntegrityDefect(_) => "Data problem",
            ActionError::PartialClaim { .. } => "Partially saved",
            ActionError::Transport(_) => "Error",
        }
    }

    pub fn field_errors(&self) -> FieldErrors {
        match self {
            ActionError::Validation(errors) => errors.clone(),
            _ => FieldErrors::new(),
        }
    }
}

/// Transient toast shown once on the next rendered page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

impl From<&ActionError> for Notification {
    fn from(err: &ActionError) -> Self {
        match err {
            ActionError::Validation(errors) if !errors.is_empty() => Notification::new(
                err.title(),
                &errors.values().cloned().collect::<Vec<String>>().join(". "),
            ),
            _ => Notification::new(err.title(), &err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<Notification>,
}

impl<T: Serialize> From<Result<T, ActionError>> for ActionResult<T> {
    fn from(result: Result<T, ActionError>) -> Self {
        match result {
            Ok(data) => ActionResult {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => ActionResult {
                success: false,
                data: None,
                error: Some(Notification::from(&err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_classification() {
        assert_eq!(
            ActionError::from_store(StoreError::PermissionDenied.into()),
            ActionError::PermissionDenied
        );
        assert_eq!(
            ActionError::from_store(StoreError::Conflict("tags_code_key".into()).into()),
            ActionError::Conflict("tags_code_key".into())
        );
        assert_eq!(
            ActionError::from_store(anyhow::anyhow!("connection reset")),
            ActionError::Transport("connection reset".into())
        );
        assert!(matches!(
            ActionError::from_store(AuthError::InvalidCredentials.into()),
            ActionError::Validation(errors) if errors.contains_key("email")
        ));
    }

    #[test]
    fn test_permission_message_does_not_leak_policy() {
        let message = ActionError::PermissionDenied.to_string();

        assert!(!message.to_lowercase().contains("policy"));
        assert!(!message.to_lowercase().contains("row"));
    }

    #[test]
    fn test_action_result_envelope() {
        let ok: ActionResult<u8> = Ok(7).into();
        assert!(ok.success);
        assert_eq!(ok.data, Some(7));
        assert!(ok.error.is_none());

        let failed: ActionResult<u8> = Err(ActionError::AlreadyClaimed).into();
        assert!(!failed.success);
        assert!(failed.data.is_none());
        assert_eq!(failed.error.map(|e| e.title), Some("Tag unavailable".to_string()));
    }

    #[test]
    fn test_validation_notification_lists_fields() {
        let err = ActionError::Validation(FieldErrors::from([
            ("code", "Enter the code".to_string()),
            ("name", "Too short".to_string()),
        ]));

        assert_eq!(
            Notification::from(&err).body,
            "Enter the code. Too short"
        );
    }
}

//! Error types for form operations.
//!
//! Validation failures that arrive as error trees are not errors in this
//! sense: they are stored in the form and surface through derived props.
//! The variants here cover what cannot be represented that way.

use thiserror::Error;

/// Structured error types for form operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormError {
    /// An async validator rejected with something other than an error tree
    #[error("Async validation failed for form '{form}': {reason}")]
    AsyncValidationFailure { form: String, reason: String },

    /// A submit handler rejected with something other than an error tree
    #[error("Submit failed for form '{form}': {reason}")]
    SubmitFailure { form: String, reason: String },

    /// Submit was requested without a submit handler
    #[error("No submit handler for form '{form}'")]
    MissingSubmitHandler { form: String },

    /// Persisted form state does not have the expected layout
    #[error("Invalid form state layout: {reason}")]
    InvalidState { reason: String },
}

impl FormError {
    /// Check if this error came from async validation
    pub fn is_async_validation_failure(&self) -> bool {
        matches!(self, FormError::AsyncValidationFailure { .. })
    }

    /// Check if this error came from a submit handler
    pub fn is_submit_failure(&self) -> bool {
        matches!(self, FormError::SubmitFailure { .. })
    }

    /// Check if this error means the stored state could not be read
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, FormError::InvalidState { .. })
    }

    /// Get the form name if this error is tied to one
    pub fn form(&self) -> Option<&str> {
        match self {
            FormError::AsyncValidationFailure { form, .. }
            | FormError::SubmitFailure { form, .. }
            | FormError::MissingSubmitHandler { form } => Some(form),
            FormError::InvalidState { .. } => None,
        }
    }
}

// Conversion from FormError to the main Error type
impl From<FormError> for crate::Error {
    fn from(err: FormError) -> Self {
        crate::Error::Form(err)
    }
}

//!
//! formstate: form state management over structurally shared trees.
//!
//! This library keeps the state of multi-field, arbitrarily nested forms
//! (values, validation errors, interaction flags) and derives the props a UI
//! layer renders from. Every update shares all unchanged subtrees with the
//! previous state, so a consumer can skip work for any field whose inputs are
//! pointer-equal.
//!
//! ## Core Concepts
//!
//! * **Paths (`path::FieldPath`)**: Parsed field names such as `"users[2].name"`.
//! * **Structures (`structure::Structure`)**: The capability set over one nested-container
//!   representation. Two are provided:
//!     * **Plain (`structure::Plain`)**: `Arc`-wrapped `BTreeMap`s and `Vec`s.
//!     * **Persistent (`structure::Persistent`)**: `imbl` persistent collections (requires the
//!       "persistent" feature).
//! * **Reducer (`form::FormReducer`)**: The pure `(forms, action) -> forms` transition.
//! * **Derivations (`derive`)**: Per-field views (`derive::FieldView`), form-level flags
//!   (`derive::FormSummary`), and a memoizing props selector (`derive::PropsSelector`).
//! * **Validation (`validation`)**: Synchronous and asynchronous validator traits and the
//!   gating rule deciding when async validation runs.
//! * **Controller (`controller::FormController`)**: Drives one form against a `store::FormStore`,
//!   running validation and the submit flow.

pub mod config;
pub mod controller;
pub mod derive;
pub mod form;
pub mod path;
pub mod store;
pub mod structure;
pub mod validation;

pub use config::FormConfig;
pub use controller::FormController;
pub use form::{Action, FormAction, FormReducer, FormState, Forms, get_form_state};
pub use path::{FieldPath, FieldPattern};
pub use store::{Dispatch, FormStore};
pub use structure::{Plain, Structure};

#[cfg(feature = "persistent")]
pub use structure::Persistent;

/// Result type used throughout the formstate library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the formstate library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Malformed field names
    #[error(transparent)]
    Path(path::PathError),

    /// Structured errors from the form module
    #[error(transparent)]
    Form(form::FormError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Path(_) => "path",
            Error::Form(_) => "form",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error is a malformed field name.
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, Error::Path(_))
    }

    /// Check if this error came from a rejected async validation.
    pub fn is_async_validation_failure(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_async_validation_failure(),
            _ => false,
        }
    }

    /// Check if this error came from a rejected submit.
    pub fn is_submit_failure(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_submit_failure(),
            _ => false,
        }
    }

    /// Check if this error means stored state could not be read.
    pub fn is_invalid_state(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_invalid_state(),
            _ => false,
        }
    }
}

impl From<path::PathError> for Error {
    fn from(err: path::PathError) -> Self {
        Error::Path(err)
    }
}

//! Validator traits and the rules deciding when they run.
//!
//! Validators see values in their plain JSON form regardless of the
//! structure a form uses, and report failures as error trees: JSON objects
//! shaped like the values, with a whole-form error under `"_error"`.
//!
//! - [`Validate`] is synchronous. Its result is recomputed on every read and
//!   never stored.
//! - [`AsyncValidate`] may suspend. A rejection with an error tree is stored
//!   as the form's async errors.
//! - [`OnSubmit`] receives the values once validation passes. A rejection
//!   with an error tree is stored as the form's submit errors.
//!
//! Closures implement all three traits:
//!
//! ```
//! use formstate::validation::{Validate, has_errors};
//! use serde_json::{json, Value};
//!
//! let required = |values: &Value, _props: &Value| {
//!     if values["email"].is_string() {
//!         json!({})
//!     } else {
//!         json!({"email": "Required"})
//!     }
//! };
//! assert!(has_errors(&required.validate(&json!({}), &json!({}))));
//! ```

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::{path::FieldPath, store::Dispatch};

/// Synchronous validation: values in, error tree out.
pub trait Validate: Send + Sync {
    fn validate(&self, values: &JsonValue, props: &JsonValue) -> JsonValue;
}

impl<F> Validate for F
where
    F: Fn(&JsonValue, &JsonValue) -> JsonValue + Send + Sync,
{
    fn validate(&self, values: &JsonValue, props: &JsonValue) -> JsonValue {
        self(values, props)
    }
}

/// Asynchronous validation.
///
/// Resolves with `Ok(())` when the values are valid. A rejection carrying a
/// JSON object is an error tree; any other rejection is an unexpected
/// failure and is propagated to the caller as an error.
#[async_trait]
pub trait AsyncValidate: Send + Sync {
    async fn validate(
        &self,
        values: &JsonValue,
        dispatch: &dyn Dispatch,
        props: &JsonValue,
    ) -> Result<(), JsonValue>;
}

#[async_trait]
impl<F, Fut> AsyncValidate for F
where
    F: Fn(JsonValue, JsonValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JsonValue>> + Send + 'static,
{
    async fn validate(
        &self,
        values: &JsonValue,
        _dispatch: &dyn Dispatch,
        props: &JsonValue,
    ) -> Result<(), JsonValue> {
        self(values.clone(), props.clone()).await
    }
}

/// Submit handler.
///
/// Resolves with an optional result passed back to the caller of submit.
/// Rejections follow the same rules as [`AsyncValidate`].
#[async_trait]
pub trait OnSubmit: Send + Sync {
    async fn submit(
        &self,
        values: &JsonValue,
        dispatch: &dyn Dispatch,
        props: &JsonValue,
    ) -> Result<Option<JsonValue>, JsonValue>;
}

#[async_trait]
impl<F, Fut> OnSubmit for F
where
    F: Fn(JsonValue, JsonValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<JsonValue>, JsonValue>> + Send + 'static,
{
    async fn submit(
        &self,
        values: &JsonValue,
        _dispatch: &dyn Dispatch,
        props: &JsonValue,
    ) -> Result<Option<JsonValue>, JsonValue> {
        self(values.clone(), props.clone()).await
    }
}

/// What prompted a round of async validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A field lost focus.
    Blur(FieldPath),
    /// The form is being submitted.
    Submit,
    /// The host asked for validation directly.
    Manual,
}

/// Decides whether async validation runs for `trigger`.
///
/// Blur runs only while the blurred field itself passes synchronous
/// validation, and never for a form that is pristine and already
/// initialized. Errors on other fields do not hold it back. Submit and
/// manual triggers always run.
pub fn should_async_validate(
    trigger: &Trigger,
    pristine: bool,
    initialized: bool,
    field_sync_passes: bool,
) -> bool {
    match trigger {
        Trigger::Submit | Trigger::Manual => true,
        Trigger::Blur(_) => field_sync_passes && !(pristine && initialized),
    }
}

/// Returns true if `errors` holds at least one non-blank error.
///
/// `null`, `""`, and containers holding only those are blank.
pub fn has_errors(errors: &JsonValue) -> bool {
    match errors {
        JsonValue::Null => false,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => items.iter().any(has_errors),
        JsonValue::Object(map) => map.values().any(has_errors),
        _ => true,
    }
}

/// Runs an optional synchronous validator. No validator means no errors.
pub fn run_sync(validate: Option<&dyn Validate>, values: &JsonValue, props: &JsonValue) -> JsonValue {
    match validate {
        Some(validate) => validate.validate(values, props),
        None => JsonValue::Object(Default::default()),
    }
}

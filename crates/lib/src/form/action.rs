//! Actions understood by the form reducer.
//!
//! Actions serialize as flat JSON objects tagged by `type`, with the form
//! name alongside the payload:
//!
//! ```
//! use formstate::form::{Action, FormAction};
//! use serde_json::json;
//!
//! let action: FormAction = serde_json::from_value(json!({
//!     "type": "CHANGE",
//!     "form": "contact",
//!     "name": "phones[0].number",
//!     "value": "555-0100",
//! }))?;
//! assert_eq!(action.action.name(), "CHANGE");
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::FieldKind;
use crate::path::{FieldPath, PathError};

fn default_true() -> bool {
    true
}

/// A state transition for a single form.
///
/// Payload values and error trees are plain JSON; the reducer converts them
/// into its own representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    RegisterField {
        name: FieldPath,
        #[serde(rename = "fieldType", default)]
        kind: FieldKind,
    },
    UnregisterField {
        name: FieldPath,
        /// Remove the field's data once its last registration is gone.
        #[serde(default = "default_true")]
        destroy: bool,
    },
    Initialize {
        values: JsonValue,
    },
    Change {
        name: FieldPath,
        value: JsonValue,
        /// Also mark the field touched.
        #[serde(default)]
        touch: bool,
    },
    Blur {
        name: FieldPath,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<JsonValue>,
        #[serde(default = "default_true")]
        touch: bool,
    },
    Focus {
        name: FieldPath,
    },
    ArrayPush {
        name: FieldPath,
        value: JsonValue,
    },
    ArrayPop {
        name: FieldPath,
    },
    ArrayShift {
        name: FieldPath,
    },
    ArrayUnshift {
        name: FieldPath,
        value: JsonValue,
    },
    ArrayInsert {
        name: FieldPath,
        index: usize,
        value: JsonValue,
    },
    ArrayRemove {
        name: FieldPath,
        index: usize,
    },
    ArraySwap {
        name: FieldPath,
        index_a: usize,
        index_b: usize,
    },
    Reset,
    StartAsyncValidation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<FieldPath>,
    },
    StopAsyncValidation {
        #[serde(default)]
        errors: Option<JsonValue>,
    },
    StartSubmit,
    StopSubmit {
        #[serde(default)]
        errors: Option<JsonValue>,
    },
    Touch {
        names: Vec<FieldPath>,
    },
    Untouch {
        names: Vec<FieldPath>,
    },
    Destroy,
}

impl Action {
    /// The wire tag of this action, e.g. `"ARRAY_PUSH"`.
    pub fn name(&self) -> &'static str {
        match self {
            Action::RegisterField { .. } => "REGISTER_FIELD",
            Action::UnregisterField { .. } => "UNREGISTER_FIELD",
            Action::Initialize { .. } => "INITIALIZE",
            Action::Change { .. } => "CHANGE",
            Action::Blur { .. } => "BLUR",
            Action::Focus { .. } => "FOCUS",
            Action::ArrayPush { .. } => "ARRAY_PUSH",
            Action::ArrayPop { .. } => "ARRAY_POP",
            Action::ArrayShift { .. } => "ARRAY_SHIFT",
            Action::ArrayUnshift { .. } => "ARRAY_UNSHIFT",
            Action::ArrayInsert { .. } => "ARRAY_INSERT",
            Action::ArrayRemove { .. } => "ARRAY_REMOVE",
            Action::ArraySwap { .. } => "ARRAY_SWAP",
            Action::Reset => "RESET",
            Action::StartAsyncValidation { .. } => "START_ASYNC_VALIDATION",
            Action::StopAsyncValidation { .. } => "STOP_ASYNC_VALIDATION",
            Action::StartSubmit => "START_SUBMIT",
            Action::StopSubmit { .. } => "STOP_SUBMIT",
            Action::Touch { .. } => "TOUCH",
            Action::Untouch { .. } => "UNTOUCH",
            Action::Destroy => "DESTROY",
        }
    }

    /// The single field this action addresses, if it addresses one.
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            Action::RegisterField { name, .. }
            | Action::UnregisterField { name, .. }
            | Action::Change { name, .. }
            | Action::Blur { name, .. }
            | Action::Focus { name }
            | Action::ArrayPush { name, .. }
            | Action::ArrayPop { name }
            | Action::ArrayShift { name }
            | Action::ArrayUnshift { name, .. }
            | Action::ArrayInsert { name, .. }
            | Action::ArrayRemove { name, .. }
            | Action::ArraySwap { name, .. } => Some(name),
            Action::StartAsyncValidation { field } => field.as_ref(),
            _ => None,
        }
    }
}

/// An [`Action`] addressed to a named form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAction {
    pub form: String,
    #[serde(flatten)]
    pub action: Action,
}

fn parse(name: &str) -> Result<FieldPath, PathError> {
    FieldPath::parse(name)
}

fn parse_all(names: &[&str]) -> Result<Vec<FieldPath>, PathError> {
    names.iter().map(|name| parse(name)).collect()
}

/// Constructors taking field names as strings.
///
/// Each fails with [`PathError::InvalidPath`] if a name does not parse.
impl FormAction {
    pub fn new(form: impl Into<String>, action: Action) -> Self {
        Self {
            form: form.into(),
            action,
        }
    }

    pub fn register_field(
        form: impl Into<String>,
        name: &str,
        kind: FieldKind,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::RegisterField { name, kind }))
    }

    pub fn unregister_field(
        form: impl Into<String>,
        name: &str,
        destroy: bool,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::UnregisterField { name, destroy }))
    }

    pub fn initialize(form: impl Into<String>, values: JsonValue) -> Self {
        Self::new(form, Action::Initialize { values })
    }

    pub fn change(
        form: impl Into<String>,
        name: &str,
        value: JsonValue,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(
            form,
            Action::Change {
                name,
                value,
                touch: false,
            },
        ))
    }

    pub fn blur(
        form: impl Into<String>,
        name: &str,
        value: Option<JsonValue>,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(
            form,
            Action::Blur {
                name,
                value,
                touch: true,
            },
        ))
    }

    pub fn focus(form: impl Into<String>, name: &str) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::Focus { name }))
    }

    pub fn array_push(
        form: impl Into<String>,
        name: &str,
        value: JsonValue,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::ArrayPush { name, value }))
    }

    pub fn array_pop(form: impl Into<String>, name: &str) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::ArrayPop { name }))
    }

    pub fn array_shift(form: impl Into<String>, name: &str) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::ArrayShift { name }))
    }

    pub fn array_unshift(
        form: impl Into<String>,
        name: &str,
        value: JsonValue,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::ArrayUnshift { name, value }))
    }

    pub fn array_insert(
        form: impl Into<String>,
        name: &str,
        index: usize,
        value: JsonValue,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::ArrayInsert { name, index, value }))
    }

    pub fn array_remove(
        form: impl Into<String>,
        name: &str,
        index: usize,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(form, Action::ArrayRemove { name, index }))
    }

    pub fn array_swap(
        form: impl Into<String>,
        name: &str,
        index_a: usize,
        index_b: usize,
    ) -> Result<Self, PathError> {
        let name = parse(name)?;
        Ok(Self::new(
            form,
            Action::ArraySwap {
                name,
                index_a,
                index_b,
            },
        ))
    }

    pub fn reset(form: impl Into<String>) -> Self {
        Self::new(form, Action::Reset)
    }

    pub fn start_async_validation(
        form: impl Into<String>,
        field: Option<&str>,
    ) -> Result<Self, PathError> {
        let field = field.map(parse).transpose()?;
        Ok(Self::new(form, Action::StartAsyncValidation { field }))
    }

    pub fn stop_async_validation(form: impl Into<String>, errors: Option<JsonValue>) -> Self {
        Self::new(form, Action::StopAsyncValidation { errors })
    }

    pub fn start_submit(form: impl Into<String>) -> Self {
        Self::new(form, Action::StartSubmit)
    }

    pub fn stop_submit(form: impl Into<String>, errors: Option<JsonValue>) -> Self {
        Self::new(form, Action::StopSubmit { errors })
    }

    pub fn touch(form: impl Into<String>, names: &[&str]) -> Result<Self, PathError> {
        let names = parse_all(names)?;
        Ok(Self::new(form, Action::Touch { names }))
    }

    pub fn untouch(form: impl Into<String>, names: &[&str]) -> Result<Self, PathError> {
        let names = parse_all(names)?;
        Ok(Self::new(form, Action::Untouch { names }))
    }

    pub fn destroy(form: impl Into<String>) -> Self {
        Self::new(form, Action::Destroy)
    }
}

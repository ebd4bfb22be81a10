//! Per-form state and the registry of forms.
//!
//! A [`FormState`] holds everything the reducer persists for one form: the
//! current values, the last initialized values, per-field interaction
//! metadata, stored async and submit errors, and the registered fields. All
//! trees are held in one [`Structure`] representation, chosen by the type
//! parameter.
//!
//! [`Forms`] maps form names to their state. It is passed explicitly into
//! [`FormReducer::reduce`] and returned updated; there is no process-wide
//! registry.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::{
    path::{FieldPath, Segment},
    structure::{Scalar, Structure},
};

pub mod action;
pub mod errors;
pub mod reducer;

pub use action::{Action, FormAction};
pub use errors::FormError;
pub use reducer::FormReducer;

/// Reserved key holding the whole-form error in every error tree.
pub const FORM_ERROR: &str = "_error";

/// What kind of component registered a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// A single input
    #[default]
    Field,
    /// A list of repeated inputs addressed by index
    FieldArray,
}

/// An entry of [`FormState::registered_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredField {
    pub name: FieldPath,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Number of live registrations for this name.
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

/// The persisted state of a single form.
///
/// Instances are only produced by [`FormReducer`] (or restored with
/// [`FormState::from_plain`]); every transition returns a new state and
/// leaves the old one intact.
pub struct FormState<S: Structure> {
    pub(crate) values: S::Tree,
    pub(crate) initial: Option<S::Tree>,
    pub(crate) fields: S::Tree,
    pub(crate) array_fields: S::Tree,
    pub(crate) async_errors: S::Tree,
    pub(crate) submit_errors: S::Tree,
    pub(crate) registered_fields: Vec<RegisteredField>,
    pub(crate) active: Option<FieldPath>,
    pub(crate) submitting: bool,
    pub(crate) any_touched: bool,
}

impl<S: Structure> Default for FormState<S> {
    fn default() -> Self {
        Self {
            values: S::empty_map(),
            initial: None,
            fields: S::empty_map(),
            array_fields: S::empty_map(),
            async_errors: S::empty_map(),
            submit_errors: S::empty_map(),
            registered_fields: Vec::new(),
            active: None,
            submitting: false,
            any_touched: false,
        }
    }
}

impl<S: Structure> Clone for FormState<S> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            initial: self.initial.clone(),
            fields: self.fields.clone(),
            array_fields: self.array_fields.clone(),
            async_errors: self.async_errors.clone(),
            submit_errors: self.submit_errors.clone(),
            registered_fields: self.registered_fields.clone(),
            active: self.active.clone(),
            submitting: self.submitting,
            any_touched: self.any_touched,
        }
    }
}

impl<S: Structure> PartialEq for FormState<S> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && self.initial == other.initial
            && self.fields == other.fields
            && self.array_fields == other.array_fields
            && self.async_errors == other.async_errors
            && self.submit_errors == other.submit_errors
            && self.registered_fields == other.registered_fields
            && self.active == other.active
            && self.submitting == other.submitting
            && self.any_touched == other.any_touched
    }
}

impl<S: Structure> fmt::Debug for FormState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormState")
            .field("structure", &S::NAME)
            .field("values", &self.values)
            .field("initial", &self.initial)
            .field("fields", &self.fields)
            .field("array_fields", &self.array_fields)
            .field("async_errors", &self.async_errors)
            .field("submit_errors", &self.submit_errors)
            .field("registered_fields", &self.registered_fields)
            .field("active", &self.active)
            .field("submitting", &self.submitting)
            .field("any_touched", &self.any_touched)
            .finish()
    }
}

impl<S: Structure> FormState<S> {
    /// Current values. An empty map until something is set.
    pub fn values(&self) -> &S::Tree {
        &self.values
    }

    /// Values recorded by the last non-empty initialize.
    pub fn initial(&self) -> Option<&S::Tree> {
        self.initial.as_ref()
    }

    /// Per-field `{touched, visited}` records.
    pub fn fields(&self) -> &S::Tree {
        &self.fields
    }

    /// Flag records of field arrays, keyed by the array's full name.
    ///
    /// A field array's node in [`fields`](Self::fields) holds the records of
    /// its elements, so the array's own flags live here instead.
    pub fn array_fields(&self) -> &S::Tree {
        &self.array_fields
    }

    pub fn async_errors(&self) -> &S::Tree {
        &self.async_errors
    }

    pub fn submit_errors(&self) -> &S::Tree {
        &self.submit_errors
    }

    /// Registered fields in registration order.
    pub fn registered_fields(&self) -> &[RegisteredField] {
        &self.registered_fields
    }

    /// The focused field, if any.
    pub fn active(&self) -> Option<&FieldPath> {
        self.active.as_ref()
    }

    pub fn submitting(&self) -> bool {
        self.submitting
    }

    pub fn any_touched(&self) -> bool {
        self.any_touched
    }

    /// True once an initialize with a non-empty payload has been applied.
    pub fn initialized(&self) -> bool {
        self.initial.is_some()
    }

    /// Looks up the registration for exactly `name`.
    pub fn registration(&self, name: &FieldPath) -> Option<&RegisteredField> {
        self.registered_fields.iter().find(|field| field.name == *name)
    }

    /// Returns true if `name` or one of its ancestors is registered.
    ///
    /// A registered field array covers the paths of its elements, so
    /// `users[2].name` counts as registered when `users` is.
    pub fn is_registered(&self, name: &FieldPath) -> bool {
        self.registered_fields
            .iter()
            .any(|field| name.starts_with(&field.name))
    }

    /// The value at `name`, without falling back to the initial value.
    pub fn value(&self, name: &FieldPath) -> Option<&S::Tree> {
        S::get_in(&self.values, name.segments())
    }

    /// The initial value at `name`.
    pub fn initial_value(&self, name: &FieldPath) -> Option<&S::Tree> {
        self.initial
            .as_ref()
            .and_then(|initial| S::get_in(initial, name.segments()))
    }

    /// Returns true if `name` is registered as a field array.
    pub(crate) fn is_field_array(&self, name: &FieldPath) -> bool {
        self.registration(name)
            .is_some_and(|field| field.kind == FieldKind::FieldArray)
    }

    /// The metadata record holding the flags of `name`.
    pub(crate) fn meta(&self, name: &FieldPath) -> Option<&S::Tree> {
        if self.is_field_array(name) {
            S::child(&self.array_fields, &Segment::key(name.to_string()))
        } else {
            S::get_in(&self.fields, name.segments())
        }
    }

    /// Reads a boolean flag such as `touched` from a field's metadata record.
    pub(crate) fn field_flag(&self, name: &FieldPath, flag: &str) -> bool {
        self.meta(name)
            .and_then(|meta| S::child(meta, &Segment::key(flag)))
            .and_then(S::scalar)
            .and_then(Scalar::as_bool)
            .unwrap_or(false)
    }

    pub fn touched(&self, name: &FieldPath) -> bool {
        self.field_flag(name, "touched")
    }

    pub fn visited(&self, name: &FieldPath) -> bool {
        self.field_flag(name, "visited")
    }

    /// Renders the state in its persisted layout.
    ///
    /// Keys are camelCase. Absent and empty members are omitted, so a fresh
    /// form renders as `{}`.
    pub fn to_plain(&self) -> JsonValue {
        let mut out = JsonMap::new();
        let mut put_tree = |key: &str, tree: &S::Tree| {
            if !S::is_empty(tree) {
                out.insert(key.to_string(), S::to_plain(tree));
            }
        };
        put_tree("values", &self.values);
        if let Some(initial) = &self.initial {
            put_tree("initial", initial);
        }
        put_tree("fields", &self.fields);
        put_tree("arrayFields", &self.array_fields);
        put_tree("asyncErrors", &self.async_errors);
        put_tree("submitErrors", &self.submit_errors);

        if !self.registered_fields.is_empty() {
            out.insert(
                "registeredFields".to_string(),
                JsonValue::Array(
                    self.registered_fields
                        .iter()
                        .map(|field| {
                            serde_json::json!({
                                "name": field.name.to_string(),
                                "type": field.kind,
                                "count": field.count,
                            })
                        })
                        .collect(),
                ),
            );
        }
        if let Some(active) = &self.active {
            out.insert("active".to_string(), JsonValue::String(active.to_string()));
        }
        if self.submitting {
            out.insert("submitting".to_string(), JsonValue::Bool(true));
        }
        if self.any_touched {
            out.insert("anyTouched".to_string(), JsonValue::Bool(true));
        }
        JsonValue::Object(out)
    }

    /// Restores a state from the layout produced by [`FormState::to_plain`].
    ///
    /// # Errors
    /// Returns [`FormError::InvalidState`] if `plain` is not an object or one
    /// of its members has the wrong shape.
    pub fn from_plain(plain: &JsonValue) -> Result<Self, FormError> {
        let JsonValue::Object(map) = plain else {
            return Err(FormError::InvalidState {
                reason: "form state must be an object".to_string(),
            });
        };

        let tree = |key: &str| -> Result<Option<S::Tree>, FormError> {
            match map.get(key) {
                None | Some(JsonValue::Null) => Ok(None),
                Some(value @ JsonValue::Object(_)) => Ok(Some(S::from_plain(value))),
                Some(_) => Err(FormError::InvalidState {
                    reason: format!("'{key}' must be an object"),
                }),
            }
        };
        let flag = |key: &str| map.get(key).and_then(JsonValue::as_bool).unwrap_or(false);

        let registered_fields = match map.get("registeredFields") {
            None => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|err| {
                FormError::InvalidState {
                    reason: format!("invalid 'registeredFields': {err}"),
                }
            })?,
        };
        let active = match map.get("active").and_then(JsonValue::as_str) {
            None => None,
            Some(name) => Some(FieldPath::parse(name).map_err(|err| {
                FormError::InvalidState {
                    reason: err.to_string(),
                }
            })?),
        };

        Ok(Self {
            values: tree("values")?.unwrap_or_else(S::empty_map),
            initial: tree("initial")?.filter(|initial| !S::is_empty(initial)),
            fields: tree("fields")?.unwrap_or_else(S::empty_map),
            array_fields: tree("arrayFields")?.unwrap_or_else(S::empty_map),
            async_errors: tree("asyncErrors")?.unwrap_or_else(S::empty_map),
            submit_errors: tree("submitErrors")?.unwrap_or_else(S::empty_map),
            registered_fields,
            active,
            submitting: flag("submitting"),
            any_touched: flag("anyTouched"),
        })
    }
}

/// The registry of all forms, keyed by form name.
///
/// Cloning is cheap. Forms untouched by a reduction keep their `Arc`, so a
/// subscriber can skip work for a form whose entry is pointer-equal.
pub struct Forms<S: Structure> {
    forms: Arc<BTreeMap<String, Arc<FormState<S>>>>,
}

impl<S: Structure> Default for Forms<S> {
    fn default() -> Self {
        Self {
            forms: Arc::new(BTreeMap::new()),
        }
    }
}

impl<S: Structure> Clone for Forms<S> {
    fn clone(&self) -> Self {
        Self {
            forms: Arc::clone(&self.forms),
        }
    }
}

impl<S: Structure> fmt::Debug for Forms<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.forms.iter()).finish()
    }
}

impl<S: Structure> Forms<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state of form `name`, if it exists.
    pub fn get(&self, name: &str) -> Option<&Arc<FormState<S>>> {
        self.forms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.forms.contains_key(name)
    }

    /// Form names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Returns true if both registries are the same allocation.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.forms, &other.forms)
    }

    pub(crate) fn with_form(&self, name: &str, state: Arc<FormState<S>>) -> Self {
        let mut forms = self.forms.as_ref().clone();
        forms.insert(name.to_string(), state);
        Self {
            forms: Arc::new(forms),
        }
    }

    pub(crate) fn without(&self, name: &str) -> Self {
        if !self.forms.contains_key(name) {
            return self.clone();
        }
        let mut forms = self.forms.as_ref().clone();
        forms.remove(name);
        Self {
            forms: Arc::new(forms),
        }
    }

    /// Renders every form under its name.
    pub fn to_plain(&self) -> JsonValue {
        JsonValue::Object(
            self.forms
                .iter()
                .map(|(name, state)| (name.clone(), state.to_plain()))
                .collect(),
        )
    }

    /// Restores a registry from the layout produced by [`Forms::to_plain`].
    pub fn from_plain(plain: &JsonValue) -> Result<Self, FormError> {
        let JsonValue::Object(map) = plain else {
            return Err(FormError::InvalidState {
                reason: "form registry must be an object".to_string(),
            });
        };
        let forms = map
            .iter()
            .map(|(name, state)| Ok((name.clone(), Arc::new(FormState::from_plain(state)?))))
            .collect::<Result<BTreeMap<_, _>, FormError>>()?;
        Ok(Self {
            forms: Arc::new(forms),
        })
    }
}

/// Returns the state of form `name` within `forms`.
pub fn get_form_state<'a, S: Structure>(
    forms: &'a Forms<S>,
    name: &str,
) -> Option<&'a Arc<FormState<S>>> {
    forms.get(name)
}

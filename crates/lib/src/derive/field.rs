//! The public view of a single field.

use serde_json::Value as JsonValue;

use crate::{
    form::{FORM_ERROR, FieldKind, FormState},
    path::{FieldPath, Segment},
    structure::Structure,
};

/// Everything a field component renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView<S: Structure> {
    pub name: FieldPath,
    pub kind: FieldKind,
    /// Current value, falling back to the initial value while the field has
    /// never been set.
    pub value: Option<S::Tree>,
    pub initial: Option<S::Tree>,
    pub dirty: bool,
    pub pristine: bool,
    pub touched: bool,
    pub visited: bool,
    /// True while the field has focus.
    pub active: bool,
    /// The first error found in sync, then async, then submit errors.
    pub error: Option<JsonValue>,
    pub valid: bool,
    pub invalid: bool,
}

impl<S: Structure> FieldView<S> {
    /// The value as plain JSON; `null` when absent.
    pub fn value_plain(&self) -> JsonValue {
        self.value
            .as_ref()
            .map_or(JsonValue::Null, |value| S::to_plain(value))
    }
}

/// The nodes a field's view is computed from.
///
/// Two snapshots whose inputs are all identical yield equal views, which is
/// what lets a selector hand back the previous view.
pub(crate) struct FieldInputs<S: Structure> {
    kind: FieldKind,
    value: Option<S::Tree>,
    initial: Option<S::Tree>,
    meta: Option<S::Tree>,
    sync_error: Option<S::Tree>,
    async_error: Option<S::Tree>,
    submit_error: Option<S::Tree>,
    active: bool,
}

fn same_node<S: Structure>(a: &Option<S::Tree>, b: &Option<S::Tree>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => S::same(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Where a field's error lives in an error tree.
///
/// Field arrays keep their own error under `_error` inside the array's
/// error node, next to the per-element errors.
fn error_node<'a, S: Structure>(
    tree: &'a S::Tree,
    name: &FieldPath,
    kind: FieldKind,
) -> Option<&'a S::Tree> {
    let node = match kind {
        FieldKind::Field => S::get_in(tree, name.segments()),
        FieldKind::FieldArray => S::get_in(tree, name.with_key(FORM_ERROR).segments()),
    }?;
    (!S::is_blank(Some(node))).then_some(node)
}

impl<S: Structure> FieldInputs<S> {
    pub(crate) fn gather(state: &FormState<S>, name: &FieldPath, sync_errors: &S::Tree) -> Self {
        let kind = state
            .registration(name)
            .map(|field| field.kind)
            .unwrap_or_default();
        Self {
            kind,
            value: state.value(name).cloned(),
            initial: state.initial_value(name).cloned(),
            meta: state.meta(name).cloned(),
            sync_error: error_node::<S>(sync_errors, name, kind).cloned(),
            async_error: error_node::<S>(state.async_errors(), name, kind).cloned(),
            submit_error: error_node::<S>(state.submit_errors(), name, kind).cloned(),
            active: state.active() == Some(name),
        }
    }

    /// Sync errors are recomputed on every read, so they compare by value.
    pub(crate) fn same(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.active == other.active
            && same_node::<S>(&self.value, &other.value)
            && same_node::<S>(&self.initial, &other.initial)
            && same_node::<S>(&self.meta, &other.meta)
            && same_node::<S>(&self.async_error, &other.async_error)
            && same_node::<S>(&self.submit_error, &other.submit_error)
            && self.sync_error == other.sync_error
    }

    pub(crate) fn resolve(&self, name: &FieldPath) -> FieldView<S> {
        let value = self.value.clone().or_else(|| self.initial.clone());
        let dirty = !S::deep_equals(value.as_ref(), self.initial.as_ref());
        let flag = |key: &str| {
            self.meta
                .as_ref()
                .and_then(|meta| S::get_in(meta, &[Segment::key(key)]))
                .and_then(S::scalar)
                .and_then(|scalar| scalar.as_bool())
                .unwrap_or(false)
        };
        let error = self
            .sync_error
            .as_ref()
            .or(self.async_error.as_ref())
            .or(self.submit_error.as_ref())
            .map(|node| S::to_plain(node));

        FieldView {
            name: name.clone(),
            kind: self.kind,
            value,
            initial: self.initial.clone(),
            dirty,
            pristine: !dirty,
            touched: flag("touched"),
            visited: flag("visited"),
            active: self.active,
            valid: error.is_none(),
            invalid: error.is_some(),
            error,
        }
    }
}

/// Derives the view of field `name`.
///
/// `sync_errors` is the current result of synchronous validation in the
/// form's structure.
pub fn resolve_field<S: Structure>(
    state: &FormState<S>,
    name: &FieldPath,
    sync_errors: &S::Tree,
) -> FieldView<S> {
    FieldInputs::gather(state, name, sync_errors).resolve(name)
}

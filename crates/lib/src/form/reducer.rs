//! The pure form-state reducer.
//!
//! [`FormReducer`] applies [`FormAction`]s to a [`Forms`] registry. It never
//! fails and never mutates its input: each call returns a new registry in
//! which only the nodes on the path to the change are replaced. An action
//! that changes nothing returns the registry itself (pointer-equal), and a
//! form left untouched by an action keeps its `Arc`.
//!
//! Path-addressed actions naming a field that is not registered (neither
//! the path itself nor one of its ancestors) are ignored.

use std::{marker::PhantomData, sync::Arc};

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::{Action, FORM_ERROR, FormAction, FormState, Forms, RegisteredField};
use crate::{
    path::{FieldPath, Segment},
    structure::{Scalar, Structure},
};

const TOUCHED: &str = "touched";
const VISITED: &str = "visited";

/// List edit in index terms, shared by values and the trees mirroring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEdit {
    Insert(usize),
    Remove(usize),
    Swap(usize, usize),
}

/// Array action, resolved to a [`ListEdit`] against the current list length.
#[derive(Debug, Clone, Copy)]
enum ArrayOp {
    Push,
    Pop,
    Shift,
    Unshift,
    Insert(usize),
    Remove(usize),
    Swap(usize, usize),
}

impl ArrayOp {
    fn resolve(self, len: usize) -> Option<ListEdit> {
        match self {
            ArrayOp::Push => Some(ListEdit::Insert(len)),
            ArrayOp::Pop => len.checked_sub(1).map(ListEdit::Remove),
            ArrayOp::Shift => (len > 0).then_some(ListEdit::Remove(0)),
            ArrayOp::Unshift => Some(ListEdit::Insert(0)),
            ArrayOp::Insert(index) => (index <= len).then_some(ListEdit::Insert(index)),
            ArrayOp::Remove(index) => (index < len).then_some(ListEdit::Remove(index)),
            ArrayOp::Swap(a, b) => (a != b && a < len && b < len).then_some(ListEdit::Swap(a, b)),
        }
    }
}

/// Reducer over forms whose trees use the `S` representation.
pub struct FormReducer<S: Structure> {
    _structure: PhantomData<fn() -> S>,
}

impl<S: Structure> Default for FormReducer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Structure> Clone for FormReducer<S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<S: Structure> std::fmt::Debug for FormReducer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormReducer")
            .field("structure", &S::NAME)
            .finish()
    }
}

impl<S: Structure> FormReducer<S> {
    pub fn new() -> Self {
        Self {
            _structure: PhantomData,
        }
    }

    /// Applies `action` to the registry.
    ///
    /// The first action naming a form creates its state; `DESTROY` removes it.
    pub fn reduce(&self, forms: &Forms<S>, action: &FormAction) -> Forms<S> {
        let name = action.form.as_str();
        debug!(
            form = %name,
            action = action.action.name(),
            structure = S::NAME,
            "Reducing form action"
        );

        if matches!(action.action, Action::Destroy) {
            return forms.without(name);
        }

        match forms.get(name) {
            Some(state) => match self.apply(state, &action.action) {
                Some(next) => forms.with_form(name, Arc::new(next)),
                None => {
                    trace!(form = %name, action = action.action.name(), "Action left form unchanged");
                    forms.clone()
                }
            },
            None => {
                let fresh = FormState::default();
                let next = self.apply(&fresh, &action.action).unwrap_or(fresh);
                forms.with_form(name, Arc::new(next))
            }
        }
    }

    /// Applies `action` to a single form's state.
    ///
    /// `DESTROY` yields a fresh state here, since there is no registry entry
    /// to remove.
    pub fn reduce_form(&self, state: &FormState<S>, action: &Action) -> FormState<S> {
        if matches!(action, Action::Destroy) {
            return FormState::default();
        }
        self.apply(state, action)
            .unwrap_or_else(|| state.clone())
    }

    /// Returns `None` when the action leaves the state unchanged.
    fn apply(&self, state: &FormState<S>, action: &Action) -> Option<FormState<S>> {
        match action {
            Action::RegisterField { name, kind } => {
                let mut next = state.clone();
                match next.registered_fields.iter_mut().find(|f| f.name == *name) {
                    Some(field) => field.count += 1,
                    None => next.registered_fields.push(RegisteredField {
                        name: name.clone(),
                        kind: *kind,
                        count: 1,
                    }),
                }
                Some(next)
            }
            Action::UnregisterField { name, destroy } => self.unregister(state, name, *destroy),
            Action::Initialize { values } => Some(self.initialize(state, values)),
            Action::Change { name, value, touch } => {
                if !state.is_registered(name) {
                    return None;
                }
                let mut next = state.clone();
                next.values = S::set_in(&state.values, name.segments(), S::from_plain(value));
                let registered = &state.registered_fields;
                next.async_errors = delete_with_cleanup::<S>(registered, &next.async_errors, name.segments());
                next.submit_errors = delete_with_cleanup::<S>(registered, &next.submit_errors, name.segments());
                if *touch {
                    set_flag(&mut next, name, TOUCHED);
                    next.any_touched = true;
                }
                Some(next)
            }
            Action::Blur { name, value, touch } => {
                if !state.is_registered(name) {
                    return None;
                }
                let mut next = state.clone();
                if let Some(value) = value {
                    next.values = S::set_in(&state.values, name.segments(), S::from_plain(value));
                }
                if *touch {
                    set_flag(&mut next, name, TOUCHED);
                    next.any_touched = true;
                }
                if next.active.as_ref() == Some(name) {
                    next.active = None;
                }
                Some(next)
            }
            Action::Focus { name } => {
                if !state.is_registered(name) {
                    return None;
                }
                let mut next = state.clone();
                set_flag(&mut next, name, VISITED);
                next.active = Some(name.clone());
                Some(next)
            }
            Action::ArrayPush { name, value } => {
                self.array_op(state, name, ArrayOp::Push, Some(value))
            }
            Action::ArrayPop { name } => self.array_op(state, name, ArrayOp::Pop, None),
            Action::ArrayShift { name } => self.array_op(state, name, ArrayOp::Shift, None),
            Action::ArrayUnshift { name, value } => {
                self.array_op(state, name, ArrayOp::Unshift, Some(value))
            }
            Action::ArrayInsert { name, index, value } => {
                self.array_op(state, name, ArrayOp::Insert(*index), Some(value))
            }
            Action::ArrayRemove { name, index } => {
                self.array_op(state, name, ArrayOp::Remove(*index), None)
            }
            Action::ArraySwap {
                name,
                index_a,
                index_b,
            } => self.array_op(state, name, ArrayOp::Swap(*index_a, *index_b), None),
            Action::Reset => self.reset(state),
            // In-flight tracking lives with the caller that runs validation.
            Action::StartAsyncValidation { .. } => None,
            Action::StopAsyncValidation { errors } => {
                if errors.is_none() && S::is_empty(&state.async_errors) {
                    return None;
                }
                let mut next = state.clone();
                next.async_errors = error_tree::<S>(errors.as_ref());
                Some(next)
            }
            Action::StartSubmit => {
                if state.submitting {
                    return None;
                }
                let mut next = state.clone();
                next.submitting = true;
                Some(next)
            }
            Action::StopSubmit { errors } => {
                let mut next = state.clone();
                next.submitting = false;
                next.submit_errors = error_tree::<S>(errors.as_ref());
                for field in &state.registered_fields {
                    if !S::is_blank(S::get_in(&next.submit_errors, field.name.segments())) {
                        set_flag(&mut next, &field.name, TOUCHED);
                        next.any_touched = true;
                    }
                }
                Some(next)
            }
            Action::Touch { names } => {
                let names: Vec<&FieldPath> =
                    names.iter().filter(|name| state.is_registered(name)).collect();
                if names.is_empty() {
                    return None;
                }
                let mut next = state.clone();
                for name in names {
                    set_flag(&mut next, name, TOUCHED);
                }
                next.any_touched = true;
                Some(next)
            }
            Action::Untouch { names } => {
                let names: Vec<&FieldPath> =
                    names.iter().filter(|name| state.is_registered(name)).collect();
                if names.is_empty() {
                    return None;
                }
                let mut next = state.clone();
                for name in names {
                    clear_flag(&mut next, name, TOUCHED);
                }
                Some(next)
            }
            Action::Destroy => Some(FormState::default()),
        }
    }

    fn unregister(
        &self,
        state: &FormState<S>,
        name: &FieldPath,
        destroy: bool,
    ) -> Option<FormState<S>> {
        let index = state
            .registered_fields
            .iter()
            .position(|field| field.name == *name)?;
        let mut next = state.clone();
        let field = &mut next.registered_fields[index];
        field.count = field.count.saturating_sub(1);
        if field.count > 0 {
            return Some(next);
        }
        next.registered_fields.remove(index);

        if destroy {
            let registered = &next.registered_fields;
            let path = name.segments();
            next.values = delete_with_cleanup::<S>(registered, &next.values, path);
            next.fields = delete_with_cleanup::<S>(registered, &next.fields, path);
            next.array_fields = without_array_flags::<S>(&next.array_fields, name);
            next.async_errors = delete_with_cleanup::<S>(registered, &next.async_errors, path);
            next.submit_errors = delete_with_cleanup::<S>(registered, &next.submit_errors, path);
            if next.active.as_ref() == Some(name) {
                next.active = None;
            }
        }
        Some(next)
    }

    /// Records `payload` as the initial values without clobbering edits.
    ///
    /// Every leaf of the current values that differs from the previous
    /// initial values is carried over onto the new values.
    fn initialize(&self, state: &FormState<S>, payload: &JsonValue) -> FormState<S> {
        let payload = S::from_plain(payload);
        let payload = if S::is_map(&payload) {
            payload
        } else {
            S::empty_map()
        };

        let mut values = payload.clone();
        for (path, leaf) in S::leaf_paths(&state.values) {
            let old = state
                .initial
                .as_ref()
                .and_then(|initial| S::get_in(initial, &path));
            if !S::deep_equals(Some(leaf), old) {
                trace!(field = %FieldPath::join(&path), "Keeping edited value over initialize");
                values = S::set_in(&values, &path, leaf.clone());
            }
        }

        let mut next = state.clone();
        next.initial = (!S::is_empty(&payload)).then_some(payload);
        next.values = values;
        next
    }

    fn reset(&self, state: &FormState<S>) -> Option<FormState<S>> {
        let values = match &state.initial {
            Some(initial) => initial.clone(),
            None if S::is_empty(&state.values) => state.values.clone(),
            None => S::empty_map(),
        };
        let unchanged = S::same(&values, &state.values)
            && S::is_empty(&state.fields)
            && S::is_empty(&state.array_fields)
            && S::is_empty(&state.async_errors)
            && S::is_empty(&state.submit_errors)
            && !state.any_touched;
        if unchanged {
            return None;
        }

        let cleared = |tree: &S::Tree| {
            if S::is_empty(tree) {
                tree.clone()
            } else {
                S::empty_map()
            }
        };
        let mut next = state.clone();
        next.values = values;
        next.fields = cleared(&state.fields);
        next.array_fields = cleared(&state.array_fields);
        next.async_errors = cleared(&state.async_errors);
        next.submit_errors = cleared(&state.submit_errors);
        next.any_touched = false;
        Some(next)
    }

    /// Applies a list edit to the array at `name` and keeps the other trees
    /// aligned with it.
    ///
    /// `initial` receives the same value as `values` and is created when an
    /// element is added; `fields` and both error trees receive `null`
    /// placeholders, and only where they already hold a list at `name`.
    fn array_op(
        &self,
        state: &FormState<S>,
        name: &FieldPath,
        op: ArrayOp,
        value: Option<&JsonValue>,
    ) -> Option<FormState<S>> {
        if name.is_write_only() || !state.is_registered(name) {
            return None;
        }
        let path = name.segments();
        let current = match S::get_in(&state.values, path) {
            None => S::empty_list(),
            Some(node) if S::is_list(node) => node.clone(),
            Some(node) if S::scalar(node).is_some_and(Scalar::is_null) => S::empty_list(),
            Some(_) => {
                trace!(field = %name, "Array action on a non-list value");
                return None;
            }
        };
        let edit = op.resolve(S::len(&current))?;
        let fill = value.map_or_else(|| S::leaf(Scalar::Null), S::from_plain);
        let placeholder = S::leaf(Scalar::Null);

        let mut next = state.clone();
        next.values = S::set_in(&state.values, path, edit_list::<S>(&current, edit, fill.clone())?);

        let adds = matches!(edit, ListEdit::Insert(_));
        next.initial = match &state.initial {
            Some(initial) => Some(mirror::<S>(initial, path, edit, fill, adds)),
            None if adds => Some(mirror::<S>(&S::empty_map(), path, edit, fill, true)),
            None => None,
        };
        next.fields = mirror::<S>(&state.fields, path, edit, placeholder.clone(), false);
        next.async_errors = mirror::<S>(&state.async_errors, path, edit, placeholder.clone(), false);
        next.submit_errors = mirror::<S>(&state.submit_errors, path, edit, placeholder, false);
        Some(next)
    }
}

/// Applies `edit` to a list node. `None` if it is out of range.
fn edit_list<S: Structure>(list: &S::Tree, edit: ListEdit, fill: S::Tree) -> Option<S::Tree> {
    let len = S::len(list);
    match edit {
        ListEdit::Insert(index) if index > len => None,
        ListEdit::Insert(index) if index == len => Some(S::push(list, fill)),
        ListEdit::Insert(0) => Some(S::unshift(list, fill)),
        ListEdit::Insert(index) => Some(S::insert_at(list, index, fill)),
        ListEdit::Remove(index) if index >= len => None,
        ListEdit::Remove(index) if index + 1 == len => Some(S::pop(list)),
        ListEdit::Remove(0) => Some(S::shift(list)),
        ListEdit::Remove(index) => Some(S::remove_at(list, index)),
        ListEdit::Swap(a, b) if a == b || a.max(b) >= len => None,
        ListEdit::Swap(a, b) => Some(S::swap(list, a, b)),
    }
}

/// Pads `list` with `null` up to `len` elements.
fn pad<S: Structure>(list: &S::Tree, len: usize) -> S::Tree {
    if len == 0 || S::len(list) >= len {
        return list.clone();
    }
    S::with_child(list, &Segment::Index(len - 1), S::leaf(Scalar::Null))
}

/// Repeats a list edit on the list at `path` within another tree.
fn mirror<S: Structure>(
    tree: &S::Tree,
    path: &[Segment],
    edit: ListEdit,
    fill: S::Tree,
    create: bool,
) -> S::Tree {
    let list = match S::get_in(tree, path) {
        Some(node) if S::is_list(node) => node.clone(),
        _ if create => S::empty_list(),
        _ => return tree.clone(),
    };
    let list = match edit {
        ListEdit::Insert(index) if create => pad::<S>(&list, index),
        ListEdit::Swap(a, b) => pad::<S>(&list, a.max(b) + 1),
        _ => list,
    };
    match edit_list::<S>(&list, edit, fill) {
        Some(edited) => S::set_in(tree, path, edited),
        None => tree.clone(),
    }
}

/// Sets `flag` on the metadata record of `name`.
///
/// A field array's record lives in `array_fields` under its full name, clear
/// of the element records its node in `fields` holds. Any other list node in
/// `fields` is left alone for the same reason.
fn set_flag<S: Structure>(state: &mut FormState<S>, name: &FieldPath, flag: &str) {
    if name.is_write_only() {
        return;
    }
    let on = S::leaf(Scalar::Bool(true));
    if state.is_field_array(name) {
        let path = [Segment::key(name.to_string()), Segment::key(flag)];
        state.array_fields = S::set_in(&state.array_fields, &path, on);
    } else if !S::get_in(&state.fields, name.segments()).is_some_and(S::is_list) {
        state.fields = S::set_in(&state.fields, name.with_key(flag).segments(), on);
    }
}

/// Removes `flag` from the metadata record of `name`, dropping the record
/// once it is empty.
fn clear_flag<S: Structure>(state: &mut FormState<S>, name: &FieldPath, flag: &str) {
    if state.is_field_array(name) {
        let key = Segment::key(name.to_string());
        let flags = S::delete_in(&state.array_fields, &[key.clone(), Segment::key(flag)]);
        state.array_fields = match S::child(&flags, &key) {
            Some(record) if S::is_empty(record) => S::without_child(&flags, &key),
            _ => flags,
        };
    } else {
        let path = name.with_key(flag);
        state.fields =
            delete_with_cleanup::<S>(&state.registered_fields, &state.fields, path.segments());
    }
}

/// Drops the field array records of `name` and of every path below it.
fn without_array_flags<S: Structure>(array_fields: &S::Tree, name: &FieldPath) -> S::Tree {
    S::entries(array_fields)
        .into_iter()
        .filter(|(segment, _)| match segment {
            Segment::Key(key) => FieldPath::parse(key).is_ok_and(|path| path.starts_with(name)),
            _ => false,
        })
        .fold(array_fields.clone(), |flags, (segment, _)| {
            S::without_child(&flags, &segment)
        })
}

/// Converts an error payload into an error tree.
///
/// Anything other than an object is a whole-form error and is stored under
/// [`FORM_ERROR`].
fn error_tree<S: Structure>(errors: Option<&JsonValue>) -> S::Tree {
    match errors {
        None | Some(JsonValue::Null) => S::empty_map(),
        Some(tree @ JsonValue::Object(_)) => S::from_plain(tree),
        Some(other) => S::with_child(
            &S::empty_map(),
            &Segment::key(FORM_ERROR),
            S::from_plain(other),
        ),
    }
}

/// True for containers holding nothing, counting a list of `null`
/// placeholders as holding nothing.
fn is_vacant<S: Structure>(node: &S::Tree) -> bool {
    S::is_empty(node)
        || (S::is_list(node)
            && S::entries(node).iter().all(|(_, child)| {
                S::scalar(child).is_some_and(Scalar::is_null)
            }))
}

/// Deletes the node at `path`, then prunes ancestors left vacant.
///
/// Pruning stops at the root and at any container that is itself a
/// registered field. A list element that is not the last one is replaced
/// by `null` instead of being spliced out, so the indices of its siblings
/// stay stable.
pub(crate) fn delete_with_cleanup<S: Structure>(
    registered: &[RegisteredField],
    tree: &S::Tree,
    path: &[Segment],
) -> S::Tree {
    let Some((last, parent)) = path.split_last() else {
        return tree.clone();
    };
    let Some(container) = S::get_in(tree, parent) else {
        return tree.clone();
    };
    if S::child(container, last).is_none() {
        return tree.clone();
    }

    let trimmed = match last {
        Segment::Index(index) if index + 1 < S::len(container) => {
            S::with_child(container, last, S::leaf(Scalar::Null))
        }
        _ => S::without_child(container, last),
    };
    let at_boundary = parent.is_empty()
        || registered
            .iter()
            .any(|field| field.name.segments() == parent);
    let vacant = is_vacant::<S>(&trimmed);
    let result = S::set_in(tree, parent, trimmed);

    if at_boundary || !vacant {
        result
    } else {
        delete_with_cleanup::<S>(registered, &result, parent)
    }
}

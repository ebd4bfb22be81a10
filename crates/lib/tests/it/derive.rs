//! Field views, form summaries, and memoized props.

use std::sync::Arc;

use formstate::{
    FieldPath, FormAction, Structure,
    derive::{PropsSelector, derive_props, resolve_field, summarize},
    form::FieldKind,
};
use serde_json::json;

use crate::helpers::{FORM, Harness, path};

fn names(names: &[&str]) -> Vec<FieldPath> {
    names.iter().map(|name| path(name)).collect()
}

fn change_rerenders_only_changed_field<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b", "c"]);
    let selector = PropsSelector::<S>::new();
    let fields = names(&["a", "b", "c"]);

    let first = selector.select(&h.state(), &fields, &json!({}), false);
    h.apply(FormAction::change(FORM, "a", json!("x")).unwrap());
    let second = selector.select(&h.state(), &fields, &json!({}), false);

    assert!(!Arc::ptr_eq(&first.fields[0], &second.fields[0]));
    assert!(Arc::ptr_eq(&first.fields[1], &second.fields[1]));
    assert!(Arc::ptr_eq(&first.fields[2], &second.fields[2]));
    assert_eq!(second.field("a").unwrap().value_plain(), json!("x"));
    assert!(second.dirty());
}

fn nested_change_keeps_sibling_views<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["deep.one", "deep.two", "flat"]);
    h.apply(FormAction::change(FORM, "deep.two", json!(2)).unwrap());
    let selector = PropsSelector::<S>::new();
    let fields = names(&["deep.one", "deep.two", "flat"]);

    let first = selector.select(&h.state(), &fields, &json!({}), false);
    h.apply(FormAction::change(FORM, "deep.one", json!(1)).unwrap());
    h.apply(FormAction::focus(FORM, "flat").unwrap());
    let second = selector.select(&h.state(), &fields, &json!({}), false);

    assert!(!Arc::ptr_eq(&first.fields[0], &second.fields[0]));
    assert!(Arc::ptr_eq(&first.fields[1], &second.fields[1]));
    assert!(!Arc::ptr_eq(&first.fields[2], &second.fields[2]));
    assert!(second.field("flat").unwrap().active);
}

fn dirty_and_pristine_are_complements<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    let steps = [
        FormAction::initialize(FORM, json!({"a": "x"})),
        FormAction::change(FORM, "a", json!("y")).unwrap(),
        FormAction::change(FORM, "b", json!("")).unwrap(),
        FormAction::change(FORM, "a", json!("x")).unwrap(),
        FormAction::reset(FORM),
    ];
    let mut observed = Vec::new();
    for step in steps {
        h.apply(step);
        let state = h.state();
        let summary = summarize(state.as_ref(), &S::empty_map());
        assert_eq!(summary.dirty, !summary.pristine);
        for name in ["a", "b"] {
            let view = resolve_field(state.as_ref(), &path(name), &S::empty_map());
            assert_eq!(view.dirty, !view.pristine);
        }
        observed.push(summary.dirty);
    }
    assert_eq!(observed, vec![false, true, true, false, false]);
}

fn field_view_reflects_state<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["email", "name"]);
    h.apply(FormAction::initialize(FORM, json!({"email": "a@b.c", "name": "Ada"})));
    h.apply(FormAction::blur(FORM, "email", Some(json!("x@y.z"))).unwrap());
    h.apply(FormAction::stop_async_validation(FORM, Some(json!({"email": "Taken"}))));

    let state = h.state();
    let email = resolve_field(state.as_ref(), &path("email"), &S::empty_map());
    assert_eq!(email.value_plain(), json!("x@y.z"));
    assert!(email.dirty);
    assert!(email.touched);
    assert!(!email.active);
    assert_eq!(email.error, Some(json!("Taken")));
    assert!(email.invalid);

    let sync = S::from_plain(&json!({"email": "Invalid"}));
    let email = resolve_field(state.as_ref(), &path("email"), &sync);
    assert_eq!(email.error, Some(json!("Invalid")));

    let name = resolve_field(state.as_ref(), &path("name"), &sync);
    assert_eq!(name.value_plain(), json!("Ada"));
    assert!(name.pristine);
    assert!(name.valid);
}

fn field_array_error_is_separate_from_elements<S: Structure>() {
    let mut h = Harness::<S>::new();
    h.apply(FormAction::register_field(FORM, "items", FieldKind::FieldArray).unwrap());
    h.apply(FormAction::array_push(FORM, "items", json!("a")).unwrap());
    h.apply(FormAction::stop_submit(
        FORM,
        Some(json!({"items": {"_error": "Need two", "0": "ignored"}})),
    ));

    let props = derive_props(h.state().as_ref(), &names(&["items"]), &json!({}));
    let items = props.field("items").unwrap();
    assert_eq!(items.kind, FieldKind::FieldArray);
    assert_eq!(items.error, Some(json!("Need two")));
    assert!(props.invalid());
}

fn sync_form_error_takes_precedence<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::stop_submit(FORM, Some(json!("Server said no"))));

    let props = derive_props(h.state().as_ref(), &names(&["a"]), &json!({}));
    assert_eq!(props.error(), Some(&json!("Server said no")));

    let props = derive_props(h.state().as_ref(), &names(&["a"]), &json!({"_error": "Fix it"}));
    assert_eq!(props.error(), Some(&json!("Fix it")));
    assert!(props.field("a").unwrap().valid);
}

fn destroyed_field_keeps_form_dirty_against_initial<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::initialize(FORM, json!({"a": "x", "b": "y"})));
    h.apply(FormAction::unregister_field(FORM, "b", true).unwrap());

    let state = h.state();
    assert_eq!(h.values(), json!({"a": "x"}));
    assert_eq!(h.initial(), Some(json!({"a": "x", "b": "y"})));
    assert!(resolve_field(state.as_ref(), &path("a"), &S::empty_map()).pristine);
    assert!(summarize(state.as_ref(), &S::empty_map()).dirty);

    h.apply(FormAction::reset(FORM));
    assert!(summarize(h.state().as_ref(), &S::empty_map()).pristine);
}

for_each_structure!(
    change_rerenders_only_changed_field,
    nested_change_keeps_sibling_views,
    dirty_and_pristine_are_complements,
    field_view_reflects_state,
    field_array_error_is_separate_from_elements,
    sync_form_error_takes_precedence,
    destroyed_field_keeps_form_dirty_against_initial,
);

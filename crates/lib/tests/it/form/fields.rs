use formstate::{
    Action, FormAction, Structure,
    form::FieldKind,
};
use serde_json::json;

use crate::helpers::{FORM, Harness, path};

fn register_counts_registrations<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "a"]);
    h.apply(FormAction::change(FORM, "a", json!("x")).unwrap());
    assert_eq!(h.state().registration(&path("a")).unwrap().count, 2);

    h.apply(FormAction::unregister_field(FORM, "a", true).unwrap());
    assert_eq!(h.state().registration(&path("a")).unwrap().count, 1);
    assert_eq!(h.values(), json!({"a": "x"}));

    h.apply(FormAction::unregister_field(FORM, "a", true).unwrap());
    assert!(h.state().registration(&path("a")).is_none());
    assert_eq!(h.values(), json!({}));
}

fn unregister_without_destroy_keeps_data<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::change(FORM, "a", json!("x")).unwrap());
    h.apply(FormAction::unregister_field(FORM, "a", false).unwrap());
    assert!(!h.state().is_registered(&path("a")));
    assert_eq!(h.values(), json!({"a": "x"}));
}

fn unregister_prunes_emptied_parents<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["deep.nested.a", "other"]);
    h.apply(FormAction::change(FORM, "deep.nested.a", json!(1)).unwrap());
    h.apply(FormAction::change(FORM, "other", json!(2)).unwrap());
    h.apply(FormAction::unregister_field(FORM, "deep.nested.a", true).unwrap());
    assert_eq!(h.values(), json!({"other": 2}));
}

fn unregistered_field_actions_are_identity<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    let before = h.forms.clone();
    for action in [
        FormAction::change(FORM, "b", json!(1)).unwrap(),
        FormAction::blur(FORM, "b", Some(json!(1))).unwrap(),
        FormAction::focus(FORM, "b").unwrap(),
        FormAction::touch(FORM, &["b"]).unwrap(),
        FormAction::untouch(FORM, &["b"]).unwrap(),
        FormAction::array_push(FORM, "b", json!(1)).unwrap(),
        FormAction::start_async_validation(FORM, Some("a")).unwrap(),
    ] {
        h.apply(action);
        assert!(h.forms.same(&before));
    }
}

fn change_sets_value_and_leaves_siblings<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a.x", "b"]);
    h.apply(FormAction::change(FORM, "b", json!({"deep": [1, 2]})).unwrap());
    let before = h.state();

    h.apply(FormAction::change(FORM, "a.x", json!("new")).unwrap());
    let after = h.state();
    assert_eq!(h.values(), json!({"a": {"x": "new"}, "b": {"deep": [1, 2]}}));
    assert!(S::same(
        before.value(&path("b")).unwrap(),
        after.value(&path("b")).unwrap()
    ));
    assert!(!after.touched(&path("a.x")));
    assert!(!after.any_touched());
}

fn change_can_touch<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::new(
        FORM,
        Action::Change {
            name: path("a"),
            value: json!(1),
            touch: true,
        },
    ));
    assert!(h.state().touched(&path("a")));
    assert!(h.state().any_touched());
}

fn change_clears_stored_errors_for_field<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::stop_async_validation(
        FORM,
        Some(json!({"a": "taken", "b": "also taken"})),
    ));
    h.apply(FormAction::stop_submit(FORM, Some(json!({"a": "rejected"}))));

    h.apply(FormAction::change(FORM, "a", json!("other")).unwrap());
    let state = h.state();
    assert_eq!(S::to_plain(state.async_errors()), json!({"b": "also taken"}));
    assert_eq!(S::to_plain(state.submit_errors()), json!({}));
}

fn focus_then_blur<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::focus(FORM, "a").unwrap());
    assert_eq!(h.state().active(), Some(&path("a")));
    assert!(h.state().visited(&path("a")));
    assert!(!h.state().touched(&path("a")));

    h.apply(FormAction::blur(FORM, "a", Some(json!("typed"))).unwrap());
    let state = h.state();
    assert_eq!(state.active(), None);
    assert!(state.touched(&path("a")));
    assert!(state.any_touched());
    assert_eq!(h.values(), json!({"a": "typed"}));
    assert_eq!(h.fields(), json!({"a": {"visited": true, "touched": true}}));
}

fn blur_of_other_field_keeps_active<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::focus(FORM, "a").unwrap());
    h.apply(FormAction::blur(FORM, "b", None).unwrap());
    assert_eq!(h.state().active(), Some(&path("a")));
    assert!(h.state().touched(&path("b")));
}

fn blur_without_touch<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::new(
        FORM,
        Action::Blur {
            name: path("a"),
            value: Some(json!(3)),
            touch: false,
        },
    ));
    assert!(!h.state().touched(&path("a")));
    assert!(!h.state().any_touched());
    assert_eq!(h.values(), json!({"a": 3}));
}

fn initialize_keeps_edited_values<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::initialize(FORM, json!({"a": 1, "b": 2})));
    assert!(h.state().initialized());
    h.apply(FormAction::change(FORM, "b", json!(3)).unwrap());

    h.apply(FormAction::initialize(FORM, json!({"a": 10, "b": 20})));
    assert_eq!(h.values(), json!({"a": 10, "b": 3}));
    assert_eq!(h.initial(), Some(json!({"a": 10, "b": 20})));
}

fn initialize_with_empty_payload_is_uninitialized<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::initialize(FORM, json!("not a map")));
    assert!(!h.state().initialized());
    assert_eq!(h.initial(), None);

    h.apply(FormAction::initialize(FORM, json!({})));
    assert!(!h.state().initialized());
}

fn reset_restores_initial<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::initialize(FORM, json!({"a": 1})));
    h.apply(FormAction::change(FORM, "a", json!(2)).unwrap());
    h.apply(FormAction::change(FORM, "b", json!("x")).unwrap());
    h.apply(FormAction::touch(FORM, &["a"]).unwrap());
    h.apply(FormAction::stop_async_validation(FORM, Some(json!({"a": "bad"}))));

    h.apply(FormAction::reset(FORM));
    let state = h.state();
    assert_eq!(h.values(), json!({"a": 1}));
    assert!(S::same(state.values(), state.initial().unwrap()));
    assert_eq!(h.fields(), json!({}));
    assert!(!S::has_errors(state.async_errors()));
    assert!(!state.any_touched());
    assert!(state.is_registered(&path("b")));

    let before = h.forms.clone();
    h.apply(FormAction::reset(FORM));
    assert!(h.forms.same(&before));
}

fn reset_without_initial_clears_values<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::change(FORM, "a", json!(2)).unwrap());
    h.apply(FormAction::reset(FORM));
    assert_eq!(h.values(), json!({}));
}

fn touch_and_untouch<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a", "b"]);
    h.apply(FormAction::touch(FORM, &["a", "b"]).unwrap());
    assert!(h.state().touched(&path("a")));
    assert!(h.state().touched(&path("b")));
    assert!(h.state().any_touched());

    h.apply(FormAction::untouch(FORM, &["a"]).unwrap());
    assert!(!h.state().touched(&path("a")));
    assert!(h.state().touched(&path("b")));
}

fn registering_a_field_array<S: Structure>() {
    let mut h = Harness::<S>::new();
    h.apply(FormAction::register_field(FORM, "items", FieldKind::FieldArray).unwrap());
    let state = h.state();
    assert_eq!(
        state.registration(&path("items")).map(|field| field.kind),
        Some(FieldKind::FieldArray)
    );
    assert!(state.is_registered(&path("items[3].name")));
    assert!(!state.is_registered(&path("itemsx")));
}

fn field_array_flags_live_beside_element_records<S: Structure>() {
    let mut h = Harness::<S>::new();
    h.apply(FormAction::register_field(FORM, "items", FieldKind::FieldArray).unwrap());
    h.apply(FormAction::stop_submit(
        FORM,
        Some(json!({"items": {"_error": "Need one"}})),
    ));
    h.apply(FormAction::focus(FORM, "items[0].name").unwrap());

    let state = h.state();
    assert!(state.touched(&path("items")));
    assert!(state.visited(&path("items[0].name")));
    assert_eq!(h.fields(), json!({"items": [{"name": {"visited": true}}]}));
    assert_eq!(
        S::to_plain(state.array_fields()),
        json!({"items": {"touched": true}})
    );

    h.apply(FormAction::untouch(FORM, &["items"]).unwrap());
    assert!(!h.state().touched(&path("items")));
    assert!(S::is_empty(h.state().array_fields()));

    h.apply(FormAction::touch(FORM, &["items"]).unwrap());
    h.apply(FormAction::unregister_field(FORM, "items", true).unwrap());
    assert!(S::is_empty(h.state().array_fields()));
}

for_each_structure!(
    register_counts_registrations,
    unregister_without_destroy_keeps_data,
    unregister_prunes_emptied_parents,
    unregistered_field_actions_are_identity,
    change_sets_value_and_leaves_siblings,
    change_can_touch,
    change_clears_stored_errors_for_field,
    focus_then_blur,
    blur_of_other_field_keeps_active,
    blur_without_touch,
    initialize_keeps_edited_values,
    initialize_with_empty_payload_is_uninitialized,
    reset_restores_initial,
    reset_without_initial_clears_values,
    touch_and_untouch,
    registering_a_field_array,
    field_array_flags_live_beside_element_records,
);

//! End-to-end form scenarios.

use formstate::{
    FormAction, Structure,
    derive::{resolve_field, summarize},
    form::FieldKind,
};
use serde_json::json;

use crate::helpers::{FORM, Harness, path};

fn initialize_before_register<S: Structure>() {
    let mut h = Harness::<S>::new();
    h.apply(FormAction::initialize(
        FORM,
        json!({"name": "Ada", "address": {"city": "London"}}),
    ));
    assert!(h.state().initialized());
    assert!(h.state().registered_fields().is_empty());

    h.apply(FormAction::register_field(FORM, "name", FieldKind::Field).unwrap());
    h.apply(FormAction::register_field(FORM, "address.city", FieldKind::Field).unwrap());

    let state = h.state();
    let city = resolve_field(state.as_ref(), &path("address.city"), &S::empty_map());
    assert_eq!(city.value_plain(), json!("London"));
    assert!(city.pristine);
    assert!(summarize(state.as_ref(), &S::empty_map()).pristine);

    h.apply(FormAction::change(FORM, "address.city", json!("Paris")).unwrap());
    let state = h.state();
    assert!(summarize(state.as_ref(), &S::empty_map()).dirty);
    assert!(S::same(
        state.value(&path("name")).unwrap(),
        state.initial_value(&path("name")).unwrap()
    ));
}

fn push_onto_empty_array_keeps_siblings<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["profile"]);
    h.apply(FormAction::register_field(FORM, "tags", FieldKind::FieldArray).unwrap());
    h.apply(FormAction::change(FORM, "profile", json!({"bio": "hi", "links": ["a"]})).unwrap());
    let before = h.state();

    h.apply(FormAction::array_push(FORM, "tags", json!("rust")).unwrap());
    let after = h.state();
    assert_eq!(h.values(), json!({"profile": {"bio": "hi", "links": ["a"]}, "tags": ["rust"]}));
    assert_eq!(h.initial(), Some(json!({"tags": ["rust"]})));
    assert!(S::same(
        before.value(&path("profile")).unwrap(),
        after.value(&path("profile")).unwrap()
    ));

    let tag = resolve_field(after.as_ref(), &path("tags[0]"), &S::empty_map());
    assert_eq!(tag.value_plain(), json!("rust"));
    assert!(tag.pristine);
}

fn edit_then_revert_is_pristine<S: Structure>() {
    let mut h = Harness::<S>::with_fields(&["a"]);
    h.apply(FormAction::initialize(FORM, json!({"a": "start"})));
    h.apply(FormAction::change(FORM, "a", json!("changed")).unwrap());
    h.apply(FormAction::change(FORM, "a", json!("start")).unwrap());
    let state = h.state();
    assert!(summarize(state.as_ref(), &S::empty_map()).pristine);
    assert!(resolve_field(state.as_ref(), &path("a"), &S::empty_map()).pristine);
}

for_each_structure!(
    initialize_before_register,
    push_onto_empty_array_keeps_siblings,
    edit_then_revert_is_pristine,
);

mod flows {
    use std::sync::Arc;

    use formstate::{
        FormConfig, FormController, FormStore, Structure, form::FieldKind,
        validation::OnSubmit,
    };
    use serde_json::json;

    use crate::helpers::FORM;

    async fn signup_flow<S: Structure>() {
        let store = Arc::new(FormStore::<S>::new());
        let config = FormConfig::new(FORM).with_async_blur_fields(&["email"]).unwrap();
        let controller = FormController::new(Arc::clone(&store), config)
            .with_validate(|values: &serde_json::Value, _props: &serde_json::Value| {
                if values["password"].as_str().unwrap_or("").len() < 8 {
                    json!({"password": "Too short"})
                } else {
                    json!({})
                }
            })
            .with_async_validate(|values: serde_json::Value, _props: serde_json::Value| async move {
                if values["email"] == json!("taken@example.com") {
                    Err(json!({"email": "Taken"}))
                } else {
                    Ok(())
                }
            });

        controller.register("email", FieldKind::Field).unwrap();
        controller.register("password", FieldKind::Field).unwrap();
        controller.change("password", json!("correct horse")).unwrap();
        controller.focus("email").unwrap();
        assert!(controller.blur("email", Some(json!("taken@example.com"))).await.unwrap());
        assert_eq!(
            controller.props().field("email").unwrap().error,
            Some(json!("Taken"))
        );

        controller.change("email", json!("new@example.com")).unwrap();
        assert!(controller.props().field("email").unwrap().valid);

        let save = |values: serde_json::Value, _props: serde_json::Value| async move {
            Ok::<_, serde_json::Value>(Some(values["email"].clone()))
        };
        let outcome = controller.submit(Some(&save as &dyn OnSubmit)).await.unwrap();
        assert_eq!(
            outcome,
            formstate::controller::SubmitOutcome::Submitted(Some(json!("new@example.com")))
        );
        assert!(store.form(FORM).is_some_and(|state| !state.submitting()));
    }

    for_each_structure_async!(signup_flow);
}

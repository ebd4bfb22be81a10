//! Async validation and the submit flow, driven through `FormController`.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use formstate::{
    Dispatch, FormConfig, FormController, FormStore, Structure,
    controller::SubmitOutcome,
    form::{FieldKind, FormError},
    validation::{AsyncValidate, OnSubmit},
};
use serde_json::{Value as JsonValue, json};
use tokio::sync::oneshot;

use crate::helpers::{FORM, path};

/// Records every call and answers with a fixed result.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<JsonValue>>>,
    reject: Option<JsonValue>,
}

impl Recorder {
    fn rejecting(errors: JsonValue) -> Self {
        Self {
            reject: Some(errors),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<JsonValue> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AsyncValidate for Recorder {
    async fn validate(
        &self,
        values: &JsonValue,
        _dispatch: &dyn Dispatch,
        _props: &JsonValue,
    ) -> Result<(), JsonValue> {
        self.calls.lock().unwrap().push(values.clone());
        match &self.reject {
            Some(errors) => Err(errors.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OnSubmit for Recorder {
    async fn submit(
        &self,
        values: &JsonValue,
        _dispatch: &dyn Dispatch,
        _props: &JsonValue,
    ) -> Result<Option<JsonValue>, JsonValue> {
        self.calls.lock().unwrap().push(values.clone());
        match &self.reject {
            Some(errors) => Err(errors.clone()),
            None => Ok(Some(json!({"id": 7}))),
        }
    }
}

/// Each call waits for the next queued answer.
#[derive(Clone, Default)]
struct Gate {
    pending: Arc<Mutex<VecDeque<oneshot::Receiver<Result<(), JsonValue>>>>>,
    started: Arc<AtomicUsize>,
}

impl Gate {
    fn queue(&self) -> oneshot::Sender<Result<(), JsonValue>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }

    fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AsyncValidate for Gate {
    async fn validate(
        &self,
        _values: &JsonValue,
        _dispatch: &dyn Dispatch,
        _props: &JsonValue,
    ) -> Result<(), JsonValue> {
        let answer = self.pending.lock().unwrap().pop_front();
        self.started.fetch_add(1, Ordering::SeqCst);
        match answer {
            Some(rx) => rx.await.unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

fn setup_controller<S: Structure>(config: FormConfig, fields: &[&str]) -> FormController<S> {
    let controller = FormController::new(Arc::new(FormStore::new()), config);
    for name in fields {
        controller.register(name, FieldKind::Field).unwrap();
    }
    controller
}

fn required_a(values: &JsonValue, _props: &JsonValue) -> JsonValue {
    match values.get("a") {
        Some(JsonValue::String(s)) if !s.is_empty() => json!({}),
        _ => json!({"a": "Required"}),
    }
}

async fn blur_runs_async_validation_for_listed_fields<S: Structure>() {
    let validator = Recorder::rejecting(json!({"deep": {"foo": "async error"}}));
    let config = FormConfig::new(FORM)
        .with_async_blur_fields(&["deep.foo"])
        .unwrap();
    let controller =
        setup_controller::<S>(config, &["deep.foo", "other"]).with_async_validate(validator.clone());

    assert!(controller.blur("deep.foo", Some(json!("bar"))).await.unwrap());
    assert_eq!(validator.calls(), vec![json!({"deep": {"foo": "bar"}})]);

    let props = controller.props();
    let field = props.field("deep.foo").unwrap();
    assert_eq!(field.error, Some(json!("async error")));
    assert!(!field.valid);
    assert!(field.touched);
    assert!(props.invalid());
    assert!(!controller.async_validating());

    assert!(!controller.blur("other", Some(json!(1))).await.unwrap());
    assert_eq!(validator.calls().len(), 1);
}

async fn blur_skips_pristine_initialized_form<S: Structure>() {
    let validator = Recorder::default();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(validator.clone());
    controller.initialize(json!({"a": "x"}));

    assert!(!controller.blur("a", None).await.unwrap());
    assert!(validator.calls().is_empty());

    assert!(controller.blur("a", Some(json!("y"))).await.unwrap());
    assert_eq!(validator.calls(), vec![json!({"a": "y"})]);
}

async fn blur_runs_on_pristine_uninitialized_form<S: Structure>() {
    let validator = Recorder::default();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(validator.clone());

    assert!(controller.blur("a", None).await.unwrap());
    assert_eq!(validator.calls(), vec![json!({})]);
}

async fn blur_waits_for_sync_validation<S: Structure>() {
    let validator = Recorder::default();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_validate(required_a)
        .with_async_validate(validator.clone());

    assert!(!controller.blur("a", Some(json!(""))).await.unwrap());
    assert!(controller.blur("a", Some(json!("filled"))).await.unwrap());
    assert_eq!(validator.calls().len(), 1);
}

async fn blur_ignores_errors_on_other_fields<S: Structure>() {
    let validator = Recorder::default();
    let config = FormConfig::new(FORM)
        .with_async_blur_fields(&["username"])
        .unwrap();
    let controller = setup_controller::<S>(config, &["username", "password"])
        .with_validate(|_values: &JsonValue, _props: &JsonValue| {
            json!({"password": "Required"})
        })
        .with_async_validate(validator.clone());

    assert!(controller.blur("username", Some(json!("bob"))).await.unwrap());
    assert_eq!(validator.calls(), vec![json!({"username": "bob"})]);
}

async fn blur_pattern_covers_array_elements<S: Structure>() {
    let validator = Recorder::default();
    let config = FormConfig::new(FORM)
        .with_async_blur_fields(&["items[].name"])
        .unwrap();
    let controller = setup_controller::<S>(config, &[]).with_async_validate(validator.clone());
    controller.register("items", FieldKind::FieldArray).unwrap();
    controller.array_push("items", json!({"name": "a"})).unwrap();

    assert!(controller.blur("items[3].name", Some(json!("b"))).await.unwrap());
    assert!(!controller.blur("items[0]", None).await.unwrap());
    assert_eq!(
        validator.calls(),
        vec![json!({"items": [{"name": "a"}, null, null, {"name": "b"}]})]
    );
}

async fn sync_form_error_is_top_level<S: Structure>() {
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_validate(|_values: &JsonValue, _props: &JsonValue| json!({"_error": "Bad form"}));

    let props = controller.props();
    assert_eq!(props.error(), Some(&json!("Bad form")));
    assert!(props.invalid());
    assert!(props.field("a").unwrap().valid);
    assert_eq!(controller.sync_errors(), json!({"_error": "Bad form"}));
}

async fn submit_without_handler_fails<S: Structure>() {
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"]);
    let err = controller.submit(None).await.unwrap_err();
    assert!(matches!(
        err,
        formstate::Error::Form(FormError::MissingSubmitHandler { .. })
    ));
}

async fn submit_blocked_by_sync_errors_touches_fields<S: Structure>() {
    let handler = Recorder::default();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a", "b"])
        .with_validate(required_a)
        .with_on_submit(handler.clone());

    let outcome = controller.submit(None).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Invalid(json!({"a": "Required"})));
    assert!(handler.calls().is_empty());

    let state = controller.state();
    assert!(state.touched(&path("a")));
    assert!(state.touched(&path("b")));
    assert!(!state.submitting());
}

async fn submit_blocked_by_async_errors<S: Structure>() {
    let handler = Recorder::default();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(Recorder::rejecting(json!({"a": "Taken"})));
    controller.change("a", json!("x")).unwrap();

    let outcome = controller.submit(Some(&handler as &dyn OnSubmit)).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Invalid(json!({"a": "Taken"})));
    assert!(handler.calls().is_empty());
    assert_eq!(
        S::to_plain(controller.state().async_errors()),
        json!({"a": "Taken"})
    );
}

async fn submit_succeeds<S: Structure>() {
    let handler = Recorder::default();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(Recorder::default())
        .with_on_submit(handler.clone());
    controller.change("a", json!("x")).unwrap();

    let outcome = controller.submit(None).await.unwrap();
    assert!(outcome.is_submitted());
    assert_eq!(outcome, SubmitOutcome::Submitted(Some(json!({"id": 7}))));
    assert_eq!(handler.calls(), vec![json!({"a": "x"})]);
    assert!(!controller.state().submitting());
    assert!(controller.props().valid());
}

async fn submit_rejected_with_error_tree<S: Structure>() {
    let handler = Recorder::rejecting(json!({"a": "Already used", "_error": "Try again"}));
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a", "b"]);
    controller.change("a", json!("x")).unwrap();

    let outcome = controller.submit(Some(&handler as &dyn OnSubmit)).await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Failed(json!({"a": "Already used", "_error": "Try again"}))
    );
    let state = controller.state();
    assert!(!state.submitting());
    assert!(state.touched(&path("a")));
    assert!(!state.touched(&path("b")));

    let props = controller.props();
    assert_eq!(props.error(), Some(&json!("Try again")));
    assert_eq!(props.field("a").unwrap().error, Some(json!("Already used")));

    controller.change("a", json!("y")).unwrap();
    assert!(controller.props().field("a").unwrap().valid);
}

async fn submit_rejected_with_other_value<S: Structure>() {
    let handler = Recorder::rejecting(json!("connection reset"));
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"]);

    let err = controller.submit(Some(&handler as &dyn OnSubmit)).await.unwrap_err();
    assert!(err.is_submit_failure());
    assert!(!controller.state().submitting());
    assert!(!controller.props().invalid());
}

async fn manual_async_validation<S: Structure>() {
    let passing = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(Recorder::default());
    assert!(passing.async_validate().await.unwrap());

    let rejecting = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(Recorder::rejecting(json!({"a": "no"})));
    rejecting.initialize(json!({"a": "x"}));
    assert!(!rejecting.async_validate().await.unwrap());
    assert!(rejecting.props().invalid());

    let without = setup_controller::<S>(FormConfig::new(FORM), &["a"]);
    assert!(without.async_validate().await.unwrap());
}

async fn non_object_async_rejection_is_an_error<S: Structure>() {
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(Recorder::rejecting(json!(500)));
    controller.change("a", json!("x")).unwrap();

    let err = controller.async_validate().await.unwrap_err();
    assert!(err.is_async_validation_failure());
    assert!(!controller.async_validating());
    assert!(!S::has_errors(controller.state().async_errors()));

    let err = controller.blur("a", None).await.unwrap_err();
    assert!(err.is_async_validation_failure());
}

async fn last_settled_validation_wins<S: Structure>() {
    let gate = Gate::default();
    let first = gate.queue();
    let second = gate.queue();
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"])
        .with_async_validate(gate.clone());

    let driver = async {
        while gate.started() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(controller.async_validating());

        second.send(Err(json!({"a": "from second"}))).unwrap();
        while !S::has_errors(controller.state().async_errors()) {
            tokio::task::yield_now().await;
        }
        assert!(controller.async_validating());
        first.send(Err(json!({"a": "from first"}))).unwrap();
    };

    let (a, b, ()) = tokio::join!(
        controller.async_validate(),
        controller.async_validate(),
        driver
    );
    assert!(!a.unwrap());
    assert!(!b.unwrap());
    assert!(!controller.async_validating());
    assert_eq!(
        S::to_plain(controller.state().async_errors()),
        json!({"a": "from first"})
    );
}

async fn config_controls_touch_and_unmount<S: Structure>() {
    let config = FormConfig::new(FORM)
        .with_touch_on_change(true)
        .with_touch_on_blur(false)
        .with_destroy_on_unmount(false);
    let controller = setup_controller::<S>(config, &["a", "b"]);

    controller.change("a", json!(1)).unwrap();
    controller.blur("b", None).await.unwrap();
    let state = controller.state();
    assert!(state.touched(&path("a")));
    assert!(!state.touched(&path("b")));

    controller.unregister("a").unwrap();
    assert_eq!(controller.values(), json!({"a": 1}));
    controller.unmount();
    assert!(controller.store().form(FORM).is_some());

    let destroying = setup_controller::<S>(FormConfig::new(FORM), &["a"]);
    destroying.change("a", json!(1)).unwrap();
    destroying.unmount();
    assert!(destroying.store().form(FORM).is_none());
}

async fn subscribers_see_dispatches<S: Structure>() {
    let controller = setup_controller::<S>(FormConfig::new(FORM), &["a"]);
    let mut changes = controller.store().subscribe();

    controller.focus("b").unwrap();
    assert!(!changes.has_changed().unwrap());

    controller.change("a", json!("x")).unwrap();
    assert!(changes.has_changed().unwrap());
    let forms = changes.borrow_and_update().clone();
    let state = forms.get(FORM).unwrap();
    assert_eq!(S::to_plain(state.values()), json!({"a": "x"}));
}

for_each_structure_async!(
    blur_runs_async_validation_for_listed_fields,
    blur_skips_pristine_initialized_form,
    blur_runs_on_pristine_uninitialized_form,
    blur_waits_for_sync_validation,
    blur_ignores_errors_on_other_fields,
    blur_pattern_covers_array_elements,
    sync_form_error_is_top_level,
    submit_without_handler_fails,
    submit_blocked_by_sync_errors_touches_fields,
    submit_blocked_by_async_errors,
    submit_succeeds,
    submit_rejected_with_error_tree,
    submit_rejected_with_other_value,
    manual_async_validation,
    non_object_async_rejection_is_an_error,
    last_settled_validation_wins,
    config_controls_touch_and_unmount,
    subscribers_see_dispatches,
);

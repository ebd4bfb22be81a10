//! Drives one form: dispatches its actions and runs validation.
//!
//! [`FormController`] is the only place where validation has side effects.
//! It calls the user-supplied validators outside the reducer and feeds their
//! results back in through ordinary actions:
//!
//! - blur dispatches `BLUR`, then runs async validation when the gating rule
//!   in [`should_async_validate`] allows it;
//! - [`FormController::async_validate`] runs async validation directly;
//! - [`FormController::submit`] runs sync validation, then async validation,
//!   then the submit handler.
//!
//! Concurrent async validations are not cancelled. Each one dispatches
//! `STOP_ASYNC_VALIDATION` when it settles, and the last to settle decides
//! the stored async errors.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::{
    Result,
    config::FormConfig,
    derive::{FormProps, PropsSelector, summarize},
    form::{Action, FieldKind, FormAction, FormError, FormState},
    path::FieldPath,
    store::{Dispatch, FormStore},
    structure::Structure,
    validation::{
        AsyncValidate, OnSubmit, Trigger, Validate, has_errors, run_sync, should_async_validate,
    },
};

/// The result of a submit attempt that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation failed; the handler was not called. Holds the sync errors,
    /// or the async errors when sync validation passed.
    Invalid(JsonValue),
    /// The handler rejected with these errors, now stored as submit errors.
    Failed(JsonValue),
    /// The handler succeeded, with its optional result.
    Submitted(Option<JsonValue>),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

/// Decrements the in-flight counter when dropped, so an abandoned
/// validation future is not counted as running.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Controller for the form named by its [`FormConfig`].
pub struct FormController<S: Structure> {
    store: Arc<FormStore<S>>,
    config: FormConfig,
    validate: Option<Arc<dyn Validate>>,
    async_validate: Option<Arc<dyn AsyncValidate>>,
    on_submit: Option<Arc<dyn OnSubmit>>,
    in_flight: AtomicUsize,
    selector: PropsSelector<S>,
}

impl<S: Structure> std::fmt::Debug for FormController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("config", &self.config)
            .field("validate", &self.validate.is_some())
            .field("async_validate", &self.async_validate.is_some())
            .field("on_submit", &self.on_submit.is_some())
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

impl<S: Structure> FormController<S> {
    pub fn new(store: Arc<FormStore<S>>, config: FormConfig) -> Self {
        Self {
            store,
            config,
            validate: None,
            async_validate: None,
            on_submit: None,
            in_flight: AtomicUsize::new(0),
            selector: PropsSelector::new(),
        }
    }

    pub fn with_validate(mut self, validate: impl Validate + 'static) -> Self {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn with_async_validate(mut self, validate: impl AsyncValidate + 'static) -> Self {
        self.async_validate = Some(Arc::new(validate));
        self
    }

    /// Sets the handler used by [`FormController::submit`] when none is passed.
    pub fn with_on_submit(mut self, on_submit: impl OnSubmit + 'static) -> Self {
        self.on_submit = Some(Arc::new(on_submit));
        self
    }

    pub fn form(&self) -> &str {
        &self.config.form
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<FormStore<S>> {
        &self.store
    }

    /// Snapshot of this form's state. A form that does not exist yet reads
    /// as a fresh state.
    pub fn state(&self) -> Arc<FormState<S>> {
        self.store
            .form(&self.config.form)
            .unwrap_or_else(|| Arc::new(FormState::default()))
    }

    pub fn values(&self) -> JsonValue {
        S::to_plain(self.state().values())
    }

    /// Current result of synchronous validation.
    pub fn sync_errors(&self) -> JsonValue {
        run_sync(self.validate.as_deref(), &self.values(), &self.config.props)
    }

    /// True while at least one async validation is running.
    pub fn async_validating(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Props for every registered field, reusing unchanged field views.
    pub fn props(&self) -> FormProps<S> {
        let state = self.state();
        let names: Vec<FieldPath> = state
            .registered_fields()
            .iter()
            .map(|field| field.name.clone())
            .collect();
        let sync_errors = run_sync(
            self.validate.as_deref(),
            &S::to_plain(state.values()),
            &self.config.props,
        );
        self.selector
            .select(&state, &names, &sync_errors, self.async_validating())
    }

    fn dispatch(&self, action: Action) -> bool {
        self.store
            .dispatch(FormAction::new(self.config.form.clone(), action))
    }

    fn path(name: &str) -> Result<FieldPath> {
        Ok(FieldPath::parse(name)?)
    }

    pub fn register(&self, name: &str, kind: FieldKind) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::RegisterField { name, kind });
        Ok(())
    }

    /// Drops one registration of `name`, destroying its data when the last
    /// one goes and the config allows it.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::UnregisterField {
            name,
            destroy: self.config.destroy_on_unmount,
        });
        Ok(())
    }

    pub fn initialize(&self, values: JsonValue) {
        self.dispatch(Action::Initialize { values });
    }

    pub fn change(&self, name: &str, value: JsonValue) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::Change {
            name,
            value,
            touch: self.config.touch_on_change,
        });
        Ok(())
    }

    pub fn focus(&self, name: &str) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::Focus { name });
        Ok(())
    }

    /// Blurs `name`, then runs async validation if the gating rule allows it.
    ///
    /// Returns whether async validation ran. A rejection with an error tree
    /// is stored, not returned as an error.
    pub async fn blur(&self, name: &str, value: Option<JsonValue>) -> Result<bool> {
        let name = Self::path(name)?;
        self.dispatch(Action::Blur {
            name: name.clone(),
            value,
            touch: self.config.touch_on_blur,
        });

        if self.async_validate.is_none() || !self.config.is_async_blur_field(&name) {
            return Ok(false);
        }
        let state = self.state();
        let values = S::to_plain(state.values());
        let sync_errors = S::from_plain(&run_sync(
            self.validate.as_deref(),
            &values,
            &self.config.props,
        ));
        let field_sync_passes = S::is_blank(S::get_in(&sync_errors, name.segments()));
        let summary = summarize(&state, &sync_errors);
        let trigger = Trigger::Blur(name);
        if !should_async_validate(
            &trigger,
            summary.pristine,
            summary.initialized,
            field_sync_passes,
        ) {
            debug!(form = %self.config.form, ?trigger, "Skipping async validation");
            return Ok(false);
        }
        self.run_async_validation(&trigger, values).await?;
        Ok(true)
    }

    pub fn reset(&self) {
        self.dispatch(Action::Reset);
    }

    pub fn touch(&self, names: &[&str]) -> Result<()> {
        let names = names.iter().map(|name| Self::path(name)).collect::<Result<_>>()?;
        self.dispatch(Action::Touch { names });
        Ok(())
    }

    pub fn untouch(&self, names: &[&str]) -> Result<()> {
        let names = names.iter().map(|name| Self::path(name)).collect::<Result<_>>()?;
        self.dispatch(Action::Untouch { names });
        Ok(())
    }

    pub fn array_push(&self, name: &str, value: JsonValue) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArrayPush { name, value });
        Ok(())
    }

    pub fn array_pop(&self, name: &str) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArrayPop { name });
        Ok(())
    }

    pub fn array_shift(&self, name: &str) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArrayShift { name });
        Ok(())
    }

    pub fn array_unshift(&self, name: &str, value: JsonValue) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArrayUnshift { name, value });
        Ok(())
    }

    pub fn array_insert(&self, name: &str, index: usize, value: JsonValue) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArrayInsert { name, index, value });
        Ok(())
    }

    pub fn array_remove(&self, name: &str, index: usize) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArrayRemove { name, index });
        Ok(())
    }

    pub fn array_swap(&self, name: &str, index_a: usize, index_b: usize) -> Result<()> {
        let name = Self::path(name)?;
        self.dispatch(Action::ArraySwap {
            name,
            index_a,
            index_b,
        });
        Ok(())
    }

    /// Tears the form down, if the config destroys forms on unmount.
    pub fn unmount(&self) {
        if self.config.destroy_on_unmount {
            self.dispatch(Action::Destroy);
        }
        self.selector.clear();
    }

    /// Runs async validation on the current values, regardless of gating.
    ///
    /// Returns `Ok(true)` when the values passed, `Ok(false)` when the
    /// validator rejected with an error tree (now stored as async errors).
    /// Without an async validator the values pass.
    ///
    /// # Errors
    /// [`FormError::AsyncValidationFailure`] if the validator rejected with
    /// anything other than an error tree.
    pub async fn async_validate(&self) -> Result<bool> {
        let outcome = self
            .run_async_validation(&Trigger::Manual, self.values())
            .await?;
        Ok(outcome.is_none())
    }

    /// Returns the rejected error tree, or `None` if validation passed.
    async fn run_async_validation(
        &self,
        trigger: &Trigger,
        values: JsonValue,
    ) -> Result<Option<JsonValue>> {
        let Some(validator) = &self.async_validate else {
            return Ok(None);
        };
        let field = match trigger {
            Trigger::Blur(name) => Some(name.clone()),
            Trigger::Submit | Trigger::Manual => None,
        };
        debug!(form = %self.config.form, ?trigger, "Starting async validation");
        self.dispatch(Action::StartAsyncValidation { field });

        let result = {
            let _in_flight = InFlight::start(&self.in_flight);
            validator
                .validate(&values, self.store.as_ref(), &self.config.props)
                .await
        };

        match result {
            Ok(()) => {
                self.dispatch(Action::StopAsyncValidation { errors: None });
                Ok(None)
            }
            Err(errors @ JsonValue::Object(_)) => {
                debug!(form = %self.config.form, "Async validation rejected values");
                self.dispatch(Action::StopAsyncValidation {
                    errors: Some(errors.clone()),
                });
                Ok(Some(errors))
            }
            Err(other) => {
                warn!(form = %self.config.form, reason = %other, "Async validation failed");
                self.dispatch(Action::StopAsyncValidation { errors: None });
                Err(FormError::AsyncValidationFailure {
                    form: self.config.form.clone(),
                    reason: other.to_string(),
                }
                .into())
            }
        }
    }

    /// Validates and submits the form.
    ///
    /// Uses `on_submit` if given, otherwise the handler set with
    /// [`FormController::with_on_submit`].
    ///
    /// 1. Sync errors touch every registered field and return
    ///    [`SubmitOutcome::Invalid`] without running anything else.
    /// 2. Async validation runs if configured. A rejected error tree returns
    ///    [`SubmitOutcome::Invalid`].
    /// 3. The handler runs between `START_SUBMIT` and `STOP_SUBMIT`. A
    ///    rejected error tree is stored as submit errors and returned as
    ///    [`SubmitOutcome::Failed`].
    ///
    /// # Errors
    /// [`FormError::MissingSubmitHandler`] without a handler, and
    /// [`FormError::AsyncValidationFailure`] or [`FormError::SubmitFailure`]
    /// for rejections that are not error trees.
    pub async fn submit(&self, on_submit: Option<&dyn OnSubmit>) -> Result<SubmitOutcome> {
        let form = self.config.form.clone();
        let Some(handler) = on_submit.or(self.on_submit.as_deref()) else {
            return Err(FormError::MissingSubmitHandler { form }.into());
        };

        let state = self.state();
        let values = S::to_plain(state.values());
        let sync_errors = run_sync(self.validate.as_deref(), &values, &self.config.props);
        if has_errors(&sync_errors) {
            let names = state
                .registered_fields()
                .iter()
                .map(|field| field.name.clone())
                .collect();
            self.dispatch(Action::Touch { names });
            info!(form = %form, "Submit blocked by sync validation");
            return Ok(SubmitOutcome::Invalid(sync_errors));
        }

        if let Some(errors) = self
            .run_async_validation(&Trigger::Submit, values.clone())
            .await?
        {
            info!(form = %form, "Submit blocked by async validation");
            return Ok(SubmitOutcome::Invalid(errors));
        }

        self.dispatch(Action::StartSubmit);
        let result = handler
            .submit(&values, self.store.as_ref(), &self.config.props)
            .await;

        match result {
            Ok(value) => {
                self.dispatch(Action::StopSubmit { errors: None });
                info!(form = %form, "Form submitted");
                Ok(SubmitOutcome::Submitted(value))
            }
            Err(errors @ JsonValue::Object(_)) => {
                self.dispatch(Action::StopSubmit {
                    errors: Some(errors.clone()),
                });
                info!(form = %form, "Submit rejected by handler");
                Ok(SubmitOutcome::Failed(errors))
            }
            Err(other) => {
                self.dispatch(Action::StopSubmit { errors: None });
                warn!(form = %form, reason = %other, "Submit failed");
                Err(FormError::SubmitFailure {
                    form,
                    reason: other.to_string(),
                }
                .into())
            }
        }
    }
}

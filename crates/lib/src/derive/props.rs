//! Props handed to the UI layer, with memoized field views.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use serde_json::Value as JsonValue;
use tracing::trace;

use super::{
    aggregate::{FormSummary, summarize},
    field::{FieldInputs, FieldView},
};
use crate::{form::FormState, path::FieldPath, structure::Structure};

/// Everything derived from one form snapshot.
pub struct FormProps<S: Structure> {
    pub values: S::Tree,
    /// Views of the requested fields, in the order they were requested.
    pub fields: Vec<Arc<FieldView<S>>>,
    pub summary: FormSummary,
    pub active: Option<FieldPath>,
    /// True while an async validation started by the controller is running.
    pub async_validating: bool,
}

impl<S: Structure> fmt::Debug for FormProps<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormProps")
            .field("values", &self.values)
            .field("fields", &self.fields)
            .field("summary", &self.summary)
            .field("active", &self.active)
            .field("async_validating", &self.async_validating)
            .finish()
    }
}

impl<S: Structure> FormProps<S> {
    /// The view of field `name`, if it was requested.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldView<S>>> {
        self.fields.iter().find(|view| view.name.to_string() == name)
    }

    pub fn values_plain(&self) -> JsonValue {
        S::to_plain(&self.values)
    }

    pub fn dirty(&self) -> bool {
        self.summary.dirty
    }

    pub fn pristine(&self) -> bool {
        self.summary.pristine
    }

    pub fn valid(&self) -> bool {
        self.summary.valid
    }

    pub fn invalid(&self) -> bool {
        self.summary.invalid
    }

    pub fn error(&self) -> Option<&JsonValue> {
        self.summary.error.as_ref()
    }
}

struct Cached<S: Structure> {
    inputs: FieldInputs<S>,
    view: Arc<FieldView<S>>,
}

/// Derives props and reuses field views whose inputs did not change.
///
/// A view is reused, as the same `Arc`, when every node it was computed from
/// is identical under [`Structure::same`] and its sync error is equal. A UI
/// layer can therefore re-render exactly the fields whose `Arc` changed.
pub struct PropsSelector<S: Structure> {
    cache: RwLock<BTreeMap<FieldPath, Cached<S>>>,
}

impl<S: Structure> Default for PropsSelector<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Structure> fmt::Debug for PropsSelector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("PropsSelector")
            .field("cached", &cached)
            .finish()
    }
}

impl<S: Structure> PropsSelector<S> {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// Derives props for `fields` from `state`.
    ///
    /// `sync_errors` is the plain result of synchronous validation. Cached
    /// views for fields not in `fields` are dropped.
    pub fn select(
        &self,
        state: &FormState<S>,
        fields: &[FieldPath],
        sync_errors: &JsonValue,
        async_validating: bool,
    ) -> FormProps<S> {
        let sync_errors = S::from_plain(sync_errors);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.retain(|name, _| fields.contains(name));

        let views = fields
            .iter()
            .map(|name| {
                let inputs = FieldInputs::gather(state, name, &sync_errors);
                if let Some(cached) = cache.get(name) {
                    if cached.inputs.same(&inputs) {
                        return Arc::clone(&cached.view);
                    }
                }
                trace!(field = %name, "Deriving field view");
                let view = Arc::new(inputs.resolve(name));
                cache.insert(
                    name.clone(),
                    Cached {
                        inputs,
                        view: Arc::clone(&view),
                    },
                );
                view
            })
            .collect();

        FormProps {
            values: state.values().clone(),
            fields: views,
            summary: summarize(state, &sync_errors),
            active: state.active().cloned(),
            async_validating,
        }
    }

    /// Forgets every cached view.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Derives props without memoization.
pub fn derive_props<S: Structure>(
    state: &FormState<S>,
    fields: &[FieldPath],
    sync_errors: &JsonValue,
) -> FormProps<S> {
    PropsSelector::new().select(state, fields, sync_errors, false)
}

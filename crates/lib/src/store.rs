//! A minimal in-process dispatch target.
//!
//! [`FormStore`] owns a [`Forms`] registry, applies dispatched actions with a
//! [`FormReducer`], and publishes every new registry to subscribers. It exists
//! so that validation and submit flows have something to dispatch to and read
//! from; hosts with their own state container implement [`Dispatch`] on it
//! instead.

use std::sync::{PoisonError, RwLock};

use tokio::sync::watch;
use tracing::trace;

use crate::{
    form::{FormAction, FormReducer, FormState, Forms},
    structure::Structure,
};

/// Something actions can be dispatched to.
///
/// Validators and submit handlers receive a `&dyn Dispatch` so they can feed
/// further actions back into the form.
pub trait Dispatch: Send + Sync {
    /// Applies `action`. Returns true if the state changed.
    fn dispatch(&self, action: FormAction) -> bool;
}

/// Holds the registry of forms and serializes updates to it.
///
/// Dispatches are applied one at a time under a write lock, in the order they
/// acquire it. Reads take a snapshot and never block on reducers.
pub struct FormStore<S: Structure> {
    reducer: FormReducer<S>,
    state: RwLock<Forms<S>>,
    changes: watch::Sender<Forms<S>>,
}

impl<S: Structure> Default for FormStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Structure> std::fmt::Debug for FormStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormStore")
            .field("structure", &S::NAME)
            .field("state", &self.state())
            .finish()
    }
}

impl<S: Structure> FormStore<S> {
    pub fn new() -> Self {
        Self::with_state(Forms::new())
    }

    /// Creates a store seeded with an existing registry.
    pub fn with_state(forms: Forms<S>) -> Self {
        let (changes, _) = watch::channel(forms.clone());
        Self {
            reducer: FormReducer::new(),
            state: RwLock::new(forms),
            changes,
        }
    }

    /// Snapshot of the whole registry.
    pub fn state(&self) -> Forms<S> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of one form.
    pub fn form(&self, name: &str) -> Option<std::sync::Arc<FormState<S>>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Receives every registry produced by a state-changing dispatch.
    pub fn subscribe(&self) -> watch::Receiver<Forms<S>> {
        self.changes.subscribe()
    }
}

impl<S: Structure> Dispatch for FormStore<S> {
    fn dispatch(&self, action: FormAction) -> bool {
        let next = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = self.reducer.reduce(&state, &action);
            if next.same(&state) {
                trace!(form = %action.form, action = action.action.name(), "Dispatch left registry unchanged");
                return false;
            }
            *state = next.clone();
            // Published under the lock so subscribers see dispatch order.
            self.changes.send_replace(next.clone());
            next
        };
        trace!(form = %action.form, forms = next.len(), "Dispatch applied");
        true
    }
}

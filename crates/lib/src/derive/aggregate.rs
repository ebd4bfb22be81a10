//! Form-level flags.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    form::{FORM_ERROR, FormState},
    path::Segment,
    structure::Structure,
};

/// The flags describing a whole form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub dirty: bool,
    pub pristine: bool,
    pub valid: bool,
    pub invalid: bool,
    pub submitting: bool,
    /// Whole-form error from sync, then async, then submit errors.
    pub error: Option<JsonValue>,
    pub any_touched: bool,
    pub initialized: bool,
}

fn form_error<S: Structure>(tree: &S::Tree) -> Option<&S::Tree> {
    S::child(tree, &Segment::key(FORM_ERROR)).filter(|node| !S::is_blank(Some(*node)))
}

/// Computes the summary of `state` given the current sync errors.
///
/// The form is dirty when its values differ from its initial values under
/// [`Structure::deep_equals`], and invalid when any of the three error
/// trees holds a non-blank error.
pub fn summarize<S: Structure>(state: &FormState<S>, sync_errors: &S::Tree) -> FormSummary {
    let dirty = !S::deep_equals(Some(state.values()), state.initial());
    let invalid = S::has_errors(sync_errors)
        || S::has_errors(state.async_errors())
        || S::has_errors(state.submit_errors());
    let error = form_error::<S>(sync_errors)
        .or_else(|| form_error::<S>(state.async_errors()))
        .or_else(|| form_error::<S>(state.submit_errors()))
        .map(|node| S::to_plain(node));

    FormSummary {
        dirty,
        pristine: !dirty,
        valid: !invalid,
        invalid,
        submitting: state.submitting(),
        error,
        any_touched: state.any_touched(),
        initialized: state.initialized(),
    }
}

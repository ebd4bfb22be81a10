//! Pure derivations from form state.
//!
//! Nothing here changes state. Each function reads one immutable
//! [`FormState`](crate::FormState) snapshot plus the current result of
//! synchronous validation, which is never stored and so is passed in.

pub mod aggregate;
pub mod field;
pub mod props;

pub use aggregate::{FormSummary, summarize};
pub use field::{FieldView, resolve_field};
pub use props::{FormProps, PropsSelector, derive_props};

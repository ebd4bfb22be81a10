//! Per-form options.
//!
//! A [`FormConfig`] is deserializable from JSON with camelCase keys, so hosts
//! can keep form options next to the rest of their configuration:
//!
//! ```
//! use formstate::FormConfig;
//!
//! let config: FormConfig = serde_json::from_str(
//!     r#"{"form": "signup", "asyncBlurFields": ["email"], "touchOnChange": true}"#,
//! )?;
//! assert!(config.touch_on_blur);
//! assert!(config.is_async_blur_field(&"email".parse()?));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Validators are not part of the configuration; they are attached to the
//! [`FormController`](crate::FormController).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::path::{FieldPath, FieldPattern, PathError};

/// Options for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    /// Name of the form in the [`Forms`](crate::Forms) registry.
    pub form: String,
    /// Fields whose blur triggers async validation. `None` means every field.
    /// List positions match any index, so `items[].name` covers every element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_blur_fields: Option<Vec<FieldPattern>>,
    /// Mark fields touched when they blur.
    pub touch_on_blur: bool,
    /// Mark fields touched when they change.
    pub touch_on_change: bool,
    /// Remove a field's data when its last registration goes away, and the
    /// whole form on unmount.
    pub destroy_on_unmount: bool,
    /// Passed through to validators and submit handlers.
    pub props: JsonValue,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form: String::new(),
            async_blur_fields: None,
            touch_on_blur: true,
            touch_on_change: false,
            destroy_on_unmount: true,
            props: JsonValue::Object(Default::default()),
        }
    }
}

impl FormConfig {
    pub fn new(form: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            ..Self::default()
        }
    }

    /// Restricts blur-triggered async validation to `names`.
    pub fn with_async_blur_fields(mut self, names: &[&str]) -> Result<Self, PathError> {
        self.async_blur_fields = Some(
            names
                .iter()
                .map(|name| FieldPattern::parse(name))
                .collect::<Result<_, _>>()?,
        );
        Ok(self)
    }

    pub fn with_touch_on_blur(mut self, touch: bool) -> Self {
        self.touch_on_blur = touch;
        self
    }

    pub fn with_touch_on_change(mut self, touch: bool) -> Self {
        self.touch_on_change = touch;
        self
    }

    pub fn with_destroy_on_unmount(mut self, destroy: bool) -> Self {
        self.destroy_on_unmount = destroy;
        self
    }

    pub fn with_props(mut self, props: JsonValue) -> Self {
        self.props = props;
        self
    }

    /// Returns true if blurring `name` may trigger async validation.
    pub fn is_async_blur_field(&self, name: &FieldPath) -> bool {
        match &self.async_blur_fields {
            None => true,
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(name)),
        }
    }
}

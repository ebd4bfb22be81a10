use std::sync::Arc;

use formstate::{
    FormAction, FormReducer, FormState, Forms, Structure,
    form::FieldKind,
    path::FieldPath,
};
use serde_json::Value;

/// Form name used by every test unless it needs several forms.
pub const FORM: &str = "test";

pub fn path(name: &str) -> FieldPath {
    FieldPath::parse(name).expect("test paths are well formed")
}

/// Reducer plus the registry it threads, for driving a form step by step.
pub struct Harness<S: Structure> {
    reducer: FormReducer<S>,
    pub forms: Forms<S>,
}

impl<S: Structure> Harness<S> {
    pub fn new() -> Self {
        Self {
            reducer: FormReducer::new(),
            forms: Forms::new(),
        }
    }

    /// A harness whose form has `fields` registered as plain fields.
    pub fn with_fields(fields: &[&str]) -> Self {
        let mut harness = Self::new();
        for name in fields {
            harness.apply(FormAction::register_field(FORM, name, FieldKind::Field).unwrap());
        }
        harness
    }

    pub fn apply(&mut self, action: FormAction) -> &mut Self {
        self.forms = self.reducer.reduce(&self.forms, &action);
        self
    }

    pub fn state(&self) -> Arc<FormState<S>> {
        Arc::clone(self.forms.get(FORM).expect("form exists"))
    }

    pub fn plain(&self) -> Value {
        self.state().to_plain()
    }

    pub fn values(&self) -> Value {
        S::to_plain(self.state().values())
    }

    pub fn initial(&self) -> Option<Value> {
        self.state().initial().map(|initial| S::to_plain(initial))
    }

    pub fn fields(&self) -> Value {
        S::to_plain(self.state().fields())
    }
}

/// Generates one `#[test]` per structure for each generic test function.
///
/// Each listed function must be generic over `S: Structure` and take no
/// arguments.
macro_rules! for_each_structure {
    ($($name:ident),* $(,)?) => {
        mod plain {
            $(
                #[test]
                fn $name() {
                    super::$name::<formstate::structure::Plain>();
                }
            )*
        }

        #[cfg(feature = "persistent")]
        mod persistent {
            $(
                #[test]
                fn $name() {
                    super::$name::<formstate::structure::Persistent>();
                }
            )*
        }
    };
}

/// Like `for_each_structure!`, for async test functions.
macro_rules! for_each_structure_async {
    ($($name:ident),* $(,)?) => {
        mod plain {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name::<formstate::structure::Plain>().await;
                }
            )*
        }

        #[cfg(feature = "persistent")]
        mod persistent {
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name::<formstate::structure::Persistent>().await;
                }
            )*
        }
    };
}

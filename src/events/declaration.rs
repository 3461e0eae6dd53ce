//! Caller-supplied custom error-handler declarations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ErrorClass;

/// Error class a custom event renders as.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ErrorHandlerDeclaration {
    pub class_name: String,
}

impl ErrorHandlerDeclaration {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }

    /// Resolved class; unrecognised names resolve to Internal.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::from_name(&self.class_name)
    }
}

/// Event name → declaration table, consumed once at assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ErrorHandlers {
    declarations: HashMap<String, ErrorHandlerDeclaration>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that event `name` renders as `class_name`.
    pub fn declare(mut self, name: impl Into<String>, class_name: impl Into<String>) -> Self {
        self.declarations
            .insert(name.into(), ErrorHandlerDeclaration::new(class_name));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ErrorHandlerDeclaration> {
        self.declarations.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorHandlerDeclaration)> {
        self.declarations.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

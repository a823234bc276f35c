//! Intent extraction
//!
//! Turns raw user text into a structured, immutable `Intent`:
//! text -> `extract` -> Intent -> planner

pub mod extractor;

pub use extractor::extract;

use crate::core::types::{ApplicationId, FieldMap};
use serde::Serialize;

/// Parameter keys the extractor may produce
pub mod params {
    pub const FILENAME: &str = "filename";
    pub const URL: &str = "url";
    pub const QUERY: &str = "query";
    pub const QUANTITY: &str = "quantity";
}

/// Structured interpretation of one user instruction
///
/// Built once by the extractor and never mutated afterwards; consumers only
/// get shared access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    raw_text: String,
    application: Option<ApplicationId>,
    task: String,
    parameters: FieldMap,
}

impl Intent {
    pub fn new(
        raw_text: impl Into<String>,
        application: Option<ApplicationId>,
        task: impl Into<String>,
        parameters: FieldMap,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            application,
            task: task.into(),
            parameters,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// `None` means the user never named an application we know
    pub fn application(&self) -> Option<ApplicationId> {
        self.application
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn parameters(&self) -> &FieldMap {
        &self.parameters
    }

    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }
}

//! Test protocol rows and the steps they are grouped into.

use serde::{Deserialize, Serialize};

/// One row of the test protocol: a string expected on a screen at a step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolRow {
    pub step_id: String,
    pub screen_id: String,
    pub expected_string_id: String,
}

/// A protocol step: one screen and the string identifiers expected on it,
/// in protocol order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestStep {
    step_id: String,
    screen_id: String,
    string_ids: Vec<String>,
}

impl TestStep {
    pub fn new(step_id: impl Into<String>, screen_id: impl Into<String>, string_ids: Vec<String>) -> Self {
        Self {
            step_id: step_id.into(),
            screen_id: screen_id.into(),
            string_ids,
        }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn screen_id(&self) -> &str {
        &self.screen_id
    }

    pub fn string_ids(&self) -> &[String] {
        &self.string_ids
    }
}

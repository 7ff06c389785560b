//! Trial log entry

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One opaque trial record. Insertion order is the only meaningful order;
/// `trialNumber` and `trialDate` are read only for secondary lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialLogEntry(Value);

impl TrialLogEntry {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn trial_number(&self) -> Option<i64> {
        self.0.get("trialNumber").and_then(Value::as_i64)
    }

    pub fn trial_date(&self) -> Option<&str> {
        self.0.get("trialDate").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for TrialLogEntry {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

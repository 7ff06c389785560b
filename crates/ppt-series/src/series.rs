//! Series data structure

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

const ID_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Unique identifier; empty means the series has no id
    #[serde(default)]
    pub id: String,
    /// Everything else the caller stores, including the optional `createdAt`.
    /// Never holds an `id` key.
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Series {
    /// A new series with a generated id and a `createdAt` timestamp.
    pub fn new() -> Self {
        let mut series = Self::with_id(Uuid::new_v4().to_string());
        series
            .fields
            .insert("createdAt".to_string(), Value::String(Utc::now().to_rfc3339()));
        series
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Parse an arbitrary JSON object. Returns `None` unless it carries a
    /// non-empty string `id`.
    pub fn from_value(value: Value) -> Option<Self> {
        let mut series = serde_json::from_value::<Series>(value).ok()?;
        series.fields.remove(ID_KEY);
        Some(series).filter(Series::has_id)
    }

    /// Set a payload field. The `id` key is reserved and ignored here.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != ID_KEY {
            self.fields.insert(key, value);
        }
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn created_at(&self) -> Option<&Value> {
        self.fields.get("createdAt")
    }
}

impl Default for Series {
    fn default() -> Self {
        Self::new()
    }
}

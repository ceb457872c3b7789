use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartError, ChartResult};

/// Engine render options as an opaque JSON document.
///
/// Equality is structural, so two independently built option trees compare
/// equal when their content matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderOptions(Value);

impl Default for RenderOptions {
    fn default() -> Self {
        Self::empty()
    }
}

impl RenderOptions {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map(Self)
            .map_err(|e| ChartError::InvalidOptions(format!("failed to parse options json: {e}")))
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self.0).map_err(|e| {
            ChartError::InvalidOptions(format!("failed to serialize options json: {e}"))
        })
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Looks up a nested value by a `/`-separated JSON pointer.
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Merges `other` on top of `self` the way chart engines merge option
    /// updates: objects merge key-wise, any other value replaces.
    pub fn merge(&mut self, other: &RenderOptions) {
        merge_value(&mut self.0, &other.0);
    }

    #[must_use]
    pub fn merged(mut self, other: &RenderOptions) -> Self {
        self.merge(other);
        self
    }
}

impl From<Value> for RenderOptions {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn merge_value(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) => merge_value(existing, patch_value),
                    None => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Layout configuration as a JSON object addressed by dotted paths (`sequence.arrowSize`).
///
/// The engine reads typed values out of this with defaults; unknown keys are ignored so a
/// host can keep its own settings next to ours.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqlineConfig(Value);

impl Default for SeqlineConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl SeqlineConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|err| Error::InvalidConfigJson {
                message: err.to_string(),
            })?;
        if !value.is_object() {
            return Err(Error::InvalidConfigJson {
                message: "config root must be a JSON object".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn get(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.get(dotted_path)?.as_str()
    }

    pub fn get_bool(&self, dotted_path: &str) -> Option<bool> {
        self.get(dotted_path)?.as_bool()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        let v = self.get(dotted_path)?;
        v.as_f64()
            .or_else(|| v.as_i64().map(|n| n as f64))
            .or_else(|| v.as_u64().map(|n| n as f64))
    }

    /// Sets `dotted_path`, creating (or replacing non-object) intermediate tables.
    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        let path: Vec<&str> = dotted_path.split('.').collect();
        insert_at(&mut self.0, &path, value);
    }

    /// Applies a `key=value` override. The value is parsed as JSON when possible
    /// (`true`, `12`, `["#fff"]`) and kept as a plain string otherwise.
    pub fn apply_override(&mut self, assignment: &str) -> Result<()> {
        let Some((key, raw)) = assignment.split_once('=') else {
            return Err(Error::InvalidConfigOverride {
                assignment: assignment.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(Error::InvalidConfigOverride {
                assignment: assignment.to_string(),
            });
        }
        let raw = raw.trim();
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        self.set_value(key, value);
        Ok(())
    }

    /// Merges `other` into this config; objects merge key by key, anything else replaces.
    pub fn deep_merge(&mut self, other: &Value) {
        merge_into(&mut self.0, other);
    }
}

fn insert_at(node: &mut Value, path: &[&str], value: Value) {
    let Some((key, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(table) = node {
        insert_at(table.entry(*key).or_insert(Value::Null), rest, value);
    }
}

fn merge_into(base: &mut Value, incoming: &Value) {
    if let (Value::Object(table), Value::Object(overlay)) = (&mut *base, incoming) {
        for (key, value) in overlay {
            merge_into(table.entry(key.as_str()).or_insert(Value::Null), value);
        }
        return;
    }
    *base = incoming.clone();
}

//! Connector options as an ordered key/value bag.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

pub use serde_json::Value;

/// Options handed to a connector: file path, query, selections, and any
/// format-specific keys.
pub type Properties = IndexMap<String, Value>;

/// Convenience methods for [`Properties`].
pub trait PropertiesExt {
    /// Builder-style insert.
    fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self;

    fn get_str(&self, key: &str) -> Option<&str>;

    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Deserialize the whole bag into a typed options struct.
    fn to_options<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error>;
}

impl PropertiesExt for Properties {
    fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    fn to_options<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let object: serde_json::Map<String, Value> =
            self.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        serde_json::from_value(Value::Object(object))
    }
}

//! Named tool arguments.

use crate::error::{GeoAwareError, Result};
use crate::image::ImageHandle;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single argument value: plain JSON, or an image resolved from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Json(Value),
    Image(ImageHandle),
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        ArgValue::Json(value)
    }
}

impl From<ImageHandle> for ArgValue {
    fn from(image: ImageHandle) -> Self {
        ArgValue::Image(image)
    }
}

/// Named arguments passed to [`Tool::run`](super::Tool::run).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(BTreeMap<String, ArgValue>);

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from a decoded JSON object.
    pub fn from_json(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k, ArgValue::Json(v)))
                .collect(),
        )
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.0.iter()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut ArgValue> {
        self.0.values_mut()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ArgValue::Json(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get_str(name)
            .ok_or_else(|| GeoAwareError::InvalidInput(format!("Missing '{}' argument", name)))
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.0.get(name) {
            Some(ArgValue::Json(v)) => v.as_f64(),
            _ => None,
        }
    }

    pub fn require_image(&self, name: &str) -> Result<&ImageHandle> {
        match self.0.get(name) {
            Some(ArgValue::Image(image)) => Ok(image),
            Some(ArgValue::Json(_)) => Err(GeoAwareError::InvalidInput(format!(
                "Argument '{}' is not an image reference",
                name
            ))),
            None => Err(GeoAwareError::InvalidInput(format!(
                "Missing '{}' argument",
                name
            ))),
        }
    }

    /// JSON view for logging; images are shown as a short marker.
    pub fn to_json(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    ArgValue::Json(v) => v.clone(),
                    ArgValue::Image(img) => {
                        Value::String(format!("<{} image, {} bytes>", img.media_type(), img.len()))
                    }
                };
                (k.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}

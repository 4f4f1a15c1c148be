use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An installed application the service considers relevant for hooking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEntry {
    pub package_name: String,

    #[serde(default)]
    pub uid: i32,

    #[serde(default)]
    pub label: String,

    #[serde(default, flatten)]
    pub attributes: Map<String, Value>,
}

impl AppEntry {
    pub fn new(package_name: impl Into<String>, uid: i32, label: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            uid,
            label: label.into(),
            attributes: Map::new(),
        }
    }
}

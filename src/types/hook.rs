use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One instrumentable API point as described by the service. The sync core
/// only counts and forwards these; the attributes are owned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    pub id: String,

    #[serde(default)]
    pub group: String,

    #[serde(default, flatten)]
    pub attributes: Map<String, Value>,
}

impl Hook {
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            attributes: Map::new(),
        }
    }

    /// Reads a JSON array of hook definitions, as shipped alongside debug builds.
    pub fn read_definitions(path: &Path) -> Result<Vec<Hook>> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read hook definitions {}", path.display()))?;

        let hooks: Vec<Hook> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse hook definitions {}", path.display()))?;

        if let Some(hook) = hooks.iter().find(|hook| hook.id.trim().is_empty()) {
            anyhow::bail!("hook definition without id in group \"{}\"", hook.group);
        }

        Ok(hooks)
    }
}

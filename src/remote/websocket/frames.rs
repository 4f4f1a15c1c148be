use serde::{Deserialize, Serialize};

use crate::types::hook::Hook;

pub const HOOKS_CHANNEL: &str = "hooks";
pub const APPS_CHANNEL: &str = "apps";
pub const EVENTS_CHANNEL: &str = "events";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    Hooks,
    Apps,
    SetHooks { hooks: Vec<Hook> },
    Subscribe { channel: String },
}

/// Frame pushed by the service. Stream frames carry `data`/`last` or `error`,
/// event frames carry `event`.
#[derive(Debug, Deserialize)]
pub struct Frame<T> {
    #[serde(default)]
    pub channel: Option<String>,

    pub data: Option<Vec<T>>,

    #[serde(default)]
    pub last: bool,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub event: Option<ChangeEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    DataChanged,
    PackageChanged,
}

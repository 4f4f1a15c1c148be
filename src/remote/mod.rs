pub mod simulated;
pub mod websocket;

#[cfg(test)]
pub mod scripted;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::listener::ChangeListener;
use crate::sync::{StreamReceiver, error::ServiceError};
use crate::types::{app_entry::AppEntry, hook::Hook};

pub type HookReceiver = Arc<dyn StreamReceiver<Hook>>;
pub type AppReceiver = Arc<dyn StreamReceiver<AppEntry>>;

pub type DynamicRemote = Arc<dyn RemoteInventoryService>;

/// The service that owns hook and application inventory. Streams are pushed
/// into the given receivers after the call returns, in order per stream.
#[async_trait]
pub trait RemoteInventoryService: Send + Sync {
    async fn push_debug_hooks(&self, source: &Path) -> Result<(), ServiceError>;
    async fn stream_hooks(&self, receiver: HookReceiver) -> Result<(), ServiceError>;
    async fn stream_apps(&self, receiver: AppReceiver) -> Result<(), ServiceError>;
    async fn register_change_listener(
        &self,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<(), ServiceError>;
    async fn unregister_change_listener(&self, listener: Uuid) -> Result<(), ServiceError>;
}

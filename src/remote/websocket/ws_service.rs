use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::listener::ChangeListener;
use crate::remote::websocket::{
    frames::{APPS_CHANNEL, ChangeEvent, EVENTS_CHANNEL, Frame, HOOKS_CHANNEL, Request},
    ws_config::WebSocketConfig,
};
use crate::remote::{AppReceiver, HookReceiver, RemoteInventoryService};
use crate::sync::{StreamReceiver, error::ServiceError};
use crate::types::{batch::Batch, hook::Hook};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Talks to an out-of-process inventory service over JSON WebSocket frames.
/// Every stream and every listener subscription uses its own connection.
pub struct WebSocketService {
    config: WebSocketConfig,
    subscriptions: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl WebSocketService {
    pub fn new(config: WebSocketConfig) -> Self {
        Self {
            config,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    async fn open(&self, request: &Request) -> Result<WsStream, ServiceError> {
        let url = self.config.url.as_str();

        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|error| ServiceError::transport(format!("connect_async({url}) failed: {error}")))?;

        let text = serde_json::to_string(request)
            .map_err(|error| ServiceError::transport(format!("failed to encode request: {error}")))?;

        ws.send(Message::Text(text))
            .await
            .map_err(|error| ServiceError::transport(format!("failed to send request: {error}")))?;

        Ok(ws)
    }

    fn subscriptions(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, JoinHandle<()>>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for WebSocketService {
    fn drop(&mut self) {
        for (_, task) in self.subscriptions().drain() {
            task.abort();
        }
    }
}

#[async_trait]
impl RemoteInventoryService for WebSocketService {
    async fn push_debug_hooks(&self, source: &Path) -> Result<(), ServiceError> {
        let hooks = Hook::read_definitions(source)
            .map_err(|error| ServiceError::application(format!("{error:#}")))?;

        info!(hooks = hooks.len(), "sending debug hooks");
        let mut ws = self.open(&Request::SetHooks { hooks }).await?;
        let _ = ws.close(None).await;

        Ok(())
    }

    async fn stream_hooks(&self, receiver: HookReceiver) -> Result<(), ServiceError> {
        let ws = self.open(&Request::Hooks).await?;
        tokio::spawn(pump_stream(ws, HOOKS_CHANNEL, receiver));
        Ok(())
    }

    async fn stream_apps(&self, receiver: AppReceiver) -> Result<(), ServiceError> {
        let ws = self.open(&Request::Apps).await?;
        tokio::spawn(pump_stream(ws, APPS_CHANNEL, receiver));
        Ok(())
    }

    async fn register_change_listener(
        &self,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<(), ServiceError> {
        let ws = self
            .open(&Request::Subscribe {
                channel: EVENTS_CHANNEL.to_string(),
            })
            .await?;

        let id = listener.id();
        let task = tokio::spawn(pump_events(ws, listener));

        if let Some(previous) = self.subscriptions().insert(id, task) {
            previous.abort();
        }

        Ok(())
    }

    async fn unregister_change_listener(&self, listener: Uuid) -> Result<(), ServiceError> {
        match self.subscriptions().remove(&listener) {
            Some(task) => {
                task.abort();
                Ok(())
            }
            None => Err(ServiceError::application(format!(
                "listener {listener} is not registered"
            ))),
        }
    }
}

async fn pump_stream<T: DeserializeOwned + Send + 'static>(
    mut ws: WsStream,
    channel: &'static str,
    receiver: Arc<dyn StreamReceiver<T>>,
) {
    let mut round_ended = receiver.closed();

    loop {
        let message = tokio::select! {
            message = ws.next() => message,
            _ = &mut round_ended => {
                debug!(channel, "round ended before final batch, closing stream");
                let _ = ws.close(None).await;
                return;
            }
        };
        let Some(message) = message else { break };

        let message = match message {
            Ok(message) => message,
            Err(error) => {
                receiver.fail(ServiceError::transport(format!("{channel} stream failed: {error}")));
                return;
            }
        };
        let Ok(text) = message.into_text() else { continue };

        let frame: Frame<T> = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            /* NOTE: ignore non-frame messages */
            Err(_) => continue,
        };

        if frame.channel.as_deref() != Some(channel) {
            continue;
        }

        if let Some(error) = frame.error {
            receiver.fail(ServiceError::Application(error));
            return;
        }

        let last = frame.last;
        receiver.transfer(Batch::new(frame.data.unwrap_or_default(), last));

        if last {
            let _ = ws.close(None).await;
            return;
        }
    }

    receiver.fail(ServiceError::transport(format!(
        "{channel} stream closed before final batch"
    )));
}

async fn pump_events(mut ws: WsStream, listener: Arc<dyn ChangeListener>) {
    while let Some(message) = ws.next().await {
        let message = match message {
            Ok(message) => message,
            Err(error) => {
                warn!(%error, listener = %listener.id(), "event subscription failed");
                return;
            }
        };
        let Ok(text) = message.into_text() else { continue };

        let Ok(frame) = serde_json::from_str::<Frame<serde_json::Value>>(&text) else {
            continue;
        };

        if frame.channel.as_deref() != Some(EVENTS_CHANNEL) {
            continue;
        }

        match frame.event {
            Some(ChangeEvent::DataChanged) => listener.on_data_changed(),
            Some(ChangeEvent::PackageChanged) => listener.on_package_changed(),
            None => debug!("event frame without event"),
        }
    }

    warn!(listener = %listener.id(), "event subscription closed by service");
}

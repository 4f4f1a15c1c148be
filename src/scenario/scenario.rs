use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::{
    config::settings::SyncSettings,
    remote::{
        DynamicRemote,
        simulated::SimulatedService,
        websocket::{ws_config::WebSocketConfig, ws_service::WebSocketService},
    },
    scenario::services::ServiceKind,
    sync::client::InventorySyncClient,
    types::{app_entry::AppEntry, hook::Hook},
};

pub struct Scenario;

impl Scenario {
    pub fn remote(kind: ServiceKind, settings: &SyncSettings) -> Result<DynamicRemote> {
        tracing::info!(service = %kind, "connecting inventory service");

        let remote: DynamicRemote = match kind {
            ServiceKind::Simulated => {
                let service = Arc::new(
                    SimulatedService::new(demo_hooks(), demo_apps()).with_batching(
                        settings.simulated.batch_size,
                        Duration::from_millis(settings.simulated.max_batch_delay_ms),
                    ),
                );

                tokio::spawn(simulate_changes(service.clone()));
                service
            }
            ServiceKind::WebSocket => {
                let config = WebSocketConfig::from_env()?;

                Arc::new(WebSocketService::new(config))
            }
        };

        Ok(remote)
    }

    pub fn client(settings: &SyncSettings) -> InventorySyncClient {
        match settings.debug_hooks() {
            Some(source) => {
                tracing::info!(source = %source.display(), "debug hooks enabled");
                InventorySyncClient::new().with_debug_hooks(source)
            }
            None => InventorySyncClient::new(),
        }
    }
}

/// Drives the simulated service through a package install, a removal and a
/// hook update so both change notifications are exercised.
async fn simulate_changes(service: Arc<SimulatedService>) {
    tokio::time::sleep(Duration::from_secs(3)).await;
    service.install_app(AppEntry::new("org.example.notes", 10_104, "Notes"));

    tokio::time::sleep(Duration::from_secs(3)).await;
    service.remove_app("com.example.camera");

    tokio::time::sleep(Duration::from_secs(3)).await;
    let mut hooks = demo_hooks();
    hooks.push(Hook::new("Read.Clipboard", "Read.Clipboard"));
    service.replace_hooks(hooks);
}

fn demo_hooks() -> Vec<Hook> {
    [
        ("Get.Location.lastKnown", "Get.Location"),
        ("Get.Location.request", "Get.Location"),
        ("Read.IMEI", "Read.Telephony"),
        ("Read.SubscriberId", "Read.Telephony"),
        ("Read.Contacts", "Read.Contacts"),
        ("Use.Camera", "Use.Camera"),
    ]
    .into_iter()
    .map(|(id, group)| Hook::new(id, group))
    .collect()
}

fn demo_apps() -> Vec<AppEntry> {
    vec![
        AppEntry::new("com.example.mail", 10_101, "Mail"),
        AppEntry::new("com.example.maps", 10_102, "Maps"),
        AppEntry::new("com.example.camera", 10_103, "Camera"),
    ]
}

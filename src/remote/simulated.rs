use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::listener::ChangeListener;
use crate::remote::{AppReceiver, HookReceiver, RemoteInventoryService};
use crate::sync::{StreamReceiver, error::ServiceError};
use crate::types::{app_entry::AppEntry, batch::into_batches, hook::Hook};

const DEFAULT_BATCH_SIZE: usize = 50;

/// In-process inventory service. Streams are delivered from a spawned task in
/// batches, with a random delay of up to `max_batch_delay` before each one.
pub struct SimulatedService {
    inventory: Mutex<Inventory>,
    listeners: Mutex<HashMap<Uuid, Arc<dyn ChangeListener>>>,
    batch_size: usize,
    max_batch_delay: Duration,
}

#[derive(Debug, Default, Clone)]
struct Inventory {
    hooks: Vec<Hook>,
    apps: Vec<AppEntry>,
}

impl SimulatedService {
    pub fn new(hooks: Vec<Hook>, apps: Vec<AppEntry>) -> Self {
        Self {
            inventory: Mutex::new(Inventory { hooks, apps }),
            listeners: Mutex::new(HashMap::new()),
            batch_size: DEFAULT_BATCH_SIZE,
            max_batch_delay: Duration::ZERO,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, max_batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.max_batch_delay = max_batch_delay;
        self
    }

    pub fn replace_hooks(&self, hooks: Vec<Hook>) {
        info!(hooks = hooks.len(), "replacing hook definitions");
        self.inventory().hooks = hooks;
        self.notify(|listener| listener.on_data_changed());
    }

    /// Installs or updates an application, keyed by package name.
    pub fn install_app(&self, app: AppEntry) {
        info!(package = %app.package_name, "installing application");
        {
            let mut inventory = self.inventory();
            match inventory
                .apps
                .iter_mut()
                .find(|existing| existing.package_name == app.package_name)
            {
                Some(existing) => *existing = app,
                None => inventory.apps.push(app),
            }
        }
        self.notify(|listener| listener.on_package_changed());
    }

    pub fn remove_app(&self, package_name: &str) -> bool {
        let removed = {
            let mut inventory = self.inventory();
            let before = inventory.apps.len();
            inventory.apps.retain(|app| app.package_name != package_name);
            inventory.apps.len() != before
        };

        if removed {
            info!(package = package_name, "removed application");
            self.notify(|listener| listener.on_package_changed());
        }

        removed
    }

    fn inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inventory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, notification: impl Fn(&dyn ChangeListener)) {
        let listeners: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            notification(listener.as_ref());
        }
    }

    fn stream<T: Send + 'static>(&self, items: Vec<T>, receiver: Arc<dyn StreamReceiver<T>>) {
        let batches = into_batches(items, self.batch_size);
        let max_delay_ms = self.max_batch_delay.as_millis() as u64;

        tokio::spawn(async move {
            for batch in batches {
                let delay_ms = {
                    let mut rng = rand::rng();
                    rng.random_range(0..=max_delay_ms)
                };

                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }

                debug!(items = batch.len(), last = batch.last, "pushing batch");
                receiver.transfer(batch);
            }
        });
    }
}

#[async_trait]
impl RemoteInventoryService for SimulatedService {
    async fn push_debug_hooks(&self, source: &Path) -> Result<(), ServiceError> {
        let hooks = Hook::read_definitions(source)
            .map_err(|error| ServiceError::application(format!("{error:#}")))?;

        self.replace_hooks(hooks);
        Ok(())
    }

    async fn stream_hooks(&self, receiver: HookReceiver) -> Result<(), ServiceError> {
        let hooks = self.inventory().hooks.clone();
        self.stream(hooks, receiver);
        Ok(())
    }

    async fn stream_apps(&self, receiver: AppReceiver) -> Result<(), ServiceError> {
        let apps = self.inventory().apps.clone();
        self.stream(apps, receiver);
        Ok(())
    }

    async fn register_change_listener(
        &self,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<(), ServiceError> {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        listeners.insert(listener.id(), listener);
        Ok(())
    }

    async fn unregister_change_listener(&self, listener: Uuid) -> Result<(), ServiceError> {
        let removed = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&listener);

        match removed {
            Some(_) => Ok(()),
            None => Err(ServiceError::application(format!(
                "listener {listener} is not registered"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::listener::restart::{RestartOnChange, RestartReason, restart_channel};
    use crate::sync::client::{DEFAULT_BATCH_TIMEOUT, InventorySyncClient};

    fn hooks(count: usize) -> Vec<Hook> {
        (0..count)
            .map(|i| Hook::new(format!("hook.{i}"), "Simulated"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn streams_whole_inventory_across_many_batches() {
        let service = SimulatedService::new(
            hooks(7),
            vec![AppEntry::new("com.example.mail", 10_001, "Mail")],
        )
        .with_batching(2, Duration::from_millis(40));

        let snapshot = InventorySyncClient::new()
            .synchronize(&service, DEFAULT_BATCH_TIMEOUT)
            .await
            .into_result()
            .unwrap();

        assert_eq!(snapshot.hooks(), hooks(7).as_slice());
        assert_eq!(snapshot.apps().len(), 1);
    }

    #[tokio::test]
    async fn package_changes_notify_registered_listeners() {
        let service = SimulatedService::new(vec![], vec![]);
        let (restarts, mut rx) = restart_channel();
        let listener = Arc::new(RestartOnChange::new(restarts));
        service
            .register_change_listener(listener.clone())
            .await
            .unwrap();

        service.install_app(AppEntry::new("com.example.maps", 10_002, "Maps"));
        assert_eq!(rx.try_recv().ok(), Some(RestartReason::PackageChanged));

        assert!(service.remove_app("com.example.maps"));
        assert_eq!(rx.try_recv().ok(), Some(RestartReason::PackageChanged));
        assert!(!service.remove_app("com.example.maps"));

        service.unregister_change_listener(listener.id()).await.unwrap();
        service.replace_hooks(hooks(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregistering_unknown_listener_is_an_error() {
        let service = SimulatedService::new(vec![], vec![]);
        assert!(
            service
                .unregister_change_listener(Uuid::new_v4())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn debug_hooks_replace_the_hook_set() {
        let service = SimulatedService::new(hooks(3), vec![]);
        let path = std::env::temp_dir().join(format!("debug-hooks-{}.json", Uuid::new_v4()));
        fs::write(&path, r#"[{"id":"Debug.Hook","group":"Debug"}]"#).unwrap();

        service.push_debug_hooks(&path).await.unwrap();
        fs::remove_file(&path).ok();

        let hooks = service.inventory().hooks.clone();
        assert_eq!(hooks, vec![Hook::new("Debug.Hook", "Debug")]);
    }

    #[tokio::test]
    async fn unreadable_debug_hooks_are_a_service_error() {
        let service = SimulatedService::new(vec![], vec![]);
        let result = service
            .push_debug_hooks(Path::new("/nonexistent/hooks.json"))
            .await;

        assert!(matches!(result, Err(ServiceError::Application(_))));
    }
}

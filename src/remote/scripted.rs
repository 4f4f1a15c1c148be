use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::listener::ChangeListener;
use crate::remote::{AppReceiver, HookReceiver, RemoteInventoryService};
use crate::sync::{StreamReceiver, error::ServiceError};
use crate::types::{app_entry::AppEntry, batch::Batch, hook::Hook};

/// How the scripted service answers one stream call.
pub enum Script<T> {
    Deliver(Vec<Batch<T>>),
    FailMidStream(Vec<Batch<T>>, ServiceError),
    CallFails(ServiceError),
    /// Keeps the receiver without delivering anything.
    Hold,
}

/// Test double: answers stream calls from per-stream script queues and keeps
/// held receivers so tests can fire late callbacks.
#[derive(Default)]
pub struct ScriptedService {
    hook_scripts: Mutex<VecDeque<Script<Hook>>>,
    app_scripts: Mutex<VecDeque<Script<AppEntry>>>,
    held_hooks: Mutex<Vec<HookReceiver>>,
    held_apps: Mutex<Vec<AppReceiver>>,
    hook_calls: AtomicUsize,
    app_calls: AtomicUsize,
    debug_pushes: Mutex<Vec<PathBuf>>,
    listeners: Mutex<HashMap<Uuid, Arc<dyn ChangeListener>>>,
    unregistered: Mutex<Vec<Uuid>>,
    fail_registration: AtomicBool,
    fail_unregistration: AtomicBool,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_hooks(&self, script: Script<Hook>) {
        self.hook_scripts.lock().unwrap().push_back(script);
    }

    pub fn script_apps(&self, script: Script<AppEntry>) {
        self.app_scripts.lock().unwrap().push_back(script);
    }

    /// Scripts one complete round delivering the given collections.
    pub fn script_round(&self, hooks: Vec<Hook>, apps: Vec<AppEntry>) {
        self.script_hooks(Script::Deliver(vec![Batch::last(hooks)]));
        self.script_apps(Script::Deliver(vec![Batch::last(apps)]));
    }

    pub fn hook_calls(&self) -> usize {
        self.hook_calls.load(Ordering::SeqCst)
    }

    pub fn app_calls(&self) -> usize {
        self.app_calls.load(Ordering::SeqCst)
    }

    pub fn held_hooks(&self) -> Vec<HookReceiver> {
        self.held_hooks.lock().unwrap().clone()
    }

    pub fn debug_pushes(&self) -> Vec<PathBuf> {
        self.debug_pushes.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn unregistered(&self) -> Vec<Uuid> {
        self.unregistered.lock().unwrap().clone()
    }

    pub fn fail_registration(&self) {
        self.fail_registration.store(true, Ordering::SeqCst);
    }

    pub fn fail_unregistration(&self) {
        self.fail_unregistration.store(true, Ordering::SeqCst);
    }

    pub fn notify_data_changed(&self) {
        for listener in self.snapshot_listeners() {
            listener.on_data_changed();
        }
    }

    pub fn notify_package_changed(&self) {
        for listener in self.snapshot_listeners() {
            listener.on_package_changed();
        }
    }

    fn snapshot_listeners(&self) -> Vec<Arc<dyn ChangeListener>> {
        self.listeners.lock().unwrap().values().cloned().collect()
    }
}

fn play<T: Send + 'static>(
    script: Option<Script<T>>,
    receiver: Arc<dyn StreamReceiver<T>>,
    held: &Mutex<Vec<Arc<dyn StreamReceiver<T>>>>,
) -> Result<(), ServiceError> {
    match script.unwrap_or(Script::Hold) {
        Script::Deliver(batches) => {
            tokio::spawn(async move {
                for batch in batches {
                    tokio::task::yield_now().await;
                    receiver.transfer(batch);
                }
            });
            Ok(())
        }
        Script::FailMidStream(batches, error) => {
            tokio::spawn(async move {
                for batch in batches {
                    tokio::task::yield_now().await;
                    receiver.transfer(batch);
                }
                receiver.fail(error);
            });
            Ok(())
        }
        Script::CallFails(error) => Err(error),
        Script::Hold => {
            held.lock().unwrap().push(receiver);
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteInventoryService for ScriptedService {
    async fn push_debug_hooks(&self, source: &Path) -> Result<(), ServiceError> {
        self.debug_pushes.lock().unwrap().push(source.to_path_buf());
        Ok(())
    }

    async fn stream_hooks(&self, receiver: HookReceiver) -> Result<(), ServiceError> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.hook_scripts.lock().unwrap().pop_front();
        play(script, receiver, &self.held_hooks)
    }

    async fn stream_apps(&self, receiver: AppReceiver) -> Result<(), ServiceError> {
        self.app_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.app_scripts.lock().unwrap().pop_front();
        play(script, receiver, &self.held_apps)
    }

    async fn register_change_listener(
        &self,
        listener: Arc<dyn ChangeListener>,
    ) -> Result<(), ServiceError> {
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(ServiceError::transport("service not bound"));
        }

        self.listeners.lock().unwrap().insert(listener.id(), listener);
        Ok(())
    }

    async fn unregister_change_listener(&self, listener: Uuid) -> Result<(), ServiceError> {
        if self.fail_unregistration.load(Ordering::SeqCst) {
            return Err(ServiceError::transport("service not bound"));
        }

        self.listeners.lock().unwrap().remove(&listener);
        self.unregistered.lock().unwrap().push(listener);
        Ok(())
    }
}

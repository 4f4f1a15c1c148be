pub mod restart;

use uuid::Uuid;

/// Notifications the remote service sends when inputs to the hook or
/// application inventory change. Called from the transport's context.
pub trait ChangeListener: Send + Sync {
    fn id(&self) -> Uuid;
    fn on_data_changed(&self);
    fn on_package_changed(&self);
}

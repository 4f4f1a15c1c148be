pub mod scenario;
pub mod services;

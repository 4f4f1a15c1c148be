pub mod frames;
pub mod ws_config;
pub mod ws_service;

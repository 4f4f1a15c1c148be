pub mod sync_session;

pub mod event_bus;
pub mod manager;
pub mod ports;
pub mod recorder;
pub mod repository;
pub mod session_store;
pub mod timeline;

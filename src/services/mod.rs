pub mod classifier;
pub mod disk_store;
pub mod file_service;
pub mod format;
pub mod metadata;
pub mod notify;

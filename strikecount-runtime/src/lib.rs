pub mod classifier;
pub mod coach;
pub mod config_store;
pub mod defaults;
pub mod frames;
pub mod fs;
pub mod history;
pub mod ipc;
pub mod kv_store;
pub mod runtime_engine;
pub mod secrets;

mod config;
mod file_manager;
mod positioned;

pub use config::{FileManagerConfig, DEFAULT_BLOCK_SIZE};
pub use file_manager::FileManager;

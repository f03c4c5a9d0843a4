pub mod storage;

pub use storage::{
    BlockId, CloseFailure, FileManager, FileManagerConfig, Page, StorageError, StorageResult,
    DEFAULT_BLOCK_SIZE,
};

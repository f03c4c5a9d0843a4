//! Storage layer implementation for blockfile.
//!
//! This module is the bottom of a disk-based engine: it maps logical block
//! addresses onto byte ranges of files in one data directory. Key components:
//!
//! - **Page**: Fixed-size in-memory buffer holding exactly one block
//! - **BlockId**: Address of a block as (file name, block number)
//! - **FileManager**: Opens and caches file handles, performs durable
//!   block reads and writes under a single lock
//!
//! Block `b` of a file occupies bytes `[b * block_size, (b + 1) * block_size)`.
//! Files carry no header, so the block size must be known out of band.

pub mod block;
pub mod disk;
pub mod error;
pub mod page;

pub use block::BlockId;
pub use disk::{FileManager, FileManagerConfig, DEFAULT_BLOCK_SIZE};
pub use error::{CloseFailure, StorageError, StorageResult};
pub use page::Page;

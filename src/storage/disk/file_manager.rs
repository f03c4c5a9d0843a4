use crate::storage::block::BlockId;
use crate::storage::disk::config::FileManagerConfig;
use crate::storage::disk::positioned;
use crate::storage::error::{CloseFailure, StorageError, StorageResult};
use crate::storage::page::Page;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Block-granular, durable I/O against named files in one data directory.
///
/// Handles are opened on first use and kept until [`FileManager::close`].
/// One lock covers the whole manager and is held for the full duration of
/// every call, so I/O against unrelated files is serialized too.
pub struct FileManager {
    data_dir: PathBuf,
    block_size: usize,
    is_new: bool,
    files: Mutex<FileTable>,
}

struct FileTable {
    handles: HashMap<String, File>,
    closed: bool,
}

impl FileTable {
    /// Cached handle for `filename`, opened (and created) on first use.
    ///
    /// Opened without `O_SYNC`; every write is made durable by the
    /// `sync_all` in `FileManager::write_locked`.
    fn handle(&mut self, data_dir: &Path, filename: &str) -> StorageResult<&File> {
        if self.closed {
            return Err(StorageError::Closed);
        }

        let file = match self.handles.entry(filename.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = data_dir.join(filename);
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(&path)
                    .map_err(|e| StorageError::io(format!("failed to open file {:?}", path), e))?;
                debug!("Opened {:?}", path);
                entry.insert(file)
            }
        };
        Ok(&*file)
    }
}

impl FileManager {
    /// Create a manager over `data_dir`, creating the directory if absent.
    pub fn new(data_dir: impl AsRef<Path>, block_size: usize) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        if block_size == 0 {
            return Err(StorageError::Configuration(
                "block size must be positive".to_string(),
            ));
        }

        let is_new = !data_dir.exists();
        if is_new {
            fs::create_dir_all(&data_dir).map_err(|e| {
                StorageError::Configuration(format!(
                    "failed to create data directory {:?}: {}",
                    data_dir, e
                ))
            })?;
        }

        let metadata = fs::metadata(&data_dir).map_err(|e| {
            StorageError::Configuration(format!(
                "failed to inspect data directory {:?}: {}",
                data_dir, e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::Configuration(format!(
                "{:?} is not a directory",
                data_dir
            )));
        }
        if metadata.permissions().readonly() {
            return Err(StorageError::Configuration(format!(
                "data directory {:?} is read-only",
                data_dir
            )));
        }

        info!(
            "File manager ready at {:?} (block size {}, new: {})",
            data_dir, block_size, is_new
        );

        Ok(Self {
            data_dir,
            block_size,
            is_new,
            files: Mutex::new(FileTable {
                handles: HashMap::new(),
                closed: false,
            }),
        })
    }

    pub fn from_config(config: &FileManagerConfig) -> StorageResult<Self> {
        Self::new(&config.data_dir, config.block_size)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Whether the data directory was created by this manager.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_closed(&self) -> bool {
        self.files.lock().closed
    }

    pub fn open_file_count(&self) -> usize {
        self.files.lock().handles.len()
    }

    /// Read `block` into `page`.
    ///
    /// Returns the number of bytes that came from storage. A block lying
    /// past the end of the file is not an error: the bytes that do not
    /// exist on disk are left as they were in `page`, so a fresh page
    /// reads an unwritten block as zeros.
    pub fn read(&self, block: &BlockId, page: &mut Page) -> StorageResult<usize> {
        let mut files = self.files.lock();
        self.check_page(page)?;
        let offset = self.block_offset(block)?;

        let file = files.handle(&self.data_dir, block.filename())?;
        let n = positioned::read_full_at(file, page.raw_buffer_mut(), offset)
            .map_err(|e| StorageError::io(format!("failed to read block {}", block), e))?;

        trace!("Read block {} ({} of {} bytes)", block, n, self.block_size);
        Ok(n)
    }

    /// Write `page` to `block` and flush it to stable storage before
    /// returning. Writing past the end of the file grows it.
    pub fn write(&self, block: &BlockId, page: &Page) -> StorageResult<usize> {
        let mut files = self.files.lock();
        self.check_page(page)?;
        self.write_locked(&mut files, block, page.as_bytes())
    }

    /// Number of blocks the file occupies, counting a trailing partial
    /// block as a whole one.
    pub fn file_size(&self, filename: &str) -> StorageResult<u64> {
        let mut files = self.files.lock();
        self.block_count(&mut files, filename)
    }

    /// Extend `filename` by one zero-filled block and return its address.
    pub fn append(&self, filename: &str) -> StorageResult<BlockId> {
        let mut files = self.files.lock();
        let block = BlockId::new(filename, self.block_count(&mut files, filename)?);
        let zeros = vec![0u8; self.block_size];
        self.write_locked(&mut files, &block, &zeros)?;
        debug!("Appended block {}", block);
        Ok(block)
    }

    /// Release every open handle.
    ///
    /// Each handle is synced and dropped even if others fail; failures are
    /// collected into a single `StorageError::Close`. Closing twice is a
    /// no-op, and every other operation fails with `Closed` afterwards.
    pub fn close(&self) -> StorageResult<()> {
        let mut files = self.files.lock();
        if files.closed {
            return Ok(());
        }
        files.closed = true;

        let count = files.handles.len();
        let mut failures = Vec::new();
        for (filename, file) in files.handles.drain() {
            if let Err(source) = file.sync_all() {
                warn!("Failed to close {}: {}", filename, source);
                failures.push(CloseFailure { filename, source });
            }
        }

        info!(
            "File manager at {:?} closed {} file(s)",
            self.data_dir, count
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Close(failures))
        }
    }

    fn write_locked(
        &self,
        files: &mut FileTable,
        block: &BlockId,
        data: &[u8],
    ) -> StorageResult<usize> {
        let offset = self.block_offset(block)?;
        let file = files.handle(&self.data_dir, block.filename())?;

        positioned::write_all_at(file, data, offset)
            .map_err(|e| StorageError::io(format!("failed to write block {}", block), e))?;
        file.sync_all()
            .map_err(|e| StorageError::io(format!("failed to sync block {}", block), e))?;

        trace!("Wrote block {}", block);
        Ok(data.len())
    }

    fn block_count(&self, files: &mut FileTable, filename: &str) -> StorageResult<u64> {
        let file = files.handle(&self.data_dir, filename)?;
        let len = file
            .metadata()
            .map_err(|e| StorageError::io(format!("failed to stat file {}", filename), e))?
            .len();
        Ok(len.div_ceil(self.block_size as u64))
    }

    fn check_page(&self, page: &Page) -> StorageResult<()> {
        if page.size() != self.block_size {
            return Err(StorageError::SizeMismatch {
                expected: self.block_size,
                actual: page.size(),
            });
        }
        Ok(())
    }

    fn block_offset(&self, block: &BlockId) -> StorageResult<u64> {
        block.number().checked_mul(self.block_size as u64).ok_or_else(|| {
            StorageError::io(
                format!("block {} is out of range", block),
                io::Error::new(io::ErrorKind::InvalidInput, "offset overflows u64"),
            )
        })
    }
}

impl Drop for FileManager {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing file manager at {:?}: {}", self.data_dir, e);
        }
    }
}

impl std::fmt::Debug for FileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileManager")
            .field("data_dir", &self.data_dir)
            .field("block_size", &self.block_size)
            .finish()
    }
}

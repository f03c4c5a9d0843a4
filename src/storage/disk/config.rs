use std::path::PathBuf;

/// Default block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// File manager configuration.
#[derive(Debug, Clone)]
pub struct FileManagerConfig {
    /// Directory that holds every managed file.
    pub data_dir: PathBuf,
    /// Size of one block in bytes; fixed for the manager's lifetime.
    pub block_size: usize,
}

impl FileManagerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

impl Default for FileManagerConfig {
    fn default() -> Self {
        FileManagerConfig {
            data_dir: PathBuf::from("data"),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileManagerConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_builder() {
        let config = FileManagerConfig::new("/var/lib/db").with_block_size(400);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/db"));
        assert_eq!(config.block_size, 400);
    }
}

use blockfile::{FileManager, Page};
use std::path::Path;

pub const BLOCK_SIZE: usize = 16;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn open_manager(dir: &Path) -> FileManager {
    init_logging();
    FileManager::new(dir, BLOCK_SIZE).unwrap()
}

pub fn page_of(data: &[u8]) -> Page {
    let mut page = Page::new(BLOCK_SIZE);
    page.write(0, data).unwrap();
    page
}

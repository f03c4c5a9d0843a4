//! Fixed-size in-memory block buffers.

use crate::storage::error::{StorageError, StorageResult};
use std::io;

const LEN_PREFIX_SIZE: usize = 4;

/// An in-memory copy of exactly one block.
///
/// The length is fixed when the page is created. All public mutation goes
/// through bounds-checked methods; only the disk layer reaches the raw
/// buffer, to exchange a whole block with storage.
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Create a zero-filled page of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Wrap existing bytes; the page size becomes `bytes.len()`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into_boxed_slice(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Read-only view of the whole page.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy `data` into the page at `offset`.
    ///
    /// Fails with `OutOfBounds` unless `offset + data.len() <= size`.
    /// Returns the number of bytes written.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<usize> {
        self.check_bounds(offset, data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// Copy bytes starting at `offset` into `dst`.
    ///
    /// Copies `min(dst.len(), size - offset)` bytes and returns the count.
    /// An offset at or past the end copies nothing.
    pub fn read(&self, offset: usize, dst: &mut [u8]) -> usize {
        if offset >= self.data.len() {
            return 0;
        }
        let n = dst.len().min(self.data.len() - offset);
        dst[..n].copy_from_slice(&self.data[offset..offset + n]);
        n
    }

    pub fn get_u32(&self, offset: usize) -> StorageResult<u32> {
        let mut bytes = [0u8; 4];
        self.read_exact(offset, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) -> StorageResult<usize> {
        self.write(offset, &value.to_le_bytes())
    }

    pub fn get_u64(&self, offset: usize) -> StorageResult<u64> {
        let mut bytes = [0u8; 8];
        self.read_exact(offset, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn set_u64(&mut self, offset: usize, value: u64) -> StorageResult<usize> {
        self.write(offset, &value.to_le_bytes())
    }

    /// Read a u32 length prefix followed by that many bytes.
    pub fn get_bytes(&self, offset: usize) -> StorageResult<Vec<u8>> {
        let len = self.get_u32(offset)? as usize;
        self.check_bounds(offset + LEN_PREFIX_SIZE, len)?;
        let mut bytes = vec![0u8; len];
        self.read_exact(offset + LEN_PREFIX_SIZE, &mut bytes)?;
        Ok(bytes)
    }

    /// Write `data` preceded by its u32 length. Nothing is written unless
    /// the whole encoding fits.
    pub fn set_bytes(&mut self, offset: usize, data: &[u8]) -> StorageResult<usize> {
        let encoded_len = Self::max_encoded_len(data.len());
        self.check_bounds(offset, encoded_len)?;
        let len = u32::try_from(data.len()).map_err(|_| StorageError::OutOfBounds {
            offset,
            len: encoded_len,
            size: self.size(),
        })?;
        self.set_u32(offset, len)?;
        self.write(offset + LEN_PREFIX_SIZE, data)?;
        Ok(encoded_len)
    }

    pub fn get_string(&self, offset: usize) -> StorageResult<String> {
        let bytes = self.get_bytes(offset)?;
        String::from_utf8(bytes).map_err(|e| {
            StorageError::io(
                format!("string at page offset {} is not valid UTF-8", offset),
                io::Error::new(io::ErrorKind::InvalidData, e),
            )
        })
    }

    pub fn set_string(&mut self, offset: usize, value: &str) -> StorageResult<usize> {
        self.set_bytes(offset, value.as_bytes())
    }

    /// Bytes needed to store an `n`-byte value with `set_bytes`.
    pub fn max_encoded_len(n: usize) -> usize {
        LEN_PREFIX_SIZE + n
    }

    /// Unchecked access for exchanging a whole block with storage.
    pub(crate) fn raw_buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn read_exact(&self, offset: usize, dst: &mut [u8]) -> StorageResult<()> {
        self.check_bounds(offset, dst.len())?;
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn check_bounds(&self, offset: usize, len: usize) -> StorageResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(StorageError::OutOfBounds {
                offset,
                len,
                size: self.data.len(),
            }),
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("size", &self.size()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_is_zeroed() {
        let page = Page::new(16);
        assert_eq!(page.size(), 16);
        assert!(page.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read() -> anyhow::Result<()> {
        let mut page = Page::new(16);

        let data = b"Hello, world";
        assert_eq!(page.write(0, data)?, data.len());

        let mut got = vec![0u8; data.len()];
        assert_eq!(page.read(0, &mut got), data.len());
        assert_eq!(&got, data);

        // Overlapping write at an offset
        let data = b"BlockDB!!";
        assert_eq!(page.write(7, data)?, data.len());
        assert_eq!(page.as_bytes(), b"Hello, BlockDB!!");

        let mut got = vec![0u8; data.len()];
        page.read(7, &mut got);
        assert_eq!(&got, data);

        Ok(())
    }

    #[test]
    fn test_write_exactly_to_end() -> anyhow::Result<()> {
        let mut page = Page::new(16);
        assert_eq!(page.write(10, b"abcdef")?, 6);
        assert_eq!(&page.as_bytes()[10..], b"abcdef");
        assert_eq!(page.write(16, b"")?, 0);
        Ok(())
    }

    #[test]
    fn test_write_past_end() {
        let mut page = Page::new(16);
        let result = page.write(10, b"longer data");
        assert!(matches!(
            result,
            Err(StorageError::OutOfBounds {
                offset: 10,
                len: 11,
                size: 16
            })
        ));
        // Failed write leaves the page untouched
        assert!(page.as_bytes().iter().all(|&b| b == 0));

        assert!(matches!(
            page.write(usize::MAX, b"x"),
            Err(StorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_read_is_truncated_at_end() {
        let page = Page::from_bytes(b"0123456789".to_vec());

        let mut dst = [0xffu8; 8];
        assert_eq!(page.read(6, &mut dst), 4);
        assert_eq!(&dst[..4], b"6789");
        assert_eq!(&dst[4..], &[0xff; 4]);
    }

    #[test]
    fn test_read_past_end_copies_nothing() {
        let page = Page::new(16);
        let mut dst = [7u8; 4];
        assert_eq!(page.read(16, &mut dst), 0);
        assert_eq!(page.read(100, &mut dst), 0);
        assert_eq!(dst, [7u8; 4]);
    }

    #[test]
    fn test_integers() -> anyhow::Result<()> {
        let mut page = Page::new(32);
        page.set_u32(0, 0xdead_beef)?;
        page.set_u64(4, u64::MAX - 1)?;
        page.set_u32(28, 9)?;

        assert_eq!(page.get_u32(0)?, 0xdead_beef);
        assert_eq!(page.get_u64(4)?, u64::MAX - 1);
        assert_eq!(page.get_u32(28)?, 9);
        assert_eq!(&page.as_bytes()[0..4], &[0xef, 0xbe, 0xad, 0xde]);

        assert!(matches!(
            page.get_u64(28),
            Err(StorageError::OutOfBounds { .. })
        ));
        assert!(matches!(
            page.set_u32(29, 1),
            Err(StorageError::OutOfBounds { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_bytes_and_strings() -> anyhow::Result<()> {
        let mut page = Page::new(64);

        let n = page.set_string(0, "student")?;
        assert_eq!(n, Page::max_encoded_len("student".len()));
        page.set_bytes(n, &[1, 2, 3])?;

        assert_eq!(page.get_string(0)?, "student");
        assert_eq!(page.get_bytes(n)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_set_bytes_that_do_not_fit() {
        let mut page = Page::new(8);
        // Prefix fits but the payload does not
        assert!(matches!(
            page.set_bytes(0, b"abcde"),
            Err(StorageError::OutOfBounds { .. })
        ));
        assert!(page.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_corrupt_length_prefix() {
        let mut page = Page::new(8);
        page.set_u32(0, 1000).unwrap();
        assert!(matches!(
            page.get_bytes(0),
            Err(StorageError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_huge_length_prefix_is_rejected() {
        let mut page = Page::new(8);
        page.set_u32(0, u32::MAX).unwrap();
        assert!(matches!(
            page.get_bytes(0),
            Err(StorageError::OutOfBounds {
                offset: 4,
                len,
                size: 8
            }) if len == u32::MAX as usize
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut page = Page::new(16);
        page.set_bytes(0, &[0xff, 0xfe]).unwrap();
        assert!(matches!(page.get_string(0), Err(StorageError::Io { .. })));
    }
}

use crate::common::constants::INVALID_PAGE_ID;
use crate::common::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};

/// Logical identifier for a page on disk. `-1` is reserved
/// ([`crate::common::constants::INVALID_PAGE_ID`]) and never allocated.
pub type PageId = i32;

/// The disk manager's contract, kept deliberately small: the buffer pool
/// never needs to know whether pages live in a file, a raw block device, or
/// in memory, only that these four operations exist.
pub trait DiskManager: Send + Sync {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()>;
    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()>;
    fn allocate_page(&self) -> Result<PageId>;
    /// Best-effort and idempotent: a second deallocation of the same id is a
    /// no-op, not an error.
    fn deallocate_page(&self, page_id: PageId) -> Result<()>;
    fn page_size(&self) -> usize;
}

/// A `DiskManager` backed by a single file, one fixed-size page per slot.
///
/// Deallocated pages are tracked in a free list and handed back out by
/// `allocate_page` before the file is grown, so ids are reused rather than
/// leaking disk space across delete/new_page churn.
pub struct FileDiskManager {
    file: RwLock<File>,
    page_size: usize,
    next_page_id: AtomicI32,
    free_list: RwLock<Vec<PageId>>,
}

impl FileDiskManager {
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let len = file.metadata()?.len();
        let next_page_id = (len / page_size as u64) as i32;

        Ok(Self {
            file: RwLock::new(file),
            page_size,
            next_page_id: AtomicI32::new(next_page_id),
            free_list: RwLock::new(Vec::new()),
        })
    }

    pub fn new_with_handle(path: impl AsRef<Path>, page_size: usize) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::open(path, page_size)?))
    }

    fn offset(&self, page_id: PageId) -> u64 {
        page_id as u64 * self.page_size as u64
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let mut file = self.file.write().unwrap();
        let offset = self.offset(page_id);
        if offset + self.page_size as u64 > file.metadata()?.len() {
            // A page that was allocated but never written reads as zeroes,
            // matching the in-memory "new page is zeroed" contract.
            buf.fill(0);
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        log::debug!("disk: read page {page_id}");
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        debug_assert_eq!(data.len(), self.page_size);
        let mut file = self.file.write().unwrap();
        file.seek(SeekFrom::Start(self.offset(page_id)))?;
        file.write_all(data)?;
        file.flush()?;
        log::debug!("disk: wrote page {page_id}");
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId> {
        if let Some(reused) = self.free_list.write().unwrap().pop() {
            log::debug!("disk: reused page id {reused} from free list");
            return Ok(reused);
        }
        let id = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        log::debug!("disk: allocated new page id {id}");
        Ok(id)
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        if page_id == INVALID_PAGE_ID {
            return Ok(());
        }
        let mut free_list = self.free_list.write().unwrap();
        if !free_list.contains(&page_id) {
            free_list.push(page_id);
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

/// An in-memory `DiskManager` for tests and the shell's `--ephemeral` mode,
/// where the cost of a real file is unnecessary.
pub struct MemoryDiskManager {
    pages: RwLock<Vec<Vec<u8>>>,
    page_size: usize,
    next_page_id: AtomicI32,
    free_list: RwLock<Vec<PageId>>,
}

impl MemoryDiskManager {
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: RwLock::new(Vec::new()),
            page_size,
            next_page_id: AtomicI32::new(0),
            free_list: RwLock::new(Vec::new()),
        }
    }

    pub fn new_with_handle(page_size: usize) -> Arc<Self> {
        Arc::new(Self::new(page_size))
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let pages = self.pages.read().unwrap();
        match pages.get(page_id as usize) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        let mut pages = self.pages.write().unwrap();
        if pages.len() <= page_id as usize {
            pages.resize_with(page_id as usize + 1, || vec![0u8; self.page_size]);
        }
        pages[page_id as usize].copy_from_slice(data);
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId> {
        if let Some(reused) = self.free_list.write().unwrap().pop() {
            return Ok(reused);
        }
        Ok(self.next_page_id.fetch_add(1, Ordering::SeqCst))
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        if page_id == INVALID_PAGE_ID {
            return Ok(());
        }
        let mut free_list = self.free_list.write().unwrap();
        if !free_list.contains(&page_id) {
            free_list.push(page_id);
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn allocate_and_read_write_round_trip() {
        let temp = NamedTempFile::new().unwrap();
        let dm = FileDiskManager::open(temp.path(), 64).unwrap();

        let pid = dm.allocate_page().unwrap();
        assert_eq!(pid, 0);

        let mut data = vec![0u8; 64];
        data[0] = 0xAB;
        data[63] = 0xCD;
        dm.write_page(pid, &data).unwrap();

        let mut buf = vec![0u8; 64];
        dm.read_page(pid, &mut buf).unwrap();
        assert_eq!(buf[0], 0xAB);
        assert_eq!(buf[63], 0xCD);
    }

    #[test]
    fn deallocate_then_allocate_reuses_id() {
        let temp = NamedTempFile::new().unwrap();
        let dm = FileDiskManager::open(temp.path(), 64).unwrap();

        let p0 = dm.allocate_page().unwrap();
        let _p1 = dm.allocate_page().unwrap();
        dm.deallocate_page(p0).unwrap();

        let p2 = dm.allocate_page().unwrap();
        assert_eq!(p2, p0);
    }

    #[test]
    fn unwritten_page_reads_as_zero() {
        let temp = NamedTempFile::new().unwrap();
        let dm = FileDiskManager::open(temp.path(), 16).unwrap();
        let pid = dm.allocate_page().unwrap();

        let mut buf = vec![0xFFu8; 16];
        dm.read_page(pid, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn reopening_file_resumes_next_page_id() {
        let temp = NamedTempFile::new().unwrap();
        {
            let dm = FileDiskManager::open(temp.path(), 32).unwrap();
            dm.allocate_page().unwrap();
            dm.allocate_page().unwrap();
            let data = vec![7u8; 32];
            dm.write_page(1, &data).unwrap();
        }
        let dm = FileDiskManager::open(temp.path(), 32).unwrap();
        assert_eq!(dm.allocate_page().unwrap(), 2);
    }

    #[test]
    fn memory_disk_manager_round_trip() {
        let dm = MemoryDiskManager::new(32);
        let pid = dm.allocate_page().unwrap();
        let data = vec![9u8; 32];
        dm.write_page(pid, &data).unwrap();

        let mut buf = vec![0u8; 32];
        dm.read_page(pid, &mut buf).unwrap();
        assert_eq!(buf, data);
    }
}

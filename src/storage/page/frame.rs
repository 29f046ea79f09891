use crate::common::constants::INVALID_PAGE_ID;
use crate::recovery::log_manager::Lsn;
use crate::storage::disk::disk_manager::PageId;
use std::sync::{Arc, RwLock};

/// An in-memory slot that may hold one page's worth of bytes.
///
/// A `Frame` never changes address or capacity after construction: the pool
/// allocates `pool_size` of them up front and rebinds their `page_id` and
/// contents as pages are evicted and replaced. Pin count is tracked
/// separately, in the pool's page table (see
/// [`crate::storage::buffer::buffer_pool_manager`]), so that it stays under
/// the same lock as the free list and replacer rather than this frame's own
/// lock, which is only held for the duration of a read or write of page
/// content.
#[derive(Debug)]
pub struct Frame {
    data: Vec<u8>,
    page_id: PageId,
    dirty: bool,
    /// LSN of the last WAL record covering a write to this page. Consulted
    /// by the buffer pool before evicting a dirty frame (see
    /// [`crate::recovery::log_manager::LogManager::ensure_persisted`]).
    page_lsn: Lsn,
}

impl Frame {
    pub fn new(page_size: usize) -> Self {
        Self {
            data: vec![0u8; page_size],
            page_id: INVALID_PAGE_ID,
            dirty: false,
            page_lsn: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn page_lsn(&self) -> Lsn {
        self.page_lsn
    }

    pub fn set_page_lsn(&mut self, lsn: Lsn) {
        self.page_lsn = lsn;
    }

    /// Zeroes the buffer. Called whenever a frame is rebound to a different
    /// page id, so a reader never observes stale bytes from the previous
    /// occupant before the real content is read in from disk.
    pub fn reset_memory(&mut self) {
        self.data.fill(0);
    }

    pub(crate) fn bind(&mut self, page_id: PageId) {
        self.page_id = page_id;
        self.dirty = false;
        self.page_lsn = 0;
        self.reset_memory();
    }

    pub(crate) fn unbind(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.dirty = false;
        self.page_lsn = 0;
        self.reset_memory();
    }
}

/// Handle returned to callers by `fetch_page`/`new_page`. Valid until the
/// caller calls `unpin_page` for the same page id; the caller must not
/// retain it past that call (see §5 Ownership in the design doc).
pub type FrameHandle = Arc<RwLock<Frame>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_unbound_and_zeroed() {
        let frame = Frame::new(16);
        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
        assert!(!frame.is_dirty());
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn bind_resets_state_and_zeroes_memory() {
        let mut frame = Frame::new(8);
        frame.data_mut()[0] = 42;
        frame.set_dirty(true);
        frame.set_page_lsn(7);

        frame.bind(3);
        assert_eq!(frame.page_id(), 3);
        assert!(!frame.is_dirty());
        assert_eq!(frame.page_lsn(), 0);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn unbind_returns_frame_to_invalid_state() {
        let mut frame = Frame::new(8);
        frame.bind(5);
        frame.data_mut()[0] = 1;
        frame.set_dirty(true);

        frame.unbind();
        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
        assert!(!frame.is_dirty());
        assert!(frame.data().iter().all(|&b| b == 0));
    }
}

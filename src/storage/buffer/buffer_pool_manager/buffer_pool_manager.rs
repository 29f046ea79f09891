use crate::common::constants::{INVALID_PAGE_ID, NO_CORRESPONDING_FRAME_ID_MSG};
use crate::common::error::Result;
use crate::config::{PoolConfig, ReplacerPolicy};
use crate::metrics::PoolMetrics;
use crate::recovery::log_manager::LogManager;
use crate::recovery::NoopLogManager;
use crate::storage::buffer::replacer::{self, Replacer};
use crate::storage::buffer::FrameId;
use crate::storage::disk::disk_manager::{DiskManager, PageId};
use crate::storage::page::{Frame, FrameHandle};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Instant;

/// Per-page bookkeeping kept in the page table, separate from the frame
/// itself: pin count lives under the pool's own lock (taken for the
/// duration of each buffer pool manager call), not the frame's lock (held
/// only while page content is read or written), per the design doc's
/// concurrency model.
#[derive(Copy, Clone, Debug)]
struct FrameMetadata {
    frame_id: FrameId,
    pin_count: usize,
}

impl FrameMetadata {
    fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            pin_count: 0,
        }
    }

    fn pin_count(&self) -> usize {
        self.pin_count
    }

    fn increment_pin_count(&mut self) {
        self.pin_count += 1;
    }

    fn decrement_pin_count(&mut self) {
        if self.pin_count == 0 {
            panic!("pin count already at zero, cannot decrement");
        }
        self.pin_count -= 1;
    }
}

/// Fixed-capacity page cache mediating between callers and a `DiskManager`.
///
/// Owns the frame slab, the page table, the free list, and a replacer; see
/// the design doc for the full set of invariants this type maintains across
/// `fetch_page`/`unpin_page`/`flush_page`/`new_page`/`delete_page`.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<FrameHandle>,
    page_table: HashMap<PageId, FrameMetadata>,
    free_list: VecDeque<FrameId>,
    disk_manager: Arc<dyn DiskManager>,
    replacer: Arc<RwLock<Box<dyn Replacer>>>,
    log_manager: Arc<dyn LogManager>,
    metrics: Arc<PoolMetrics>,
}

#[derive(Default)]
pub struct BufferPoolManagerBuilder {
    pool_size: Option<usize>,
    replacer_policy: Option<ReplacerPolicy>,
    disk_manager: Option<Arc<dyn DiskManager>>,
    log_manager: Option<Arc<dyn LogManager>>,
    metrics: Option<Arc<PoolMetrics>>,
}

impl BufferPoolManagerBuilder {
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn replacer_policy(mut self, policy: ReplacerPolicy) -> Self {
        self.replacer_policy = Some(policy);
        self
    }

    pub fn disk_manager(mut self, disk_manager: Arc<dyn DiskManager>) -> Self {
        self.disk_manager = Some(disk_manager);
        self
    }

    pub fn log_manager(mut self, log_manager: Arc<dyn LogManager>) -> Self {
        self.log_manager = Some(log_manager);
        self
    }

    pub fn metrics(mut self, metrics: Arc<PoolMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> BufferPoolManager {
        let pool_size = self
            .pool_size
            .expect("`pool_size` not initialized before build");
        let disk_manager = self
            .disk_manager
            .expect("`disk_manager` not initialized before build");
        let replacer_policy = self.replacer_policy.unwrap_or_default();
        let page_size = disk_manager.page_size();

        BufferPoolManager {
            pool_size,
            frames: (0..pool_size)
                .map(|_| Arc::new(RwLock::new(Frame::new(page_size))))
                .collect(),
            page_table: HashMap::new(),
            free_list: (0..pool_size).collect(),
            disk_manager,
            replacer: Arc::new(RwLock::new(replacer::build(replacer_policy, pool_size))),
            log_manager: self
                .log_manager
                .unwrap_or_else(|| Arc::new(NoopLogManager) as Arc<dyn LogManager>),
            metrics: self.metrics.unwrap_or_default(),
        }
    }
}

impl BufferPoolManager {
    pub fn new(config: &PoolConfig, disk_manager: Arc<dyn DiskManager>) -> Self {
        Self::builder()
            .pool_size(config.pool_size)
            .replacer_policy(config.replacer_policy)
            .disk_manager(disk_manager)
            .build()
    }

    pub fn new_with_handle(
        config: &PoolConfig,
        disk_manager: Arc<dyn DiskManager>,
    ) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new(config, disk_manager)))
    }

    pub fn builder() -> BufferPoolManagerBuilder {
        BufferPoolManagerBuilder::default()
    }

    /// Allocates a new page, pins its frame, and returns both the id and a
    /// handle to it. `None` if every frame is in use and pinned.
    pub fn new_page(&mut self) -> Result<Option<(PageId, FrameHandle)>> {
        let start = Instant::now();
        let Some(frame_id) = self.claim_victim_frame()? else {
            self.metrics.record_miss(start.elapsed());
            return Ok(None);
        };

        let page_id = self.disk_manager.allocate_page()?;
        if let Err(e) = self.rebind_frame(frame_id, page_id) {
            self.disk_manager.deallocate_page(page_id)?;
            return Err(e);
        }
        self.page_table.insert(page_id, FrameMetadata::new(frame_id));
        self.page_table.get_mut(&page_id).unwrap().increment_pin_count();

        self.metrics.record_miss(start.elapsed());
        log::debug!("buffer pool: allocated page {page_id} in frame {frame_id}");
        Ok(Some((page_id, self.frames[frame_id].clone())))
    }

    /// Fetches `page_id`, reading it from disk on a miss. `None` if the page
    /// is not resident and every frame is in use and pinned.
    pub fn fetch_page(&mut self, page_id: &PageId) -> Result<Option<FrameHandle>> {
        let start = Instant::now();

        if let Some(metadata) = self.page_table.get_mut(page_id) {
            let frame_id = metadata.frame_id;
            metadata.increment_pin_count();
            self.replacer.write().unwrap().pin(frame_id);
            self.metrics.record_hit(start.elapsed());
            log::trace!("buffer pool: fetch hit for page {page_id}");
            return Ok(Some(self.frames[frame_id].clone()));
        }

        let Some(frame_id) = self.claim_victim_frame()? else {
            self.metrics.record_miss(start.elapsed());
            return Ok(None);
        };

        self.rebind_frame(frame_id, *page_id)?;
        self.page_table.insert(*page_id, FrameMetadata::new(frame_id));
        self.page_table.get_mut(page_id).unwrap().increment_pin_count();

        self.metrics.record_miss(start.elapsed());
        log::debug!("buffer pool: fetch miss for page {page_id}, loaded into frame {frame_id}");
        Ok(Some(self.frames[frame_id].clone()))
    }

    /// Decrements the pin count for `page_id`. Returns `false` if the page is
    /// resident but already fully unpinned; `true` if the page is not
    /// resident at all (nothing to do) or the decrement succeeded. Registers
    /// the frame with the replacer only on the transition to a pin count of
    /// zero.
    pub fn unpin_page(&mut self, page_id: &PageId, dirty_hint: bool) -> bool {
        let frame_id = match self.page_table.get_mut(page_id) {
            Some(metadata) if metadata.pin_count() == 0 => return false,
            Some(metadata) => {
                metadata.decrement_pin_count();
                metadata.frame_id
            }
            None => return true,
        };

        if dirty_hint {
            self.frames[frame_id].write().unwrap().set_dirty(true);
        }

        if self.page_table[page_id].pin_count() == 0 {
            self.replacer.write().unwrap().unpin(frame_id);
        }
        true
    }

    /// Writes `page_id`'s frame back to disk regardless of its dirty flag,
    /// then clears it. `false` if the page is not resident. Pin count is
    /// never touched.
    pub fn flush_page(&mut self, page_id: &PageId) -> Result<bool> {
        let Some(metadata) = self.page_table.get(page_id) else {
            return Ok(false);
        };
        let frame_id = metadata.frame_id;
        self.flush_frame(frame_id, *page_id)?;
        Ok(true)
    }

    pub fn flush_all_pages(&mut self) -> Result<()> {
        let page_ids: Vec<PageId> = self.page_table.keys().copied().collect();
        for page_id in page_ids {
            self.flush_page(&page_id)?;
        }
        Ok(())
    }

    /// Deletes `page_id` if it is not pinned, returning its frame to the
    /// free list. Deleting an id that is not resident is a no-op success.
    pub fn delete_page(&mut self, page_id: PageId) -> Result<bool> {
        let Some(metadata) = self.page_table.get(&page_id) else {
            return Ok(true);
        };
        if metadata.pin_count() > 0 {
            return Ok(false);
        }
        let frame_id = metadata.frame_id;

        self.page_table.remove(&page_id);
        self.replacer.write().unwrap().pin(frame_id); // drop from eviction candidates
        self.frames[frame_id].write().unwrap().unbind();
        self.free_list.push_back(frame_id);
        self.disk_manager.deallocate_page(page_id)?;

        log::debug!("buffer pool: deleted page {page_id}, frame {frame_id} returned to free list");
        Ok(true)
    }

    pub fn size(&self) -> usize {
        self.pool_size
    }

    pub fn metrics(&self) -> &Arc<PoolMetrics> {
        &self.metrics
    }

    pub fn get_is_dirty(&self, page_id: &PageId) -> bool {
        let frame_id = self
            .page_table
            .get(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .frame_id;
        self.frames[frame_id].read().unwrap().is_dirty()
    }

    pub fn get_pin_count(&self, page_id: &PageId) -> Option<usize> {
        Some(self.page_table.get(page_id)?.pin_count)
    }

    #[cfg(test)]
    pub(crate) fn set_is_dirty(&mut self, page_id: &PageId, dirty: bool) {
        let frame_id = self
            .page_table
            .get(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .frame_id;
        self.frames[frame_id].write().unwrap().set_dirty(dirty);
    }

    #[cfg(test)]
    pub(crate) fn set_evictable(
        &mut self,
        page_id: &PageId,
        evictable: bool,
        replacer: &mut RwLockWriteGuard<Box<dyn Replacer>>,
    ) {
        let frame_id = self
            .page_table
            .get(page_id)
            .expect(NO_CORRESPONDING_FRAME_ID_MSG)
            .frame_id;
        if evictable {
            replacer.unpin(frame_id);
        } else {
            replacer.pin(frame_id);
        }
    }

    #[cfg(test)]
    pub(crate) fn free_list_len(&self) -> usize {
        self.free_list.len()
    }

    #[cfg(test)]
    pub(crate) fn contains_page(&self, page_id: &PageId) -> bool {
        self.page_table.contains_key(page_id)
    }

    #[cfg(test)]
    pub(crate) fn replacer_handle(&self) -> Arc<RwLock<Box<dyn Replacer>>> {
        self.replacer.clone()
    }

    /// Obtains an unbound frame id: the free list first, then the replacer.
    /// If the victim frame was bound and dirty, it is flushed before its
    /// binding is dropped.
    fn claim_victim_frame(&mut self) -> Result<Option<FrameId>> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(Some(frame_id));
        }

        let Some(frame_id) = self.replacer.write().unwrap().victim() else {
            log::debug!("buffer pool: exhausted, no evictable frame available");
            return Ok(None);
        };

        let old_page_id = self.frames[frame_id].read().unwrap().page_id();
        if old_page_id != INVALID_PAGE_ID {
            self.flush_frame(frame_id, old_page_id)?;
            self.page_table.remove(&old_page_id);
            self.metrics.record_eviction();
        }
        Ok(Some(frame_id))
    }

    /// Writes a frame back to disk (via the WAL durability gate) if dirty,
    /// then clears its dirty flag. Does not touch the page table or pin
    /// count; callers decide what that means for their operation.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let mut frame = self.frames[frame_id].write().unwrap();
        if !frame.is_dirty() {
            return Ok(());
        }
        self.log_manager.ensure_persisted(frame.page_lsn());
        self.disk_manager.write_page(page_id, frame.data())?;
        frame.set_dirty(false);
        Ok(())
    }

    /// Binds `frame_id` to `page_id`: zeroes its memory, clears dirty/LSN,
    /// and reads the page's content from disk. On a read failure the frame
    /// is unbound again and handed back to the free list rather than left
    /// half-bound.
    fn rebind_frame(&mut self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let mut frame = self.frames[frame_id].write().unwrap();
        frame.bind(page_id);
        if let Err(e) = self.disk_manager.read_page(page_id, frame.data_mut()) {
            frame.unbind();
            drop(frame);
            self.free_list.push_back(frame_id);
            return Err(e);
        }
        Ok(())
    }
}

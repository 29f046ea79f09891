//! Shared constants and panic/expect messages, kept in one place so call
//! sites read as assertions on an invariant rather than ad hoc strings.

use crate::storage::disk::disk_manager::PageId;

/// Sentinel reserved for "no page bound to this frame".
pub const INVALID_PAGE_ID: PageId = -1;

/// Default page size in bytes. 4 KiB matches a common OS page and disk
/// sector size, so a page never spans a partial sector.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default pool capacity used when no configuration overrides it.
pub const DEFAULT_POOL_SIZE: usize = 64;

pub const NO_CORRESPONDING_FRAME_ID_MSG: &str =
    "page_id has no corresponding frame_id in the page table";
pub const NEW_PAGE_ERR_MSG: &str = "expected new_page to succeed: pool unexpectedly exhausted";
pub const NO_CORRESPONDING_PAGE_MSG: &str = "page_id is not resident in the buffer pool";

pub mod buffer_pool_manager;
pub mod replacer;

/// Dense index of a frame slot in `[0, pool_size)`. Never leaves the pool.
pub type FrameId = usize;

pub use buffer_pool_manager::BufferPoolManager;
pub use replacer::Replacer;

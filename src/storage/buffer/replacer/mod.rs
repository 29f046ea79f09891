pub mod clock_replacer;
pub mod lru_replacer;

pub use clock_replacer::ClockReplacer;
pub use lru_replacer::LruReplacer;

use crate::storage::buffer::FrameId;

/// Victim-selection oracle invoked by the buffer pool manager whenever it
/// needs to evict a frame. Always called from within the pool's own
/// critical section, so a single call never races another on the same
/// replacer — implementations need not be internally lock-free, only
/// `Send + Sync` so they can sit behind a shared handle.
pub trait Replacer: Send + Sync {
    /// Selects and removes an eligible frame, returning its id. `None` if no
    /// frame is currently eligible.
    fn victim(&mut self) -> Option<FrameId>;

    /// Marks `frame_id` ineligible for eviction. Idempotent if the frame is
    /// not currently tracked.
    fn pin(&mut self, frame_id: FrameId);

    /// Marks `frame_id` eligible for eviction. Idempotent if already
    /// tracked.
    fn unpin(&mut self, frame_id: FrameId);

    /// Count of frames currently eligible for eviction.
    fn size(&self) -> usize;
}

/// Constructs the replacer named by [`crate::config::ReplacerPolicy`].
pub fn build(policy: crate::config::ReplacerPolicy, capacity: usize) -> Box<dyn Replacer> {
    match policy {
        crate::config::ReplacerPolicy::Lru => Box::new(LruReplacer::new(capacity)),
        crate::config::ReplacerPolicy::Clock => Box::new(ClockReplacer::new(capacity)),
    }
}

use std::{num::NonZeroUsize, sync::Mutex};

use log::debug;
use lru::LruCache;

use crate::types::FrameId;

/// Tracks evictable frames and hands out victims, least recently
/// *became evictable* first.
///
/// A frame enters the replacer when its pin count drops to zero and leaves
/// when it is pinned again or chosen as a victim. `unpin` of a frame that is
/// already tracked is a no-op and does not refresh its position; the policy
/// therefore orders frames by the moment they became evictable, not by the
/// last time they were touched.
pub struct LruReplacer {
    inner: Mutex<LruCache<FrameId, ()>>,
}

impl LruReplacer {
    pub fn new(num_frames: usize) -> Self {
        let cap = NonZeroUsize::new(num_frames.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Remove and return the frame that has been evictable the longest.
    pub fn victim(&self) -> Option<FrameId> {
        self.inner.lock().unwrap().pop_lru().map(|(frame_id, _)| frame_id)
    }

    /// Drop a frame from tracking because it is pinned again.
    pub fn pin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.pop(&frame_id).is_none() {
            debug!("pin of frame {} that is not in the replacer", frame_id);
        }
    }

    /// Start tracking a frame whose pin count reached zero. Tracked frames
    /// keep their position.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.contains(&frame_id) {
            inner.put(frame_id, ());
        }
    }

    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use log::{debug, error, warn};

use super::lru_replacer::LruReplacer;
use crate::{
    disk::DiskManager,
    storage::page::Page,
    types::{FrameId, PageId, Pod, INVALID_PAGE_ID},
    utils::HandyRwLock,
};

/// The caching contract every page consumer programs against. Implemented
/// by a single instance and by the sharded parallel pool.
///
/// Every successful `fetch_page`/`new_page` pins the frame and must be
/// balanced by exactly one `unpin_page` on every control-flow exit. Callers
/// must release any page latch they hold before calling back into the pool.
pub trait BufferPool: Send + Sync {
    fn fetch_page(&self, page_id: PageId) -> Option<Pod<Page>>;

    fn new_page(&self) -> Option<(PageId, Pod<Page>)>;

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool;

    /// Write a resident page back to disk regardless of its dirty flag.
    fn flush_page(&self, page_id: PageId) -> bool;

    fn flush_all(&self);

    fn delete_page(&self, page_id: PageId) -> bool;

    fn pool_size(&self) -> usize;
}

struct PoolState {
    /// page id -> frame index, for resident pages only
    page_table: HashMap<PageId, FrameId>,
    /// never-used and deleted frames, drawn from the head
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
}

/// A fixed-size cache of pages with an LRU victim policy.
///
/// The pool mutex serializes the page table, the free list and pin-count
/// transitions; the per-frame `RwLock` latches page contents. Lock order is
/// pool -> replacer -> frame latch, never the reverse.
pub struct BufferPoolInstance {
    pool_size: usize,
    num_instances: usize,
    instance_index: usize,
    disk_manager: Arc<DiskManager>,
    frames: Vec<Pod<Page>>,
    replacer: LruReplacer,
    state: Mutex<PoolState>,
}

impl BufferPoolInstance {
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        Self::new_sharded(pool_size, 1, 0, disk_manager)
    }

    /// Instance `instance_index` of `num_instances`, owning the page ids
    /// congruent to its index modulo the instance count.
    pub fn new_sharded(
        pool_size: usize,
        num_instances: usize,
        instance_index: usize,
        disk_manager: Arc<DiskManager>,
    ) -> Self {
        assert!(pool_size > 0, "pool must hold at least one frame");
        assert!(num_instances > 0, "a standalone pool has instance count 1");
        assert!(
            instance_index < num_instances,
            "instance index must fall inside the instance count"
        );

        let frames = (0..pool_size)
            .map(|_| Arc::new(std::sync::RwLock::new(Page::new())))
            .collect();

        Self {
            pool_size,
            num_instances,
            instance_index,
            disk_manager,
            frames,
            replacer: LruReplacer::new(pool_size),
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list: (0..pool_size).collect(),
                next_page_id: instance_index as PageId,
            }),
        }
    }

    pub fn instance_index(&self) -> usize {
        self.instance_index
    }

    /// Number of frames currently eligible for eviction.
    pub fn replacer_size(&self) -> usize {
        self.replacer.size()
    }

    /// Whether `page_id` is resident right now.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().unwrap().page_table.contains_key(&page_id)
    }

    /// Number of resident pages.
    pub fn resident_count(&self) -> usize {
        self.state.lock().unwrap().page_table.len()
    }

    fn allocate_page_id(&self, state: &mut PoolState) -> PageId {
        let page_id = state.next_page_id;
        state.next_page_id += self.num_instances as PageId;
        debug_assert_eq!(
            page_id as usize % self.num_instances,
            self.instance_index,
            "allocated page ids route back to this instance"
        );
        page_id
    }

    /// Obtain a frame for a new resident page: free list first, then the
    /// replacer. An evicted dirty page is written back and its page-table
    /// entry erased before the frame is handed out.
    fn acquire_frame(&self, state: &mut PoolState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.victim()?;
        {
            let page = self.frames[frame_id].rl();
            if page.page_id() != INVALID_PAGE_ID {
                if page.is_dirty() {
                    if let Err(e) = self.disk_manager.write_page(page.page_id(), &page.data) {
                        error!("write-back of victim page {} failed: {}", page.page_id(), e);
                        return None;
                    }
                    debug!("evicted dirty page {}, wrote back", page.page_id());
                }
                state.page_table.remove(&page.page_id());
            }
        }
        Some(frame_id)
    }
}

impl BufferPool for BufferPoolInstance {
    fn fetch_page(&self, page_id: PageId) -> Option<Pod<Page>> {
        if page_id == INVALID_PAGE_ID {
            warn!("fetch of invalid page id");
            return None;
        }

        let mut state = self.state.lock().unwrap();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id].wl().inc_pin();
            self.replacer.pin(frame_id);
            return Some(Arc::clone(&self.frames[frame_id]));
        }

        let frame_id = self.acquire_frame(&mut state)?;
        {
            let mut page = self.frames[frame_id].wl();
            page.set_page_id(page_id);
            if let Err(e) = self.disk_manager.read_page(page_id, &mut page.data) {
                error!("read of page {} failed: {}", page_id, e);
                page.set_page_id(INVALID_PAGE_ID);
                drop(page);
                state.free_list.push_back(frame_id);
                return None;
            }
            page.set_pin_count(1);
            page.set_dirty(false);
        }
        state.page_table.insert(page_id, frame_id);
        Some(Arc::clone(&self.frames[frame_id]))
    }

    fn new_page(&self) -> Option<(PageId, Pod<Page>)> {
        let mut state = self.state.lock().unwrap();

        // check for space before allocating, so the id counter does not
        // advance on failure
        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = self.allocate_page_id(&mut state);
        {
            let mut page = self.frames[frame_id].wl();
            page.reset(page_id);
            page.set_pin_count(1);
        }
        state.page_table.insert(page_id, frame_id);
        Some((page_id, Arc::clone(&self.frames[frame_id])))
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock().unwrap();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => {
                warn!("unpin of non-resident page {}", page_id);
                return false;
            }
        };

        let unpinned_to_zero;
        {
            let mut page = self.frames[frame_id].wl();
            if page.pin_count() == 0 {
                warn!("unpin of page {} whose pin count is already zero", page_id);
                return false;
            }
            if is_dirty {
                page.set_dirty(true);
            }
            page.dec_pin();
            unpinned_to_zero = page.pin_count() == 0;
        }
        if unpinned_to_zero {
            self.replacer.unpin(frame_id);
        }
        true
    }

    fn flush_page(&self, page_id: PageId) -> bool {
        let state = self.state.lock().unwrap();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return false,
        };

        let page = self.frames[frame_id].rl();
        if page.page_id() == INVALID_PAGE_ID {
            return false;
        }
        // written back whether dirty or not
        if let Err(e) = self.disk_manager.write_page(page.page_id(), &page.data) {
            error!("flush of page {} failed: {}", page_id, e);
            return false;
        }
        true
    }

    fn flush_all(&self) {
        let _state = self.state.lock().unwrap();

        for frame in &self.frames {
            let page = frame.rl();
            if page.page_id() != INVALID_PAGE_ID && page.is_dirty() {
                if let Err(e) = self.disk_manager.write_page(page.page_id(), &page.data) {
                    error!("flush of page {} failed: {}", page.page_id(), e);
                }
            }
        }
    }

    fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock().unwrap();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            // deleting an absent page succeeds
            None => return true,
        };

        {
            let mut page = self.frames[frame_id].wl();
            if page.pin_count() > 0 {
                warn!(
                    "delete of page {} rejected, pin count {}",
                    page_id,
                    page.pin_count()
                );
                return false;
            }
            page.reset(INVALID_PAGE_ID);
        }
        self.replacer.pin(frame_id);
        state.free_list.push_back(frame_id);
        state.page_table.remove(&page_id);
        self.disk_manager.deallocate_page(page_id);
        true
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}

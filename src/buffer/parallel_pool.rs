use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::buffer_pool::{BufferPool, BufferPoolInstance};
use crate::{
    disk::DiskManager,
    storage::page::Page,
    types::{PageId, Pod},
};

/// Shards the page id space over `N` independent pool instances.
///
/// Instance `k` owns every page id congruent to `k` modulo `N`, so routing
/// needs no shared lock. `new_page` rotates a starting instance for
/// fairness, probing each instance exactly once per call.
pub struct ParallelBufferPool {
    instances: Vec<Arc<BufferPoolInstance>>,
    start_index: AtomicUsize,
}

impl ParallelBufferPool {
    pub fn new(num_instances: usize, pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        assert!(num_instances > 0, "need at least one instance");

        let instances = (0..num_instances)
            .map(|i| {
                Arc::new(BufferPoolInstance::new_sharded(
                    pool_size,
                    num_instances,
                    i,
                    Arc::clone(&disk_manager),
                ))
            })
            .collect();

        Self {
            instances,
            start_index: AtomicUsize::new(0),
        }
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    fn instance_for(&self, page_id: PageId) -> Option<&Arc<BufferPoolInstance>> {
        if page_id < 0 {
            return None;
        }
        Some(&self.instances[page_id as usize % self.instances.len()])
    }
}

impl BufferPool for ParallelBufferPool {
    fn fetch_page(&self, page_id: PageId) -> Option<Pod<Page>> {
        self.instance_for(page_id)?.fetch_page(page_id)
    }

    fn new_page(&self) -> Option<(PageId, Pod<Page>)> {
        let n = self.instances.len();
        let start = self.start_index.fetch_add(1, Ordering::SeqCst) % n;
        for i in 0..n {
            if let Some(out) = self.instances[(start + i) % n].new_page() {
                return Some(out);
            }
        }
        None
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        match self.instance_for(page_id) {
            Some(instance) => instance.unpin_page(page_id, is_dirty),
            None => false,
        }
    }

    fn flush_page(&self, page_id: PageId) -> bool {
        match self.instance_for(page_id) {
            Some(instance) => instance.flush_page(page_id),
            None => false,
        }
    }

    fn flush_all(&self) {
        for instance in &self.instances {
            instance.flush_all();
        }
    }

    fn delete_page(&self, page_id: PageId) -> bool {
        match self.instance_for(page_id) {
            Some(instance) => instance.delete_page(page_id),
            None => false,
        }
    }

    fn pool_size(&self) -> usize {
        // total frames across all instances
        self.instances.len() * self.instances[0].pool_size()
    }
}

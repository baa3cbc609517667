use std::sync::Arc;

use crate::{
    buffer::{BufferPool, BufferPoolInstance, ParallelBufferPool},
    disk::DiskManager,
};

/// Knobs for wiring a storage engine together.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Frames per buffer pool instance.
    pub pool_size: usize,

    /// Number of buffer pool instances sharding the page id space.
    pub num_instances: usize,

    /// Maximum global/local depth of an extendible hash index.
    pub max_hash_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 64,
            num_instances: 1,
            max_hash_depth: crate::index::MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Build the configured pool: a single instance, or a parallel pool
    /// sharding over several.
    pub fn build_pool(&self, disk_manager: Arc<DiskManager>) -> Arc<dyn BufferPool> {
        if self.num_instances > 1 {
            Arc::new(ParallelBufferPool::new(
                self.num_instances,
                self.pool_size,
                disk_manager,
            ))
        } else {
            Arc::new(BufferPoolInstance::new(self.pool_size, disk_manager))
        }
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use minnow_db::{
    buffer::{BufferPool, BufferPoolInstance, ParallelBufferPool},
    catalog::Catalog,
    config::EngineConfig,
    disk::DiskManager,
    execution::ExecutorContext,
    transaction::Transaction,
    utils,
};

/// Set up log configuration. Safe to call from every test.
pub fn setup() {
    utils::init_log();
}

/// A single-instance buffer pool backed by a temp file. The temp dir is
/// returned so it outlives the pool.
pub fn new_buffer_pool(pool_size: usize) -> (TempDir, Arc<BufferPoolInstance>) {
    let dir = tempfile::tempdir().unwrap();
    let disk_manager = Arc::new(DiskManager::new(dir.path().join("pages.db")).unwrap());
    let pool = Arc::new(BufferPoolInstance::new(pool_size, disk_manager));
    (dir, pool)
}

pub fn new_parallel_pool(
    num_instances: usize,
    pool_size: usize,
) -> (TempDir, Arc<ParallelBufferPool>) {
    let dir = tempfile::tempdir().unwrap();
    let disk_manager = Arc::new(DiskManager::new(dir.path().join("pages.db")).unwrap());
    let pool = Arc::new(ParallelBufferPool::new(
        num_instances,
        pool_size,
        disk_manager,
    ));
    (dir, pool)
}

/// A catalog plus an executor context over a fresh pool, ready to run
/// query plans against.
pub fn new_engine(pool_size: usize) -> (TempDir, Arc<Catalog>, Arc<ExecutorContext>) {
    new_engine_with_config(EngineConfig {
        pool_size,
        ..EngineConfig::default()
    })
}

pub fn new_engine_with_config(
    config: EngineConfig,
) -> (TempDir, Arc<Catalog>, Arc<ExecutorContext>) {
    let dir = tempfile::tempdir().unwrap();
    let disk_manager = Arc::new(DiskManager::new(dir.path().join("pages.db")).unwrap());
    let bpm: Arc<dyn BufferPool> = config.build_pool(disk_manager);
    let catalog = Arc::new(Catalog::new(Arc::clone(&bpm)));
    let ctx = Arc::new(ExecutorContext::new(
        Arc::clone(&catalog),
        bpm,
        Transaction::new(),
    ));
    (dir, catalog, ctx)
}

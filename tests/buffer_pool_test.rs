mod test_utils;

use std::sync::Arc;

use rand::RngCore;

use minnow_db::{
    buffer::{BufferPool, BufferPoolInstance},
    disk::DiskManager,
    types::{PageId, PAGE_SIZE},
    utils::HandyRwLock,
};
use test_utils::{new_buffer_pool, new_parallel_pool, setup};

#[test]
fn test_binary_data() {
    setup();
    let buffer_pool_size = 10;
    let (_dir, bpm) = new_buffer_pool(buffer_pool_size);

    // Scenario: the buffer pool is empty; we should be able to create a new
    // page.
    let (page_id0, page0) = bpm.new_page().unwrap();
    assert_eq!(page_id0, 0);

    let mut random_binary_data = [0u8; PAGE_SIZE];
    rand::thread_rng().fill_bytes(&mut random_binary_data);

    // Scenario: once we have a page, we should be able to read and write
    // content.
    page0.wl().data.copy_from_slice(&random_binary_data);
    assert_eq!(page0.rl().data, random_binary_data);

    // Scenario: we should be able to create new pages until we fill up the
    // buffer pool.
    for _ in 1..buffer_pool_size {
        assert!(bpm.new_page().is_some());
    }

    // Scenario: once the buffer pool is full, we should not be able to
    // create any new pages.
    for _ in 0..buffer_pool_size {
        assert!(bpm.new_page().is_none());
    }

    // Scenario: after unpinning pages {0, 1, 2, 3, 4} we should be able to
    // create 5 new pages.
    for page_id in 0..5 {
        assert!(bpm.unpin_page(page_id, true));
        bpm.flush_page(page_id);
    }
    for _ in 0..5 {
        let (page_id, _page) = bpm.new_page().unwrap();
        bpm.unpin_page(page_id, false);
    }

    // Scenario: we should be able to fetch the data we wrote a while ago.
    let page0 = bpm.fetch_page(0).unwrap();
    assert_eq!(page0.rl().data, random_binary_data);
    assert!(bpm.unpin_page(0, true));
}

#[test]
fn test_fetch_evicts_least_recently_unpinned() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let disk_manager = Arc::new(DiskManager::new(dir.path().join("pages.db")).unwrap());

    // materialize page ids 0..6 on disk through a throwaway pool
    {
        let writer = BufferPoolInstance::new(3, Arc::clone(&disk_manager));
        for _ in 0..6 {
            let (page_id, _page) = writer.new_page().unwrap();
            assert!(writer.unpin_page(page_id, true));
        }
        writer.flush_all();
    }

    let bpm = BufferPoolInstance::new(3, disk_manager);

    // fetch pages 0..4 through a pool of 3 frames, unpinning immediately
    for page_id in 0..5 {
        assert!(bpm.fetch_page(page_id).is_some());
        assert!(bpm.unpin_page(page_id, false));
    }

    // the next fetch evicts the least recently unpinned page
    assert!(bpm.fetch_page(5).is_some());
    assert!(bpm.unpin_page(5, false));

    assert_eq!(bpm.resident_count(), 3);
    assert!(bpm.contains_page(5));
    assert!(bpm.contains_page(4));
    assert!(bpm.contains_page(3));
    assert!(!bpm.contains_page(2));
}

#[test]
fn test_unpin_accounting() {
    setup();
    let (_dir, bpm) = new_buffer_pool(4);

    let (page_id, _page) = bpm.new_page().unwrap();

    // double unpin is rejected
    assert!(bpm.unpin_page(page_id, false));
    assert!(!bpm.unpin_page(page_id, false));

    // unpin of a page that was never fetched is rejected
    assert!(!bpm.unpin_page(99, false));

    // after balanced pin/unpin every frame is evictable again
    for _ in 0..3 {
        let (page_id, _page) = bpm.new_page().unwrap();
        assert!(bpm.unpin_page(page_id, false));
    }
    assert_eq!(bpm.replacer_size(), 4);
}

#[test]
fn test_dirty_page_written_back_on_eviction() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let disk_manager = Arc::new(DiskManager::new(dir.path().join("pages.db")).unwrap());
    let bpm = BufferPoolInstance::new(2, Arc::clone(&disk_manager));

    let (page_id, page) = bpm.new_page().unwrap();
    page.wl().data[0] = 0x5A;
    assert!(bpm.unpin_page(page_id, true));

    // two more pages push the dirty page out of the pool
    for _ in 0..2 {
        let (new_id, _page) = bpm.new_page().unwrap();
        assert!(bpm.unpin_page(new_id, false));
    }
    assert!(!bpm.contains_page(page_id));

    let mut buf = [0u8; PAGE_SIZE];
    disk_manager.read_page(page_id, &mut buf).unwrap();
    assert_eq!(buf[0], 0x5A);
}

#[test]
fn test_flush_writes_back_even_when_clean() {
    setup();
    let dir = tempfile::tempdir().unwrap();
    let disk_manager = Arc::new(DiskManager::new(dir.path().join("pages.db")).unwrap());
    let bpm = BufferPoolInstance::new(2, Arc::clone(&disk_manager));

    let (page_id, page) = bpm.new_page().unwrap();
    page.wl().data[0] = 9;
    // the caller never admits to dirtying the page
    assert!(bpm.unpin_page(page_id, false));

    // flush is unconditional once the page is resident
    assert!(bpm.flush_page(page_id));
    let mut buf = [0u8; PAGE_SIZE];
    disk_manager.read_page(page_id, &mut buf).unwrap();
    assert_eq!(buf[0], 9);

    // flushing a page that is not resident fails
    assert!(!bpm.flush_page(77));
}

#[test]
fn test_delete_page() {
    setup();
    let (_dir, bpm) = new_buffer_pool(3);

    let (page_id, _page) = bpm.new_page().unwrap();

    // a pinned page cannot be deleted
    assert!(!bpm.delete_page(page_id));
    assert!(bpm.unpin_page(page_id, false));
    assert!(bpm.delete_page(page_id));
    assert!(!bpm.contains_page(page_id));

    // deleting an absent page succeeds
    assert!(bpm.delete_page(page_id));
}

#[test]
fn test_parallel_pool_sharding() {
    setup();
    let num_instances = 3;
    let (_dir, pool) = new_parallel_pool(num_instances, 4);

    // round-robin allocation hands out ids owned by rotating instances
    let mut page_ids: Vec<PageId> = Vec::new();
    for _ in 0..9 {
        let (page_id, page) = pool.new_page().unwrap();
        page.wl().data[..4].copy_from_slice(&page_id.to_le_bytes());
        page_ids.push(page_id);
        assert!(pool.unpin_page(page_id, true));
    }

    for chunk in page_ids.chunks(num_instances) {
        let mut shards: Vec<usize> = chunk
            .iter()
            .map(|id| *id as usize % num_instances)
            .collect();
        shards.sort_unstable();
        assert_eq!(shards, vec![0, 1, 2]);
    }

    // reads route back to the owning instance and see the written bytes
    for page_id in &page_ids {
        let page = pool.fetch_page(*page_id).unwrap();
        assert_eq!(
            PageId::from_le_bytes(page.rl().data[..4].try_into().unwrap()),
            *page_id
        );
        assert!(pool.unpin_page(*page_id, false));
    }
}

#[test]
fn test_concurrent_new_and_fetch() {
    setup();
    let (_dir, bpm) = new_buffer_pool(16);

    std::thread::scope(|s| {
        for _ in 0..4 {
            let bpm = Arc::clone(&bpm);
            s.spawn(move || {
                for _ in 0..50 {
                    let (page_id, page) = bpm.new_page().unwrap();
                    page.wl().data[0] = 1;
                    assert!(bpm.unpin_page(page_id, true));

                    if let Some(page) = bpm.fetch_page(page_id) {
                        assert_eq!(page.rl().data[0], 1);
                        assert!(bpm.unpin_page(page_id, false));
                    }
                }
            });
        }
    });

    // balanced pins leave every frame evictable
    assert_eq!(bpm.replacer_size(), 16);
}

use std::{marker::PhantomData, sync::Arc, sync::RwLock};

use log::{debug, error, warn};

use crate::{
    buffer::BufferPool,
    error::{MinnowError, MinnowResult},
    io::{Decodeable, Encodeable},
    transaction::Transaction,
    types::{PageId, INVALID_PAGE_ID},
    utils::HandyRwLock,
};

use super::{
    bucket_page::{bucket_array_size, BucketInsert, HashBucketPage},
    directory_page::HashDirectoryPage,
    key::{KeyComparator, KeyHasher},
    MAX_DEPTH,
};

/// A disk-backed extendible hash table over one key/value instantiation.
///
/// The directory and every bucket live in buffer-pool pages; the table keeps
/// no entry state in memory. A table-level reader/writer latch serializes
/// structural changes (split, merge, shrink, first-bucket creation) against
/// readers and single-bucket mutators; page latches serialize access to the
/// bytes of one page. Lock order is table latch, then pool, then page latch,
/// and no pool call is made while a page latch is held.
pub struct ExtendibleHashTable<K, V, C, H> {
    name: String,
    bpm: Arc<dyn BufferPool>,
    comparator: C,
    hasher: H,
    bucket_capacity: usize,
    max_depth: u32,
    directory_page_id: PageId,
    table_latch: RwLock<()>,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, C, H> ExtendibleHashTable<K, V, C, H>
where
    K: Encodeable + Decodeable + Copy,
    V: Encodeable + Decodeable + Copy + PartialEq,
    C: KeyComparator<K>,
    H: KeyHasher<K>,
{
    pub fn new(
        name: &str,
        bpm: Arc<dyn BufferPool>,
        comparator: C,
        hasher: H,
    ) -> Result<Self, MinnowError> {
        let capacity = bucket_array_size::<K, V>();
        Self::with_options(name, bpm, comparator, hasher, capacity, MAX_DEPTH)
    }

    /// Variant taking an explicit bucket capacity and depth cap. Tests use
    /// tiny buckets to exercise splits without thousands of inserts.
    pub fn with_options(
        name: &str,
        bpm: Arc<dyn BufferPool>,
        comparator: C,
        hasher: H,
        bucket_capacity: usize,
        max_depth: u32,
    ) -> Result<Self, MinnowError> {
        assert!(bucket_capacity > 0, "bucket must hold at least one entry");
        assert!(max_depth <= MAX_DEPTH, "directory page caps the depth");

        let (directory_page_id, dir_pod) = bpm.new_page().ok_or_else(|| {
            MinnowError::NullResult(format!("no frame for the directory of index {}", name))
        })?;
        {
            let mut guard = dir_pod.wl();
            let mut dir = HashDirectoryPage::new(&mut guard.data[..]);
            dir.init(directory_page_id);
        }
        bpm.unpin_page(directory_page_id, true);
        debug!(
            "created hash table {} with directory page {}",
            name, directory_page_id
        );

        Ok(Self {
            name: name.to_string(),
            bpm,
            comparator,
            hasher,
            bucket_capacity,
            max_depth,
            directory_page_id,
            table_latch: RwLock::new(()),
            _marker: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn hash(&self, key: &K) -> u32 {
        self.hasher.hash_key(key) as u32
    }

    fn fetch_directory(&self) -> Result<crate::types::Pod<crate::storage::page::Page>, MinnowError> {
        self.bpm.fetch_page(self.directory_page_id).ok_or_else(|| {
            MinnowError::NullResult(format!(
                "directory page {} of index {} not available",
                self.directory_page_id, self.name
            ))
        })
    }

    /// Collect every value stored under `key`.
    pub fn get_value(&self, _tx: &Transaction, key: &K) -> Result<Vec<V>, MinnowError> {
        let _table = self.table_latch.rl();

        let dir_pod = self.fetch_directory()?;
        let bucket_page_id = {
            let guard = dir_pod.rl();
            let dir = HashDirectoryPage::new(&guard.data[..]);
            dir.bucket_page_id(self.hash(key) & dir.global_depth_mask())
        };

        if bucket_page_id == INVALID_PAGE_ID {
            self.bpm.unpin_page(self.directory_page_id, false);
            return Ok(Vec::new());
        }

        let bucket_pod = match self.bpm.fetch_page(bucket_page_id) {
            Some(pod) => pod,
            None => {
                self.bpm.unpin_page(self.directory_page_id, false);
                return Err(MinnowError::NullResult(format!(
                    "bucket page {} not available",
                    bucket_page_id
                )));
            }
        };

        let result = {
            let guard = bucket_pod.rl();
            let bucket = HashBucketPage::<_, K, V>::new(&guard.data[..], self.bucket_capacity);
            bucket.get_value(key, &self.comparator)
        };

        self.bpm.unpin_page(bucket_page_id, false);
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(result)
    }

    /// Insert `(key, value)`. Returns `false` if the identical pair is
    /// already present. Splits as many times as needed; fails with
    /// `IndexFull` once the affected bucket reaches the maximum depth.
    pub fn insert(&self, _tx: &Transaction, key: &K, value: &V) -> Result<bool, MinnowError> {
        loop {
            match self.try_insert(key, value)? {
                BucketInsert::Inserted => return Ok(true),
                BucketInsert::Duplicate => return Ok(false),
                BucketInsert::Full => self.split_insert(key)?,
            }
        }
    }

    /// Single-bucket insert attempt under the table read latch.
    fn try_insert(&self, key: &K, value: &V) -> Result<BucketInsert, MinnowError> {
        let _table = self.table_latch.rl();

        let dir_pod = self.fetch_directory()?;
        let bucket_page_id = {
            let guard = dir_pod.rl();
            let dir = HashDirectoryPage::new(&guard.data[..]);
            dir.bucket_page_id(self.hash(key) & dir.global_depth_mask())
        };

        if bucket_page_id == INVALID_PAGE_ID {
            // never-populated slot; report Full so the caller re-enters
            // under the write latch and creates the bucket
            self.bpm.unpin_page(self.directory_page_id, false);
            return Ok(BucketInsert::Full);
        }

        let bucket_pod = match self.bpm.fetch_page(bucket_page_id) {
            Some(pod) => pod,
            None => {
                self.bpm.unpin_page(self.directory_page_id, false);
                return Err(MinnowError::NullResult(format!(
                    "bucket page {} not available",
                    bucket_page_id
                )));
            }
        };

        let outcome = {
            let mut guard = bucket_pod.wl();
            let mut bucket =
                HashBucketPage::<_, K, V>::new(&mut guard.data[..], self.bucket_capacity);
            bucket.insert(key, value, &self.comparator)
        };

        self.bpm
            .unpin_page(bucket_page_id, outcome == BucketInsert::Inserted);
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(outcome)
    }

    /// Make room for `key` under the table write latch: create the bucket on
    /// first touch, or split the full bucket, redistributing its live
    /// entries between it and a freshly allocated pair bucket.
    fn split_insert(&self, key: &K) -> MinnowResult {
        let _table = self.table_latch.wl();

        let dir_pod = self.fetch_directory()?;
        let (slot, bucket_page_id) = {
            let guard = dir_pod.rl();
            let dir = HashDirectoryPage::new(&guard.data[..]);
            let slot = self.hash(key) & dir.global_depth_mask();
            (slot, dir.bucket_page_id(slot))
        };

        if bucket_page_id == INVALID_PAGE_ID {
            let (new_page_id, _new_pod) = match self.bpm.new_page() {
                Some(out) => out,
                None => {
                    self.bpm.unpin_page(self.directory_page_id, false);
                    return Err(MinnowError::NullResult(
                        "no frame for the first bucket".to_string(),
                    ));
                }
            };
            {
                let mut guard = dir_pod.wl();
                let mut dir = HashDirectoryPage::new(&mut guard.data[..]);
                dir.set_bucket_page_id(slot, new_page_id);
            }
            self.bpm.unpin_page(new_page_id, true);
            self.bpm.unpin_page(self.directory_page_id, true);
            debug!("index {}: created first bucket page {}", self.name, new_page_id);
            return Ok(());
        }

        let bucket_pod = match self.bpm.fetch_page(bucket_page_id) {
            Some(pod) => pod,
            None => {
                self.bpm.unpin_page(self.directory_page_id, false);
                return Err(MinnowError::NullResult(format!(
                    "bucket page {} not available",
                    bucket_page_id
                )));
            }
        };

        let still_full = {
            let guard = bucket_pod.rl();
            let bucket = HashBucketPage::<_, K, V>::new(&guard.data[..], self.bucket_capacity);
            bucket.is_full()
        };
        if !still_full {
            // another thread split this bucket in the meantime; just retry
            self.bpm.unpin_page(bucket_page_id, false);
            self.bpm.unpin_page(self.directory_page_id, false);
            return Ok(());
        }

        let local_depth = {
            let guard = dir_pod.rl();
            HashDirectoryPage::new(&guard.data[..]).local_depth(slot)
        };
        if local_depth == self.max_depth {
            error!("index {}: bucket at slot {} reached max depth", self.name, slot);
            self.bpm.unpin_page(bucket_page_id, false);
            self.bpm.unpin_page(self.directory_page_id, false);
            return Err(MinnowError::IndexFull);
        }

        // raise depths: double the directory when the bucket already uses
        // every global bit, otherwise deepen the slots sharing its pattern
        {
            let mut guard = dir_pod.wl();
            let mut dir = HashDirectoryPage::new(&mut guard.data[..]);
            if local_depth == dir.global_depth() {
                dir.incr_global_depth();
                dir.incr_local_depth(slot);
                let size = dir.size();
                for i in 0..size / 2 {
                    let depth = dir.local_depth(i);
                    dir.set_local_depth(i + size / 2, depth);
                    let page_id = dir.bucket_page_id(i);
                    dir.set_bucket_page_id(i + size / 2, page_id);
                }
            } else {
                let pattern = dir.low_bits(slot);
                let step = 1u32 << local_depth;
                let mut i = pattern;
                while i < dir.size() {
                    dir.incr_local_depth(i);
                    i += step;
                }
            }
        }

        let new_local_depth = local_depth + 1;
        let new_local_mask = (1u32 << new_local_depth) - 1;
        // the pattern whose entries move to the new pair bucket
        let pair_pattern = (slot & new_local_mask) ^ (1 << (new_local_depth - 1));

        let (new_page_id, new_pod) = match self.bpm.new_page() {
            Some(out) => out,
            None => {
                self.bpm.unpin_page(bucket_page_id, false);
                self.bpm.unpin_page(self.directory_page_id, true);
                return Err(MinnowError::NullResult(
                    "no frame for the split bucket".to_string(),
                ));
            }
        };

        // rehash: live entries whose distinguishing bit selects the pair
        // pattern move to the new bucket
        {
            let mut old_guard = bucket_pod.wl();
            let mut new_guard = new_pod.wl();
            let mut old_bucket =
                HashBucketPage::<_, K, V>::new(&mut old_guard.data[..], self.bucket_capacity);
            let mut new_bucket =
                HashBucketPage::<_, K, V>::new(&mut new_guard.data[..], self.bucket_capacity);

            for i in 0..self.bucket_capacity {
                if !old_bucket.is_readable(i) {
                    continue;
                }
                let entry_key = old_bucket.key_at(i);
                if self.hash(&entry_key) & new_local_mask == pair_pattern {
                    let entry_value = old_bucket.value_at(i);
                    let _ = new_bucket.insert(&entry_key, &entry_value, &self.comparator);
                    old_bucket.remove_at(i);
                }
            }
        }

        {
            let mut guard = dir_pod.wl();
            let mut dir = HashDirectoryPage::new(&mut guard.data[..]);
            let step = 1u32 << new_local_depth;
            let mut i = pair_pattern;
            while i < dir.size() {
                dir.set_bucket_page_id(i, new_page_id);
                i += step;
            }
        }

        debug!(
            "index {}: split bucket page {} at depth {}, new bucket page {}",
            self.name, bucket_page_id, new_local_depth, new_page_id
        );

        self.bpm.unpin_page(bucket_page_id, true);
        self.bpm.unpin_page(new_page_id, true);
        self.bpm.unpin_page(self.directory_page_id, true);
        Ok(())
    }

    /// Remove `(key, value)`. Returns whether the pair was present. A
    /// bucket left empty is merged with its pair where possible.
    pub fn remove(&self, _tx: &Transaction, key: &K, value: &V) -> Result<bool, MinnowError> {
        let emptied_slot;
        {
            let _table = self.table_latch.rl();

            let dir_pod = self.fetch_directory()?;
            let (slot, bucket_page_id) = {
                let guard = dir_pod.rl();
                let dir = HashDirectoryPage::new(&guard.data[..]);
                let slot = self.hash(key) & dir.global_depth_mask();
                (slot, dir.bucket_page_id(slot))
            };

            if bucket_page_id == INVALID_PAGE_ID {
                self.bpm.unpin_page(self.directory_page_id, false);
                return Ok(false);
            }

            let bucket_pod = match self.bpm.fetch_page(bucket_page_id) {
                Some(pod) => pod,
                None => {
                    self.bpm.unpin_page(self.directory_page_id, false);
                    return Err(MinnowError::NullResult(format!(
                        "bucket page {} not available",
                        bucket_page_id
                    )));
                }
            };

            let (removed, now_empty) = {
                let mut guard = bucket_pod.wl();
                let mut bucket =
                    HashBucketPage::<_, K, V>::new(&mut guard.data[..], self.bucket_capacity);
                let removed = bucket.remove(key, value, &self.comparator);
                (removed, bucket.is_empty())
            };

            self.bpm.unpin_page(bucket_page_id, removed);
            self.bpm.unpin_page(self.directory_page_id, false);

            if !removed {
                return Ok(false);
            }
            emptied_slot = if now_empty { Some(slot) } else { None };
        }
        // table read latch released; merging re-enters under the write latch

        if let Some(slot) = emptied_slot {
            let mut slot = slot;
            // after a successful merge, re-attempt from the lower of the two
            // indices, cascading while buckets keep collapsing
            while let Some(next) = self.try_merge(slot)? {
                slot = next;
            }
        }
        Ok(true)
    }

    /// One merge attempt under the table write latch. Returns the slot to
    /// re-attempt from if a merge happened.
    fn try_merge(&self, slot: u32) -> Result<Option<u32>, MinnowError> {
        let _table = self.table_latch.wl();

        let dir_pod = self.fetch_directory()?;
        let (in_range, bucket_page_id) = {
            let guard = dir_pod.rl();
            let dir = HashDirectoryPage::new(&guard.data[..]);
            if slot >= dir.size() {
                (false, INVALID_PAGE_ID)
            } else {
                (true, dir.bucket_page_id(slot))
            }
        };

        if !in_range || bucket_page_id == INVALID_PAGE_ID {
            self.bpm.unpin_page(self.directory_page_id, false);
            return Ok(None);
        }

        let bucket_pod = match self.bpm.fetch_page(bucket_page_id) {
            Some(pod) => pod,
            None => {
                self.bpm.unpin_page(self.directory_page_id, false);
                return Err(MinnowError::NullResult(format!(
                    "bucket page {} not available",
                    bucket_page_id
                )));
            }
        };

        // an insert may have slipped in between the remove and this merge;
        // a non-empty bucket simply aborts the merge
        let empty = {
            let guard = bucket_pod.rl();
            let bucket = HashBucketPage::<_, K, V>::new(&guard.data[..], self.bucket_capacity);
            bucket.is_empty()
        };
        if !empty {
            self.bpm.unpin_page(bucket_page_id, false);
            self.bpm.unpin_page(self.directory_page_id, false);
            return Ok(None);
        }

        let (local_depth, pair, pair_depth_matches, pair_page_id) = {
            let guard = dir_pod.rl();
            let dir = HashDirectoryPage::new(&guard.data[..]);
            let local_depth = dir.local_depth(slot);
            if local_depth == 0 {
                (0, 0, false, INVALID_PAGE_ID)
            } else {
                let pair = dir.pair_index(slot);
                (
                    local_depth,
                    pair,
                    dir.local_depth(pair) == local_depth,
                    dir.bucket_page_id(pair),
                )
            }
        };

        if local_depth == 0 {
            // the last bucket of the table is empty: drop it and return the
            // directory to its never-populated state
            self.bpm.unpin_page(bucket_page_id, false);
            if !self.bpm.delete_page(bucket_page_id) {
                warn!("index {}: could not delete bucket page {}", self.name, bucket_page_id);
            }
            {
                let mut guard = dir_pod.wl();
                let mut dir = HashDirectoryPage::new(&mut guard.data[..]);
                dir.set_bucket_page_id(slot, INVALID_PAGE_ID);
            }
            self.bpm.unpin_page(self.directory_page_id, true);
            return Ok(None);
        }

        if !pair_depth_matches {
            self.bpm.unpin_page(bucket_page_id, false);
            self.bpm.unpin_page(self.directory_page_id, false);
            return Ok(None);
        }

        {
            let mut guard = dir_pod.wl();
            let mut dir = HashDirectoryPage::new(&mut guard.data[..]);

            // repoint every slot that addressed the empty bucket at the pair
            let pattern = slot & ((1u32 << local_depth) - 1);
            let step = 1u32 << local_depth;
            let mut i = pattern;
            while i < dir.size() {
                dir.set_bucket_page_id(i, pair_page_id);
                i += step;
            }

            // lower the pair's depth along with every slot now sharing it
            dir.decr_local_depth(pair);
            let new_depth = local_depth - 1;
            let new_pattern = pair & ((1u32 << new_depth) - 1);
            let new_step = 1u32 << new_depth;
            let mut i = new_pattern;
            while i < dir.size() {
                if i != pair {
                    dir.decr_local_depth(i);
                }
                i += new_step;
            }

            if dir.can_shrink() {
                dir.decr_global_depth();
                debug!(
                    "index {}: directory shrank to depth {}",
                    self.name,
                    dir.global_depth()
                );
            }
        }

        self.bpm.unpin_page(bucket_page_id, false);
        if !self.bpm.delete_page(bucket_page_id) {
            warn!("index {}: could not delete bucket page {}", self.name, bucket_page_id);
        }
        self.bpm.unpin_page(self.directory_page_id, true);

        debug!(
            "index {}: merged bucket page {} into page {}",
            self.name, bucket_page_id, pair_page_id
        );
        Ok(Some(std::cmp::min(slot, pair)))
    }

    pub fn global_depth(&self) -> Result<u32, MinnowError> {
        let _table = self.table_latch.rl();
        let dir_pod = self.fetch_directory()?;
        let depth = {
            let guard = dir_pod.rl();
            HashDirectoryPage::new(&guard.data[..]).global_depth()
        };
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(depth)
    }

    /// Panics unless the directory invariants hold. Intended for tests.
    pub fn verify_integrity(&self) -> MinnowResult {
        let _table = self.table_latch.rl();
        let dir_pod = self.fetch_directory()?;
        {
            let guard = dir_pod.rl();
            HashDirectoryPage::new(&guard.data[..]).verify_integrity();
        }
        self.bpm.unpin_page(self.directory_page_id, false);
        Ok(())
    }
}

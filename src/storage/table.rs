use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::{
    buffer::BufferPool,
    error::{MinnowError, MinnowResult},
    transaction::Transaction,
    types::{PageId, Rid, INVALID_PAGE_ID},
    utils::HandyRwLock,
};

use super::{heap_page::HeapPage, schema::TableSchema, tuple::Tuple};

/// A table stored as a linked chain of heap pages in the buffer pool.
///
/// RIDs handed out by `insert_tuple` stay valid until the tuple is deleted;
/// deletion tombstones the slot in place. Page latches are never held
/// across calls into the buffer pool.
pub struct TableHeap {
    bpm: Arc<dyn BufferPool>,
    schema: TableSchema,
    first_page_id: PageId,
    // serializes chain extension so racing inserters link exactly one page
    extend_latch: Mutex<()>,
}

impl TableHeap {
    pub fn new(bpm: Arc<dyn BufferPool>, schema: TableSchema) -> Result<Self, MinnowError> {
        let (first_page_id, first_pod) = bpm.new_page().ok_or_else(|| {
            MinnowError::NullResult("no frame for the first heap page".to_string())
        })?;
        {
            let mut guard = first_pod.wl();
            let mut page = HeapPage::new(&mut guard.data[..], &schema);
            page.init();
        }
        bpm.unpin_page(first_page_id, true);
        debug!("created table heap rooted at page {}", first_page_id);

        Ok(Self {
            bpm,
            schema,
            first_page_id,
            extend_latch: Mutex::new(()),
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Append a tuple, walking the chain for a page with room and growing
    /// the chain when every page is full.
    pub fn insert_tuple(&self, _tx: &Transaction, tuple: &Tuple) -> Result<Rid, MinnowError> {
        let mut page_id = self.first_page_id;
        loop {
            let pod = self.bpm.fetch_page(page_id).ok_or_else(|| {
                MinnowError::TupleInsertFailed(format!("heap page {} not available", page_id))
            })?;

            let (slot, next_page_id) = {
                let mut guard = pod.wl();
                let mut page = HeapPage::new(&mut guard.data[..], &self.schema);
                (page.insert_tuple(tuple, &self.schema), page.next_page_id())
            };

            if let Some(slot) = slot {
                self.bpm.unpin_page(page_id, true);
                return Ok(Rid::new(page_id, slot as u32));
            }
            self.bpm.unpin_page(page_id, false);

            page_id = if next_page_id == INVALID_PAGE_ID {
                self.extend_chain(page_id)?
            } else {
                next_page_id
            };
        }
    }

    /// Link one fresh page after `tail`, or return the page someone else
    /// linked while we waited for the latch.
    fn extend_chain(&self, tail: PageId) -> Result<PageId, MinnowError> {
        let _guard = self.extend_latch.lock().unwrap();

        let tail_pod = self.bpm.fetch_page(tail).ok_or_else(|| {
            MinnowError::TupleInsertFailed(format!("heap page {} not available", tail))
        })?;
        let next_page_id = {
            let guard = tail_pod.rl();
            HeapPage::new(&guard.data[..], &self.schema).next_page_id()
        };
        if next_page_id != INVALID_PAGE_ID {
            self.bpm.unpin_page(tail, false);
            return Ok(next_page_id);
        }

        let (new_page_id, new_pod) = match self.bpm.new_page() {
            Some(out) => out,
            None => {
                self.bpm.unpin_page(tail, false);
                return Err(MinnowError::TupleInsertFailed(
                    "no frame for a new heap page".to_string(),
                ));
            }
        };
        {
            let mut guard = new_pod.wl();
            let mut page = HeapPage::new(&mut guard.data[..], &self.schema);
            page.init();
        }
        {
            let mut guard = tail_pod.wl();
            let mut page = HeapPage::new(&mut guard.data[..], &self.schema);
            page.set_next_page_id(new_page_id);
        }
        self.bpm.unpin_page(new_page_id, true);
        self.bpm.unpin_page(tail, true);
        debug!("extended table heap with page {}", new_page_id);
        Ok(new_page_id)
    }

    pub fn get_tuple(&self, _tx: &Transaction, rid: &Rid) -> Result<Option<Tuple>, MinnowError> {
        let pod = self.bpm.fetch_page(rid.page_id).ok_or_else(|| {
            MinnowError::NullResult(format!("heap page {} not available", rid.page_id))
        })?;
        let tuple = {
            let guard = pod.rl();
            HeapPage::new(&guard.data[..], &self.schema).get_tuple(rid.slot as usize, &self.schema)
        };
        self.bpm.unpin_page(rid.page_id, false);
        Ok(tuple)
    }

    /// Tombstone the tuple at `rid`.
    pub fn mark_delete(&self, _tx: &Transaction, rid: &Rid) -> MinnowResult {
        let pod = self.bpm.fetch_page(rid.page_id).ok_or_else(|| {
            MinnowError::TupleDeleteFailed(format!("heap page {} not available", rid.page_id))
        })?;
        let deleted = {
            let mut guard = pod.wl();
            HeapPage::new(&mut guard.data[..], &self.schema).delete_tuple(rid.slot as usize)
        };
        self.bpm.unpin_page(rid.page_id, deleted);
        if deleted {
            Ok(())
        } else {
            Err(MinnowError::TupleDeleteFailed(format!(
                "no live tuple at {}",
                rid
            )))
        }
    }

    /// Overwrite the tuple at `rid` in place; the RID does not move.
    pub fn update_tuple(&self, _tx: &Transaction, tuple: &Tuple, rid: &Rid) -> MinnowResult {
        let pod = self.bpm.fetch_page(rid.page_id).ok_or_else(|| {
            MinnowError::TupleUpdateFailed(format!("heap page {} not available", rid.page_id))
        })?;
        let updated = {
            let mut guard = pod.wl();
            HeapPage::new(&mut guard.data[..], &self.schema).update_tuple(
                rid.slot as usize,
                tuple,
                &self.schema,
            )
        };
        self.bpm.unpin_page(rid.page_id, updated);
        if updated {
            Ok(())
        } else {
            Err(MinnowError::TupleUpdateFailed(format!(
                "no live tuple at {}",
                rid
            )))
        }
    }

    /// Walk every live tuple in chain order, bound to `tx`.
    pub fn iter(&self, tx: &Transaction) -> TableIterator {
        TableIterator {
            bpm: Arc::clone(&self.bpm),
            schema: self.schema.clone(),
            _tx: tx.clone(),
            current_page_id: self.first_page_id,
            next_slot: 0,
        }
    }
}

/// Heap-order iterator over live tuples. Each step pins the current page
/// just long enough to read one tuple.
pub struct TableIterator {
    bpm: Arc<dyn BufferPool>,
    schema: TableSchema,
    _tx: Transaction,
    current_page_id: PageId,
    next_slot: usize,
}

impl Iterator for TableIterator {
    type Item = (Tuple, Rid);

    fn next(&mut self) -> Option<Self::Item> {
        while self.current_page_id != INVALID_PAGE_ID {
            let pod = match self.bpm.fetch_page(self.current_page_id) {
                Some(pod) => pod,
                None => {
                    error!(
                        "table iterator could not fetch page {}, ending scan",
                        self.current_page_id
                    );
                    self.current_page_id = INVALID_PAGE_ID;
                    return None;
                }
            };
            let page_id = self.current_page_id;

            let found = {
                let guard = pod.rl();
                let page = HeapPage::new(&guard.data[..], &self.schema);
                let mut found = None;
                for slot in self.next_slot..page.slot_count() {
                    if let Some(tuple) = page.get_tuple(slot, &self.schema) {
                        found = Some((tuple, Rid::new(page_id, slot as u32), slot));
                        break;
                    }
                }
                match found {
                    Some(hit) => Some(hit),
                    None => {
                        self.current_page_id = page.next_page_id();
                        self.next_slot = 0;
                        None
                    }
                }
            };
            self.bpm.unpin_page(page_id, false);

            if let Some((tuple, rid, slot)) = found {
                self.next_slot = slot + 1;
                return Some((tuple, rid));
            }
        }
        None
    }
}

use bit_vec::BitVec;

use crate::types::{PageId, INVALID_PAGE_ID, PAGE_SIZE};

use super::{schema::TableSchema, tuple::Tuple};

const NEXT_PAGE_ID_OFFSET: usize = 0;
const HEADER_OFFSET: usize = 4;

/// A table heap data page, viewed in place over a page buffer.
///
/// Layout: a `next_page_id` chain pointer, a slot bitmap (true means the
/// slot holds a live tuple), then fixed-width tuple slots. Slot numbers are
/// the stable half of a RID; deleting clears the bit without moving
/// anything.
pub struct HeapPage<B> {
    data: B,
    slot_count: usize,
    tuple_size: usize,
}

impl<B: AsRef<[u8]>> HeapPage<B> {
    pub fn new(data: B, schema: &TableSchema) -> Self {
        let tuple_size = schema.tuple_size();
        let slot_count = Self::slots_count(tuple_size);
        debug_assert!(
            HEADER_OFFSET + Self::header_size(slot_count) + slot_count * tuple_size <= PAGE_SIZE,
            "heap page layout overflows the page"
        );
        Self {
            data,
            slot_count,
            tuple_size,
        }
    }

    /// Maximum number of tuples a page can hold: each tuple costs its bytes
    /// plus one bitmap bit, after the chain pointer.
    pub fn slots_count(tuple_size: usize) -> usize {
        let usable_bits = (PAGE_SIZE - HEADER_OFFSET - 1) * 8;
        usable_bits / (tuple_size * 8 + 1)
    }

    fn header_size(slot_count: usize) -> usize {
        slot_count / 8 + 1
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn tuple_offset(&self, slot: usize) -> usize {
        HEADER_OFFSET + Self::header_size(self.slot_count) + slot * self.tuple_size
    }

    fn bitmap(&self) -> BitVec {
        let header = Self::header_size(self.slot_count);
        BitVec::from_bytes(&self.data.as_ref()[HEADER_OFFSET..HEADER_OFFSET + header])
    }

    pub fn next_page_id(&self) -> PageId {
        let bytes = &self.data.as_ref()[NEXT_PAGE_ID_OFFSET..NEXT_PAGE_ID_OFFSET + 4];
        PageId::from_le_bytes(bytes.try_into().unwrap())
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.slot_count && self.bitmap().get(slot).unwrap_or(false)
    }

    pub fn get_tuple(&self, slot: usize, schema: &TableSchema) -> Option<Tuple> {
        if !self.is_slot_used(slot) {
            return None;
        }
        let offset = self.tuple_offset(slot);
        Some(Tuple::from_bytes(
            schema,
            &self.data.as_ref()[offset..offset + self.tuple_size],
        ))
    }

    pub fn used_slots_count(&self) -> usize {
        let bitmap = self.bitmap();
        (0..self.slot_count).filter(|&i| bitmap[i]).count()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeapPage<B> {
    /// Format a zeroed page as an empty tail page.
    pub fn init(&mut self) {
        self.set_next_page_id(INVALID_PAGE_ID);
        let header = Self::header_size(self.slot_count);
        self.data.as_mut()[HEADER_OFFSET..HEADER_OFFSET + header].fill(0);
    }

    pub fn set_next_page_id(&mut self, page_id: PageId) {
        self.data.as_mut()[NEXT_PAGE_ID_OFFSET..NEXT_PAGE_ID_OFFSET + 4]
            .copy_from_slice(&page_id.to_le_bytes());
    }

    fn mark_slot(&mut self, slot: usize, used: bool) {
        let mut bitmap = self.bitmap();
        bitmap.set(slot, used);
        let header = Self::header_size(self.slot_count);
        self.data.as_mut()[HEADER_OFFSET..HEADER_OFFSET + header]
            .copy_from_slice(&bitmap.to_bytes());
    }

    fn write_tuple(&mut self, slot: usize, tuple: &Tuple, schema: &TableSchema) {
        let offset = self.tuple_offset(slot);
        let bytes = tuple.to_bytes(schema);
        self.data.as_mut()[offset..offset + self.tuple_size].copy_from_slice(&bytes);
    }

    /// Place the tuple in the first free slot; `None` when the page is
    /// full.
    pub fn insert_tuple(&mut self, tuple: &Tuple, schema: &TableSchema) -> Option<usize> {
        let bitmap = self.bitmap();
        let slot = (0..self.slot_count).find(|&i| !bitmap[i])?;
        self.write_tuple(slot, tuple, schema);
        self.mark_slot(slot, true);
        Some(slot)
    }

    /// Clear a live slot. Returns false when the slot holds nothing.
    pub fn delete_tuple(&mut self, slot: usize) -> bool {
        if !self.is_slot_used(slot) {
            return false;
        }
        self.mark_slot(slot, false);
        true
    }

    /// Overwrite a live slot in place. Returns false when the slot holds
    /// nothing.
    pub fn update_tuple(&mut self, slot: usize, tuple: &Tuple, schema: &TableSchema) -> bool {
        if !self.is_slot_used(slot) {
            return false;
        }
        self.write_tuple(slot, tuple, schema);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{cell::Cell, schema::int64_schema};

    #[test]
    fn test_insert_delete_update() {
        let schema = int64_schema(2, "c");
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = HeapPage::new(&mut buf[..], &schema);
        page.init();
        assert_eq!(page.next_page_id(), INVALID_PAGE_ID);

        let t1 = Tuple::new(vec![Cell::Int64(1), Cell::Int64(10)]);
        let t2 = Tuple::new(vec![Cell::Int64(2), Cell::Int64(20)]);
        assert_eq!(page.insert_tuple(&t1, &schema), Some(0));
        assert_eq!(page.insert_tuple(&t2, &schema), Some(1));
        assert_eq!(page.used_slots_count(), 2);
        assert_eq!(page.get_tuple(0, &schema), Some(t1));

        assert!(page.delete_tuple(0));
        assert!(!page.delete_tuple(0));
        assert_eq!(page.get_tuple(0, &schema), None);

        // the freed slot is reused
        let t3 = Tuple::new(vec![Cell::Int64(3), Cell::Int64(30)]);
        assert_eq!(page.insert_tuple(&t3, &schema), Some(0));

        let t4 = Tuple::new(vec![Cell::Int64(4), Cell::Int64(40)]);
        assert!(page.update_tuple(1, &t4, &schema));
        assert_eq!(page.get_tuple(1, &schema), Some(t4));
        assert!(!page.update_tuple(5, &t3, &schema));
    }

    #[test]
    fn test_page_fills_up() {
        let schema = int64_schema(1, "c");
        let slots = HeapPage::<&[u8]>::slots_count(schema.tuple_size());
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = HeapPage::new(&mut buf[..], &schema);
        page.init();

        for i in 0..slots {
            let t = Tuple::new(vec![Cell::Int64(i as i64)]);
            assert_eq!(page.insert_tuple(&t, &schema), Some(i));
        }
        let overflow = Tuple::new(vec![Cell::Int64(-1)]);
        assert_eq!(page.insert_tuple(&overflow, &schema), None);
    }
}

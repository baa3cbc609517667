use std::sync::{Arc, RwLock};

use crate::io::{read_exact, Decodeable, Encodeable};

/// Shared, latched ownership of a value. Type alias, not a new type, so the
/// underlying `Arc`/`RwLock` methods stay available.
pub type Pod<T> = Arc<RwLock<T>>;

/// Size of a page in bytes, the unit of disk I/O and caching.
pub const PAGE_SIZE: usize = 4096;

/// Identity of a page on disk. Negative ids never reach the disk; `-1`
/// denotes "no page".
pub type PageId = i32;

pub const INVALID_PAGE_ID: PageId = -1;

/// Index of a frame inside a buffer pool's contiguous page array.
pub type FrameId = usize;

/// Identity of a table in the catalog.
pub type TableOid = u32;

/// Row identifier: the page a tuple lives on and its slot within that page.
/// Stable for the tuple's lifetime, since deletion marks and never relocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: u32,
}

impl Rid {
    pub const INVALID: Rid = Rid {
        page_id: INVALID_PAGE_ID,
        slot: 0,
    };

    pub fn new(page_id: PageId, slot: u32) -> Self {
        Self { page_id, slot }
    }
}

impl Default for Rid {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot)
    }
}

// 8 bytes: page id then slot, both little-endian
impl Encodeable for Rid {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&self.page_id.to_le_bytes());
        buf.extend_from_slice(&self.slot.to_le_bytes());
        buf
    }
}

impl Decodeable for Rid {
    fn decode<R: std::io::Read>(reader: &mut R) -> Self {
        let page_id = PageId::from_le_bytes(read_exact(reader, 4).try_into().unwrap());
        let slot = u32::from_le_bytes(read_exact(reader, 4).try_into().unwrap());
        Self { page_id, slot }
    }
}

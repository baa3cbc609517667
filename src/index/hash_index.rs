use std::sync::Arc;

use log::debug;

use crate::{
    buffer::BufferPool,
    error::{MinnowError, MinnowResult},
    storage::{TableSchema, Tuple},
    transaction::Transaction,
    types::Rid,
};

use super::{
    extendible_hash::ExtendibleHashTable,
    key::{DefaultKeyHasher, GenericComparator, GenericKey},
};

type KeyedHashTable<const N: usize> =
    ExtendibleHashTable<GenericKey<N>, Rid, GenericComparator<N>, DefaultKeyHasher>;

/// The instantiation whose key width fits this index's key schema. The
/// width is chosen at creation so encoded key tuples are never truncated.
enum IndexTable {
    Key4(KeyedHashTable<4>),
    Key8(KeyedHashTable<8>),
    Key16(KeyedHashTable<16>),
    Key32(KeyedHashTable<32>),
    Key64(KeyedHashTable<64>),
}

macro_rules! on_table {
    ($index:expr, $table:ident => $body:expr) => {
        match &$index.table {
            IndexTable::Key4($table) => $body,
            IndexTable::Key8($table) => $body,
            IndexTable::Key16($table) => $body,
            IndexTable::Key32($table) => $body,
            IndexTable::Key64($table) => $body,
        }
    };
}

/// An extendible-hash index over a table, keyed by a projection of the
/// table's columns. This is the monomorphised instantiation the executors
/// talk to; entries map an encoded key tuple to the RID of its row.
pub struct HashIndex {
    name: String,
    key_schema: TableSchema,
    key_attrs: Vec<usize>,
    table: IndexTable,
}

impl HashIndex {
    pub fn new(
        name: &str,
        bpm: Arc<dyn BufferPool>,
        key_schema: TableSchema,
        key_attrs: Vec<usize>,
    ) -> Result<Self, MinnowError> {
        // the smallest supported width the encoded key fits in
        let key_size = key_schema.tuple_size();
        let table = if key_size <= 4 {
            IndexTable::Key4(ExtendibleHashTable::new(
                name,
                bpm,
                GenericComparator,
                DefaultKeyHasher,
            )?)
        } else if key_size <= 8 {
            IndexTable::Key8(ExtendibleHashTable::new(
                name,
                bpm,
                GenericComparator,
                DefaultKeyHasher,
            )?)
        } else if key_size <= 16 {
            IndexTable::Key16(ExtendibleHashTable::new(
                name,
                bpm,
                GenericComparator,
                DefaultKeyHasher,
            )?)
        } else if key_size <= 32 {
            IndexTable::Key32(ExtendibleHashTable::new(
                name,
                bpm,
                GenericComparator,
                DefaultKeyHasher,
            )?)
        } else if key_size <= 64 {
            IndexTable::Key64(ExtendibleHashTable::new(
                name,
                bpm,
                GenericComparator,
                DefaultKeyHasher,
            )?)
        } else {
            return Err(MinnowError::OutOfRange(format!(
                "index {} key encodes to {} bytes, above the widest supported key",
                name, key_size
            )));
        };

        Ok(Self {
            name: name.to_string(),
            key_schema,
            key_attrs,
            table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_schema(&self) -> &TableSchema {
        &self.key_schema
    }

    pub fn key_attrs(&self) -> &[usize] {
        &self.key_attrs
    }

    /// Register `key_tuple -> rid`. An already-present pair is left alone.
    pub fn insert_entry(&self, tx: &Transaction, key_tuple: &Tuple, rid: Rid) -> MinnowResult {
        let bytes = key_tuple.to_bytes(&self.key_schema);
        let inserted =
            on_table!(self, table => table.insert(tx, &GenericKey::from_bytes(&bytes), &rid))?;
        if !inserted {
            debug!("index {}: entry {} -> {} already present", self.name, key_tuple, rid);
        }
        Ok(())
    }

    /// Drop `key_tuple -> rid` if present.
    pub fn delete_entry(&self, tx: &Transaction, key_tuple: &Tuple, rid: Rid) -> MinnowResult {
        let bytes = key_tuple.to_bytes(&self.key_schema);
        let removed =
            on_table!(self, table => table.remove(tx, &GenericKey::from_bytes(&bytes), &rid))?;
        if !removed {
            debug!("index {}: entry {} -> {} not present", self.name, key_tuple, rid);
        }
        Ok(())
    }

    /// Every RID stored under `key_tuple`.
    pub fn scan_key(&self, tx: &Transaction, key_tuple: &Tuple) -> Result<Vec<Rid>, MinnowError> {
        let bytes = key_tuple.to_bytes(&self.key_schema);
        on_table!(self, table => table.get_value(tx, &GenericKey::from_bytes(&bytes)))
    }
}

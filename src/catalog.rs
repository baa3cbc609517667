use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::debug;

use crate::{
    buffer::BufferPool,
    error::MinnowError,
    index::HashIndex,
    storage::{TableHeap, TableSchema},
    types::TableOid,
    utils::HandyRwLock,
};

/// Everything the executors need to know about a table.
pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: TableSchema,
    pub heap: TableHeap,
}

/// Everything the executors need to know about an index.
pub struct IndexInfo {
    pub name: String,
    pub table_name: String,
    pub index: HashIndex,
}

/// Maps table oids to heaps and table names to their indexes.
pub struct Catalog {
    bpm: Arc<dyn BufferPool>,
    next_oid: RwLock<TableOid>,
    tables: RwLock<HashMap<TableOid, Arc<TableInfo>>>,
    table_names: RwLock<HashMap<String, TableOid>>,
    indexes: RwLock<HashMap<String, Vec<Arc<IndexInfo>>>>,
}

impl Catalog {
    pub fn new(bpm: Arc<dyn BufferPool>) -> Self {
        Self {
            bpm,
            next_oid: RwLock::new(0),
            tables: RwLock::new(HashMap::new()),
            table_names: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn create_table(
        &self,
        name: &str,
        schema: TableSchema,
    ) -> Result<Arc<TableInfo>, MinnowError> {
        let heap = TableHeap::new(Arc::clone(&self.bpm), schema.clone())?;

        let oid = {
            let mut next_oid = self.next_oid.wl();
            let oid = *next_oid;
            *next_oid += 1;
            oid
        };

        let info = Arc::new(TableInfo {
            oid,
            name: name.to_string(),
            schema,
            heap,
        });
        self.tables.wl().insert(oid, Arc::clone(&info));
        self.table_names.wl().insert(name.to_string(), oid);
        debug!("created table {} with oid {}", name, oid);
        Ok(info)
    }

    pub fn get_table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.tables.rl().get(&oid).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let oid = *self.table_names.rl().get(name)?;
        self.get_table(oid)
    }

    /// Build a hash index over `key_attrs` of an existing table. The index
    /// starts empty; rows already in the heap are not back-filled.
    pub fn create_index(
        &self,
        index_name: &str,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>, MinnowError> {
        let table = self.get_table_by_name(table_name).ok_or_else(|| {
            MinnowError::OutOfRange(format!("no table named {}", table_name))
        })?;

        let key_schema = table.schema.project(&key_attrs);
        let index = HashIndex::new(index_name, Arc::clone(&self.bpm), key_schema, key_attrs)?;

        let info = Arc::new(IndexInfo {
            name: index_name.to_string(),
            table_name: table_name.to_string(),
            index,
        });
        self.indexes
            .wl()
            .entry(table_name.to_string())
            .or_default()
            .push(Arc::clone(&info));
        debug!("created index {} on table {}", index_name, table_name);
        Ok(info)
    }

    pub fn get_table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        self.indexes
            .rl()
            .get(table_name)
            .cloned()
            .unwrap_or_default()
    }
}

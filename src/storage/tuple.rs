use std::io::Cursor;

use super::{cell::Cell, schema::TableSchema};

/// A row: one cell per schema field. Tuples are decoded copies; the on-page
/// bytes stay behind the owning page's latch.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    cells: Vec<Cell>,
}

impl Tuple {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Fixed-width encoding driven by the schema; always
    /// `schema.tuple_size()` bytes. A missing trailing cell encodes as null.
    pub fn to_bytes(&self, schema: &TableSchema) -> Vec<u8> {
        let mut buf = Vec::with_capacity(schema.tuple_size());
        for (i, field) in schema.fields().iter().enumerate() {
            let cell = self.cells.get(i).unwrap_or(&Cell::Null);
            buf.extend_from_slice(&cell.encode(field.field_type()));
        }
        buf
    }

    pub fn from_bytes(schema: &TableSchema, bytes: &[u8]) -> Self {
        let mut reader = Cursor::new(bytes);
        let cells = schema
            .fields()
            .iter()
            .map(|field| Cell::decode(&mut reader, field.field_type()))
            .collect();
        Self { cells }
    }

    /// The sub-tuple an index stores: the cells at `key_attrs`, in order.
    pub fn key_from_tuple(&self, key_attrs: &[usize]) -> Tuple {
        let cells = key_attrs
            .iter()
            .map(|&i| self.cells.get(i).cloned().unwrap_or(Cell::Null))
            .collect();
        Tuple::new(cells)
    }
}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", cell)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{Field, FieldType};

    #[test]
    fn test_round_trip() {
        let schema = TableSchema::new(vec![
            Field::new("id", FieldType::Int64),
            Field::new("name", FieldType::Varchar(8)),
        ]);
        let tuple = Tuple::new(vec![Cell::Int64(7), Cell::String("x".to_string())]);

        let bytes = tuple.to_bytes(&schema);
        assert_eq!(bytes.len(), schema.tuple_size());
        assert_eq!(Tuple::from_bytes(&schema, &bytes), tuple);
    }

    #[test]
    fn test_key_from_tuple() {
        let tuple = Tuple::new(vec![Cell::Int64(1), Cell::Int64(2), Cell::Int64(3)]);
        let key = tuple.key_from_tuple(&[2, 0]);
        assert_eq!(key.cells(), &[Cell::Int64(3), Cell::Int64(1)]);
    }
}

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use crate::io::read_exact;

use super::schema::FieldType;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT64: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_STRING: u8 = 4;

/// One column value.
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Sum of two numeric cells of the same type; `None` for mismatched
    /// types and for i64 overflow.
    pub fn checked_add(&self, other: &Cell) -> Option<Cell> {
        match (self, other) {
            (Cell::Int64(a), Cell::Int64(b)) => a.checked_add(*b).map(Cell::Int64),
            (Cell::Float64(a), Cell::Float64(b)) => Some(Cell::Float64(a + b)),
            _ => None,
        }
    }

    /// Encode as a tag byte followed by the payload width the field type
    /// declares. A cell that does not match the declared type encodes as
    /// null.
    pub fn encode(&self, field_type: &FieldType) -> Vec<u8> {
        let payload_size = field_type.payload_size();
        let mut buf = vec![0u8; 1 + payload_size];

        match (self, field_type) {
            (Cell::Bool(v), FieldType::Bool) => {
                buf[0] = TAG_BOOL;
                buf[1] = *v as u8;
            }
            (Cell::Int64(v), FieldType::Int64) => {
                buf[0] = TAG_INT64;
                buf[1..9].copy_from_slice(&v.to_le_bytes());
            }
            (Cell::Float64(v), FieldType::Float64) => {
                buf[0] = TAG_FLOAT64;
                buf[1..9].copy_from_slice(&v.to_le_bytes());
            }
            (Cell::String(v), FieldType::Varchar(cap)) => {
                buf[0] = TAG_STRING;
                let bytes = v.as_bytes();
                let len = std::cmp::min(bytes.len(), *cap).min(u8::MAX as usize);
                buf[1] = len as u8;
                buf[2..2 + len].copy_from_slice(&bytes[..len]);
            }
            // nulls and mismatches keep the zeroed (null) encoding
            _ => {}
        }
        buf
    }

    pub fn decode<R: std::io::Read>(reader: &mut R, field_type: &FieldType) -> Cell {
        let tag = read_exact(reader, 1)[0];
        let payload = read_exact(reader, field_type.payload_size());

        match tag {
            TAG_BOOL => Cell::Bool(payload[0] == 1),
            TAG_INT64 => Cell::Int64(i64::from_le_bytes(payload[..8].try_into().unwrap())),
            TAG_FLOAT64 => Cell::Float64(f64::from_le_bytes(payload[..8].try_into().unwrap())),
            TAG_STRING => {
                let len = payload[0] as usize;
                let bytes = &payload[1..1 + len.min(payload.len() - 1)];
                Cell::String(String::from_utf8_lossy(bytes).to_string())
            }
            _ => Cell::Null,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Cell::Null => TAG_NULL,
            Cell::Bool(_) => TAG_BOOL,
            Cell::Int64(_) => TAG_INT64,
            Cell::Float64(_) => TAG_FLOAT64,
            Cell::String(_) => TAG_STRING,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Int64(a), Cell::Int64(b)) => a == b,
            (Cell::Float64(a), Cell::Float64(b)) => a.to_bits() == b.to_bits(),
            (Cell::String(a), Cell::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            Cell::Null => {}
            Cell::Bool(v) => v.hash(state),
            Cell::Int64(v) => v.hash(state),
            Cell::Float64(v) => v.to_bits().hash(state),
            Cell::String(v) => v.hash(state),
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            (Cell::Int64(a), Cell::Int64(b)) => a.cmp(b),
            (Cell::Float64(a), Cell::Float64(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Cell::String(a), Cell::String(b)) => a.cmp(b),
            // nulls sort first; mixed types order by type
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int64(v) => write!(f, "{}", v),
            Cell::Float64(v) => write!(f, "{}", v),
            Cell::String(v) => write!(f, "{}", v),
        }
    }
}

mod cell;
mod heap_page;
pub mod page;
mod schema;
mod table;
mod tuple;

pub use cell::Cell;
pub use heap_page::HeapPage;
pub use page::Page;
pub use schema::{int64_schema, Field, FieldType, TableSchema};
pub use table::{TableHeap, TableIterator};
pub use tuple::Tuple;

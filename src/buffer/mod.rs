mod buffer_pool;
mod lru_replacer;
mod parallel_pool;

pub use buffer_pool::{BufferPool, BufferPoolInstance};
pub use lru_replacer::LruReplacer;
pub use parallel_pool::ParallelBufferPool;

mod bucket_page;
mod directory_page;
mod extendible_hash;
mod hash_index;
mod key;

/// Hard cap on global and local depth; the directory page reserves
/// `2^MAX_DEPTH` slots.
pub const MAX_DEPTH: u32 = 9;

pub use bucket_page::{bucket_array_size, BucketInsert, HashBucketPage};
pub use directory_page::{HashDirectoryPage, DIRECTORY_ARRAY_SIZE};
pub use extendible_hash::ExtendibleHashTable;
pub use hash_index::HashIndex;
pub use key::{
    DefaultKeyHasher, GenericComparator, GenericKey, IdentityKeyHasher, IntComparator,
    KeyComparator, KeyHasher,
};

use std::{
    cmp::Ordering,
    collections::hash_map::DefaultHasher,
    hash::Hasher,
};

use crate::io::{read_exact, Decodeable, Encodeable};

/// Fixed-width index key: the first `N` bytes of an encoded key tuple,
/// zero-padded. Longer keys are truncated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenericKey<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> GenericKey<N> {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; N];
        let len = std::cmp::min(N, bytes.len());
        data[..len].copy_from_slice(&bytes[..len]);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> Default for GenericKey<N> {
    fn default() -> Self {
        Self { data: [0u8; N] }
    }
}

impl<const N: usize> Encodeable for GenericKey<N> {
    fn encode(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl<const N: usize> Decodeable for GenericKey<N> {
    fn decode<R: std::io::Read>(reader: &mut R) -> Self {
        let bytes = read_exact(reader, N);
        Self::from_bytes(&bytes)
    }
}

/// Total order over index keys of one monomorphised key type.
pub trait KeyComparator<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IntComparator;

impl KeyComparator<i32> for IntComparator {
    fn compare(&self, a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }
}

impl KeyComparator<i64> for IntComparator {
    fn compare(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GenericComparator<const N: usize>;

impl<const N: usize> KeyComparator<GenericKey<N>> for GenericComparator<N> {
    fn compare(&self, a: &GenericKey<N>, b: &GenericKey<N>) -> Ordering {
        a.data.cmp(&b.data)
    }
}

/// 64-bit hash of a key; the table downcasts to 32 bits for addressing.
pub trait KeyHasher<K>: Send + Sync {
    fn hash_key(&self, key: &K) -> u64;
}

/// Production hasher: SipHash over the key's encoded bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultKeyHasher;

impl<K: Encodeable> KeyHasher<K> for DefaultKeyHasher {
    fn hash_key(&self, key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(&key.encode());
        hasher.finish()
    }
}

/// Maps an integer key to itself. Tests use this to force a predictable
/// directory shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityKeyHasher;

impl KeyHasher<i32> for IdentityKeyHasher {
    fn hash_key(&self, key: &i32) -> u64 {
        *key as u32 as u64
    }
}

impl KeyHasher<i64> for IdentityKeyHasher {
    fn hash_key(&self, key: &i64) -> u64 {
        *key as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_key_padding() {
        let key = GenericKey::<8>::from_bytes(&[1, 2, 3]);
        assert_eq!(key.as_bytes(), &[1, 2, 3, 0, 0, 0, 0, 0]);

        let long = GenericKey::<4>::from_bytes(&[9; 16]);
        assert_eq!(long.as_bytes(), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_identity_hasher() {
        assert_eq!(IdentityKeyHasher.hash_key(&42i32), 42);
        assert_eq!(IdentityKeyHasher.hash_key(&7i64), 7);
    }
}

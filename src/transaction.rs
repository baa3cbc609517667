use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

pub type TransactionId = u64;

/// Opaque transaction handle threaded through storage and execution calls.
/// Issued by the (external) transaction manager; this core only needs its
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transaction {
    id: TransactionId,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "tx-{}", self.id)
    }
}

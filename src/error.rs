use thiserror::Error;

/// Failures surfaced by the storage and execution layers.
///
/// Recoverable conditions (a full bucket, a page that is simply not
/// resident) are reported through `bool`/`Option` returns on the APIs that
/// produce them; only conditions that end the current operation are raised
/// as `MinnowError`.
#[derive(Debug, Error)]
pub enum MinnowError {
    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("extendible hash table reached its maximum depth")]
    IndexFull,

    #[error("bucket page is full")]
    BucketFull,

    #[error("bucket page is empty")]
    BucketEmpty,

    #[error("no frame available or page not resident: {0}")]
    NullResult(String),

    #[error("invalid page id: {0}")]
    InvalidPageId(i32),

    #[error("join plan has no predicate")]
    NullPredicate,

    #[error("tuple insert failed: {0}")]
    TupleInsertFailed(String),

    #[error("tuple delete failed: {0}")]
    TupleDeleteFailed(String),

    #[error("tuple update failed: {0}")]
    TupleUpdateFailed(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MinnowError {
    fn from(e: std::io::Error) -> Self {
        MinnowError::Io(e.to_string())
    }
}

pub type MinnowResult = Result<(), MinnowError>;

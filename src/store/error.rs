/// Errors returned by a [`crate::store::RecordStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with the given key is visible to the requesting owner.
    #[error("{table} record not found: {key}")]
    NotFound { table: &'static str, key: String },

    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated on {table}: {key}")]
    UniqueViolation { table: &'static str, key: String },

    /// The row's current status does not allow the requested one.
    #[error("{table} record {key} cannot move from {from} to {to}")]
    InvalidTransition {
        table: &'static str,
        key: String,
        from: &'static str,
        to: &'static str,
    },

    /// Backend failure (I/O, serialization, lock poisoning).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(table: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            table,
            key: key.to_string(),
        }
    }
}

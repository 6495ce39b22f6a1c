/// Failures at the persistence boundary. Never raised for ordinary typing
/// edge cases; those are no-ops or fallback values.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown {kind} in storage: {value}")]
    UnknownTag { kind: &'static str, value: String },
    #[error("bundled asset missing or unreadable: {0}")]
    MissingAsset(String),
}

/// Failures publishing race progress. Logged and dropped by callers.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("realtime channel closed")]
    ChannelClosed,
    #[error("progress rejected: {0}")]
    Rejected(String),
}

use thiserror::Error;

/// Unified error type for the Palisade library
#[derive(Error, Debug)]
pub enum PalisadeError {
    // Store errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Store connection failed: {0}")]
    StoreConnection(String),

    #[error("Store operation timed out")]
    StoreTimeout,

    // Pool errors
    #[error("Proxy pool is empty")]
    PoolEmpty,

    #[error("No proxy available")]
    NoProxyAvailable,

    #[error("Invalid proxy format: {0}")]
    InvalidProxyFormat(String),

    // Inventory errors
    #[error("Inventory fetch failed: {0}")]
    InventoryFetch(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for Palisade operations
pub type Result<T> = std::result::Result<T, PalisadeError>;

impl PalisadeError {
    /// Check if this is a configuration-class error.
    ///
    /// Configuration errors are fatal and surface at construction or first
    /// use: the store is unreachable, the pool has never been loaded, or the
    /// configuration itself is invalid.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PalisadeError::StoreConnection(_)
                | PalisadeError::PoolEmpty
                | PalisadeError::InvalidConfig(_)
        )
    }

    /// Check if this is a transient error.
    ///
    /// Transient errors are retryable by the caller: the backend hiccupped,
    /// or every proxy is currently evicted or cooling down.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PalisadeError::Store(_)
                | PalisadeError::StoreTimeout
                | PalisadeError::NoProxyAvailable
                | PalisadeError::InventoryFetch(_)
        )
    }
}

// Convert from reqwest errors raised during inventory fetches
impl From<reqwest::Error> for PalisadeError {
    fn from(err: reqwest::Error) -> Self {
        PalisadeError::InventoryFetch(err.to_string())
    }
}

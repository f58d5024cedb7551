//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Size string has no recognized unit suffix
    #[error("Invalid unit in size string: {0}")]
    InvalidUnit(String),

    /// Numeric part of a size string could not be parsed
    #[error("Malformed number in size string: {0}")]
    MalformedNumber(String),

    /// Total system memory could not be determined
    #[error("System memory probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// Requested ceiling is larger than the host's physical memory
    #[error("Max memory {requested} bytes exceeds system total of {system_total} bytes")]
    InvalidMaxMemory { requested: i64, system_total: u64 },

    /// Write would push memory usage over the ceiling
    #[error("Out of max memory: write needs {requested} bytes, {usage} of {max_memory} in use")]
    OutOfMemory {
        requested: i64,
        usage: i64,
        max_memory: i64,
    },

    /// Overflow policy name is not recognized
    #[error("Unknown max memory policy: {0}")]
    UnknownOverflowPolicy(String),

    /// Value shape cannot be measured by the sizer
    #[error("Unsupported value for memory accounting: {0}")]
    UnsupportedValue(String),

    /// Store was built outside a tokio runtime
    #[error("A tokio runtime is required to run the expiration sweep")]
    RuntimeUnavailable,

    /// Configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_message() {
        let err = CacheError::OutOfMemory {
            requested: 1026,
            usage: 0,
            max_memory: 500,
        };
        assert_eq!(
            err.to_string(),
            "Out of max memory: write needs 1026 bytes, 0 of 500 in use"
        );
    }

    #[test]
    fn test_invalid_max_memory_message() {
        let err = CacheError::InvalidMaxMemory {
            requested: 10,
            system_total: 5,
        };
        assert!(err.to_string().contains("exceeds system total of 5 bytes"));
    }
}

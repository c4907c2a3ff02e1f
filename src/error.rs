//! Error types for benchmark runs.
//!
//! Every variant is fatal to a single invocation: the binary reports it on
//! stderr and exits with status 1 without printing a result line.

use thiserror::Error;

/// Errors that can occur while configuring or running a benchmark.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BenchError {
    /// A numeric argument is outside its permitted range.
    #[error("Constraint violation: {message}")]
    Constraint {
        /// Human-readable error message.
        message: String,
    },
    /// The requested kernel variant does not exist.
    #[error("unknown variant {name} (expected one of: single, collapse, blocked)")]
    InvalidVariant {
        /// The name that failed to parse.
        name: String,
    },
    /// Memory allocation failed.
    #[error(
        "Memory allocation failed: {message} (requested {requested_size} bytes with {requested_alignment} byte alignment)"
    )]
    Allocation {
        /// The size that was requested to be allocated.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Size or alignment could not form a valid allocation layout.
    #[error("Invalid memory layout: {message} (size: {size}, alignment: {alignment})")]
    Layout {
        /// The size parameter that caused the error.
        size: usize,
        /// The alignment parameter that caused the error.
        alignment: usize,
        /// Human-readable error message.
        message: String,
    },
    /// The worker pool could not be started.
    #[error("Thread pool error: {message}")]
    ThreadPool {
        /// Human-readable error message.
        message: String,
    },
}

/// Result type alias for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Creates a constraint violation.
pub fn constraint_error(message: impl Into<String>) -> BenchError {
    BenchError::Constraint {
        message: message.into(),
    }
}

/// Creates an unknown-variant error.
pub fn invalid_variant(name: impl Into<String>) -> BenchError {
    BenchError::InvalidVariant { name: name.into() }
}

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> BenchError {
    BenchError::Allocation {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}

/// Creates a layout error.
pub fn layout_error(size: usize, alignment: usize, message: impl Into<String>) -> BenchError {
    BenchError::Layout {
        size,
        alignment,
        message: message.into(),
    }
}

/// Creates a thread pool error.
pub fn thread_pool_error(message: impl Into<String>) -> BenchError {
    BenchError::ThreadPool {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_error_display() {
        let error = allocation_error(1024, 64, "out of memory");
        let display = format!("{}", error);
        assert!(display.contains("Memory allocation failed"));
        assert!(display.contains("1024 bytes"));
        assert!(display.contains("64 byte alignment"));
        assert!(display.contains("out of memory"));
    }

    #[test]
    fn test_layout_error_display() {
        let error = layout_error(usize::MAX, 64, "size overflows isize");
        let display = format!("{}", error);
        assert!(display.contains("Invalid memory layout"));
        assert!(display.contains("alignment: 64"));
        assert!(display.contains("size overflows isize"));
    }

    #[test]
    fn test_constraint_error_display() {
        let error = constraint_error("n>0, repeats>0");
        assert_eq!(format!("{}", error), "Constraint violation: n>0, repeats>0");
    }

    #[test]
    fn test_invalid_variant_display() {
        let error = invalid_variant("badvariant");
        let display = format!("{}", error);
        assert!(display.contains("unknown variant badvariant"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(constraint_error("a"), constraint_error("a"));
        assert_ne!(constraint_error("a"), thread_pool_error("a"));
    }
}

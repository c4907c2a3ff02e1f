//! Benchmark harness for dense `f64` matrix multiplication under shared-memory
//! parallelism.
//!
//! Three parallel strategies compute `C += A * B` over the same row-major
//! layout and are timed against each other, while a sequential i-k-j kernel
//! provides the ground truth for a relative L2 error check.
//!
//! ```
//! use parmatmul::bench::{Bench, BenchConfig};
//! use parmatmul::matmul::Variant;
//!
//! let config = BenchConfig::new(Variant::Blocked, 32, 8, 2).unwrap();
//! let report = Bench::new(config).unwrap().run().unwrap();
//! assert!(report.relative_error < 1e-9);
//! ```

pub mod bench;
pub mod error;
pub mod exec;
pub mod matmul;
pub mod matrix;
pub mod report;
pub mod utils;

/// Alignment of every matrix buffer, one cache line.
pub const CACHE_LINE: usize = 64;

/// Tile side used by the blocked kernel when none (or a non-positive one) is given.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Scale factor for the generated inputs.
pub const INPUT_SCALE: f64 = 1.0;

pub use error::{BenchError, Result};

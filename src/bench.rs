//! Benchmark driver.
//!
//! One run goes through a fixed sequence of phases: generate A and B, compute
//! the sequential reference, warm up, then `repeats` times zero C, run the
//! selected kernel and record the elapsed time. Timings and the relative
//! error against the reference are then folded into a [`BenchReport`].

use std::hint::black_box;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{constraint_error, Result};
use crate::exec::{Executor, PoolExecutor};
use crate::matmul::{matmul_reference, run_variant, Variant};
use crate::matrix::Matrix;
use crate::{DEFAULT_BLOCK_SIZE, INPUT_SCALE};

/// Immutable description of one benchmark invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchConfig {
    pub variant: Variant,
    pub n: usize,
    /// Tile side for [`Variant::Blocked`]; carried but unused by the others.
    pub block_size: usize,
    pub repeats: usize,
    /// Worker count; `None` leaves it to the runtime default.
    pub threads: Option<usize>,
    /// Compare against the reference after every repeat instead of only the last.
    pub check_every_repeat: bool,
}

impl BenchConfig {
    /// Validates raw (signed) values.
    ///
    /// # Errors
    ///
    /// `Constraint` if `n <= 0` or `repeats <= 0`. A non-positive
    /// `block_size` is not an error; it becomes [`DEFAULT_BLOCK_SIZE`].
    pub fn new(variant: Variant, n: i64, block_size: i64, repeats: i64) -> Result<Self> {
        let (n, repeats) = validate_sizes(n, repeats)?;
        let block_size = if block_size <= 0 {
            warn!("block size {block_size} is not positive, using {DEFAULT_BLOCK_SIZE}");
            DEFAULT_BLOCK_SIZE
        } else {
            usize::try_from(block_size)
                .map_err(|_| constraint_error(format!("block size {block_size} too large")))?
        };

        Ok(BenchConfig {
            variant,
            n,
            block_size,
            repeats,
            threads: None,
            check_every_repeat: false,
        })
    }

    /// Like [`BenchConfig::new`] with the variant still unparsed.
    ///
    /// Sizes are checked first, then the variant name, so nothing is ever
    /// allocated for a configuration that cannot run.
    pub fn from_args(variant: &str, n: i64, block_size: i64, repeats: i64) -> Result<Self> {
        validate_sizes(n, repeats)?;
        BenchConfig::new(variant.parse()?, n, block_size, repeats)
    }

    /// Fixes the worker count.
    ///
    /// # Errors
    ///
    /// `Constraint` for `Some(0)`.
    pub fn with_threads(mut self, threads: Option<usize>) -> Result<Self> {
        if threads == Some(0) {
            return Err(constraint_error("threads must be positive"));
        }
        self.threads = threads;
        Ok(self)
    }

    pub fn with_check_every_repeat(mut self, check: bool) -> Self {
        self.check_every_repeat = check;
        self
    }

    /// Floating-point operations in one `n x n x n` multiply: one mul and one add per inner step.
    pub fn flops(&self) -> f64 {
        let n = self.n as f64;
        2.0 * n * n * n
    }
}

fn validate_sizes(n: i64, repeats: i64) -> Result<(usize, usize)> {
    if n <= 0 || repeats <= 0 {
        return Err(constraint_error("n>0, repeats>0"));
    }
    let n = usize::try_from(n).map_err(|_| constraint_error(format!("n={n} too large")))?;
    let repeats = usize::try_from(repeats)
        .map_err(|_| constraint_error(format!("repeats={repeats} too large")))?;
    Ok((n, repeats))
}

/// Per-repeat elapsed times, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingStats {
    samples: Vec<f64>,
}

impl TimingStats {
    pub fn with_capacity(repeats: usize) -> Self {
        TimingStats {
            samples: Vec::with_capacity(repeats),
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples.push(elapsed.as_secs_f64());
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Fastest repeat, or `0.0` with no samples.
    pub fn best(&self) -> f64 {
        self.samples
            .iter()
            .copied()
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Arithmetic mean, or `0.0` with no samples.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

/// Throughput in GFLOP/s for `flops` operations taking `seconds`.
///
/// Zero when `seconds` is not positive.
pub fn gflops(flops: f64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        flops / seconds * 1e-9
    } else {
        0.0
    }
}

/// Outcome of one benchmark invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub variant: Variant,
    /// Workers the parallel regions actually ran on.
    pub threads: usize,
    pub n: usize,
    pub block_size: usize,
    pub timings: TimingStats,
    pub mean_seconds: f64,
    pub best_seconds: f64,
    /// Derived from the mean time.
    pub gflops: f64,
    /// Relative L2 error of the final repeat, or the worst repeat when every
    /// repeat is checked.
    pub relative_error: f64,
}

/// A configured benchmark bound to an executor.
pub struct Bench<E: Executor = PoolExecutor> {
    config: BenchConfig,
    exec: E,
}

impl Bench<PoolExecutor> {
    /// Builds the worker pool described by `config.threads`.
    pub fn new(config: BenchConfig) -> Result<Self> {
        let exec = PoolExecutor::new(config.threads)?;
        Ok(Bench { config, exec })
    }
}

impl<E: Executor> Bench<E> {
    pub fn with_executor(config: BenchConfig, exec: E) -> Self {
        Bench { config, exec }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Runs the whole measurement protocol.
    ///
    /// # Errors
    ///
    /// `Allocation`/`Layout` if any of the four matrices cannot be allocated;
    /// matrices allocated before the failing one are dropped on return.
    pub fn run(&self) -> Result<BenchReport> {
        let cfg = &self.config;
        let n = cfg.n;

        if cfg.variant != Variant::Blocked {
            debug!("block size {} ignored by {}", cfg.block_size, cfg.variant);
        }

        debug!("allocating 4 matrices of {n}x{n}");
        let mut a = Matrix::zeros(n)?;
        let mut b = Matrix::zeros(n)?;
        let mut c = Matrix::zeros(n)?;
        let mut reference = Matrix::zeros(n)?;

        debug!("generating inputs");
        a.fill_pattern(INPUT_SCALE);
        b.fill_pattern(INPUT_SCALE);

        debug!("computing sequential reference");
        matmul_reference(&a, &b, &mut reference);

        // Touch both inputs so first-touch cost stays out of repeat 0.
        black_box(a.as_slice()[0] + b.as_slice()[0]);

        let mut timings = TimingStats::with_capacity(cfg.repeats);
        let mut worst_error = 0.0f64;
        for r in 0..cfg.repeats {
            c.fill_zero();
            let start = Instant::now();
            run_variant(cfg.variant, &self.exec, &a, &b, &mut c, cfg.block_size);
            let elapsed = start.elapsed();
            timings.record(elapsed);
            debug!("repeat {r}: {:.6}s", elapsed.as_secs_f64());

            if cfg.check_every_repeat {
                let err = c.relative_error(&reference);
                debug!("repeat {r}: relative error {err:.3e}");
                worst_error = worst_error.max(err);
            }
        }

        let relative_error = if cfg.check_every_repeat {
            worst_error
        } else {
            c.relative_error(&reference)
        };
        let threads = self.exec.workers();
        let mean_seconds = timings.mean();
        let best_seconds = timings.best();
        let gflops = gflops(cfg.flops(), mean_seconds);

        info!(
            "{} n={} threads={}: best {:.6}s, mean {:.6}s, {:.3} GFLOP/s, rel err {:.3e}",
            cfg.variant, n, threads, best_seconds, mean_seconds, gflops, relative_error
        );

        Ok(BenchReport {
            variant: cfg.variant,
            threads,
            n,
            block_size: cfg.block_size,
            timings,
            mean_seconds,
            best_seconds,
            gflops,
            relative_error,
        })
    }
}

//! Fork-join execution with static chunking.
//!
//! Kernels describe *what* each piece of the iteration space does; an
//! [`Executor`] decides *where* it runs. Partitioning is always fixed before
//! the parallel region starts: the iteration space is cut into
//! [`Executor::workers`] equal contiguous chunks and nothing is rebalanced.
//!
//! Output is handed to workers as disjoint mutable slices, so no two workers
//! ever write the same element of `C`.

use std::ops::Range;

use num::integer::div_ceil;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{constraint_error, thread_pool_error, Result};

/// A fork-join runtime that can run statically partitioned loops.
///
/// Implementors provide the worker count and a single fork-join primitive;
/// the two loop shapes the kernels need are built on top of it.
pub trait Executor: Sync {
    /// Number of workers one parallel region is split across.
    fn workers(&self) -> usize;

    /// Calls `f` once for every task and returns when all calls have finished.
    fn fork_join<T, F>(&self, tasks: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send;

    /// Parallel-for over the rows of `out`, statically chunked.
    ///
    /// `out` is viewed as consecutive rows of `row_len` elements. Each worker
    /// gets one contiguous run of rows and `body(first_row, rows)` is called
    /// once per run, where `rows` holds the run's elements.
    fn for_rows<F>(&self, out: &mut [f64], row_len: usize, body: F)
    where
        F: Fn(usize, &mut [f64]) + Sync + Send,
    {
        if out.is_empty() || row_len == 0 {
            return;
        }
        let rows = div_ceil(out.len(), row_len);
        let chunk_rows = div_ceil(rows, self.workers().max(1));

        let mut tasks: Vec<RowTask<'_>> = out
            .chunks_mut(chunk_rows * row_len)
            .enumerate()
            .map(|(w, rows)| RowTask {
                first_row: w * chunk_rows,
                rows,
            })
            .collect();

        self.fork_join(&mut tasks, |task| body(task.first_row, &mut *task.rows));
    }

    /// Parallel-for over the flattened `outer x inner` space, statically chunked.
    ///
    /// `out` is viewed as `outer` consecutive bands of `band_len` elements (the
    /// last band may be shorter). `body(o, inner_range, band)` accumulates the
    /// contribution of iterations `(o, inner_range)` into `band`.
    ///
    /// A band is written in place by the worker whose chunk contains its first
    /// iteration `(o, 0)`. A chunk that starts in the middle of a band adds
    /// into a private zeroed copy instead, which is summed into `out` after
    /// the join, in chunk order. `body` must therefore only accumulate.
    fn for_collapsed<F>(&self, out: &mut [f64], band_len: usize, outer: usize, inner: usize, body: F)
    where
        F: Fn(usize, Range<usize>, &mut [f64]) + Sync + Send,
    {
        if out.is_empty() || band_len == 0 || outer == 0 || inner == 0 {
            return;
        }
        debug_assert_eq!(div_ceil(out.len(), band_len), outer);

        let total_len = out.len();
        let mut bands = out.chunks_mut(band_len);
        let mut tasks: Vec<CollapsedTask<'_>> = plan_collapsed(outer, inner, self.workers())
            .into_iter()
            .map(|plan| {
                let owned: Vec<&mut [f64]> = bands.by_ref().take(plan.owned.len()).collect();
                let spill = plan.spill.map(|band| {
                    let len = band_len.min(total_len - band * band_len);
                    vec![0.0; len]
                });
                CollapsedTask { plan, owned, spill }
            })
            .collect();

        self.fork_join(&mut tasks, |task| {
            let plan = &task.plan;
            if let (Some(band), Some(buf)) = (plan.spill, task.spill.as_mut()) {
                body(band, plan.inner_range(band, inner), buf.as_mut_slice());
            }
            for (band, dst) in plan.owned.clone().zip(task.owned.iter_mut()) {
                body(band, plan.inner_range(band, inner), &mut **dst);
            }
        });

        let spills: Vec<(usize, Vec<f64>)> = tasks
            .into_iter()
            .filter_map(|task| task.plan.spill.zip(task.spill))
            .collect();
        for (band, buf) in spills {
            let start = band * band_len;
            out[start..start + buf.len()]
                .iter_mut()
                .zip(&buf)
                .for_each(|(c, s)| *c += s);
        }
    }
}

struct RowTask<'a> {
    first_row: usize,
    rows: &'a mut [f64],
}

struct CollapsedTask<'a> {
    plan: ChunkPlan,
    owned: Vec<&'a mut [f64]>,
    spill: Option<Vec<f64>>,
}

/// One worker's share of a flattened `outer x inner` iteration space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Flat iteration indices `o * inner + k` covered by this chunk.
    pub iters: Range<usize>,
    /// Band whose first iteration belongs to an earlier chunk.
    pub spill: Option<usize>,
    /// Bands whose first iteration belongs to this chunk.
    pub owned: Range<usize>,
}

impl ChunkPlan {
    /// The inner indices of band `band` that fall inside this chunk.
    pub fn inner_range(&self, band: usize, inner: usize) -> Range<usize> {
        let start = band * inner;
        let lo = self.iters.start.max(start) - start;
        let hi = self.iters.end.min(start + inner) - start;
        lo..hi
    }
}

/// Cuts `outer * inner` iterations into at most `workers` equal contiguous chunks.
pub fn plan_collapsed(outer: usize, inner: usize, workers: usize) -> Vec<ChunkPlan> {
    let total = outer * inner;
    if total == 0 {
        return Vec::new();
    }
    let chunk = div_ceil(total, workers.max(1));

    (0..total)
        .step_by(chunk)
        .map(|lo| {
            let hi = (lo + chunk).min(total);
            let spill = (lo % inner != 0).then_some(lo / inner);
            ChunkPlan {
                iters: lo..hi,
                spill,
                owned: div_ceil(lo, inner)..div_ceil(hi, inner),
            }
        })
        .collect()
}

/// Executor backed by a dedicated rayon pool.
///
/// The pool lives as long as the executor; every loop call is one
/// fork-join region inside [`ThreadPool::install`].
pub struct PoolExecutor {
    pool: ThreadPool,
}

impl PoolExecutor {
    /// Builds a pool with `threads` workers, or rayon's default size for `None`
    /// (which honours `RAYON_NUM_THREADS`).
    pub fn new(threads: Option<usize>) -> Result<Self> {
        if threads == Some(0) {
            return Err(constraint_error("threads must be positive"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|i| format!("matmul-worker-{i}"))
            .build()
            .map_err(|e| thread_pool_error(e.to_string()))?;
        Ok(PoolExecutor { pool })
    }
}

impl Executor for PoolExecutor {
    fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn fork_join<T, F>(&self, tasks: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        self.pool
            .install(|| tasks.par_iter_mut().with_max_len(1).for_each(|task| f(task)));
    }
}

/// Runs every chunk on the calling thread, in order.
///
/// Partitioning still follows `workers`, which makes chunk boundaries (and
/// the spill path of [`Executor::for_collapsed`]) reproducible in tests
/// without spawning threads.
#[derive(Debug, Clone, Copy)]
pub struct SequentialExecutor {
    workers: usize,
}

impl SequentialExecutor {
    pub fn new() -> Self {
        SequentialExecutor { workers: 1 }
    }

    pub fn with_workers(workers: usize) -> Self {
        SequentialExecutor {
            workers: workers.max(1),
        }
    }
}

impl Default for SequentialExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for SequentialExecutor {
    fn workers(&self) -> usize {
        self.workers
    }

    fn fork_join<T, F>(&self, tasks: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        tasks.iter_mut().for_each(f);
    }
}

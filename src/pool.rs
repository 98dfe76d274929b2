//! The minimal worker-pool capability consumed by the parser.

/// A thread-pool-like capability: run a task once per worker and join.
///
/// The parser partitions its output slots by worker index, so the only
/// requirement on an implementation is that every worker index in
/// `0..workers()` runs the task exactly once before `broadcast`
/// returns.
pub trait TaskPool {
    /// The number of workers tasks are fanned out to.
    fn workers(&self) -> usize;

    /// Runs `task` once per worker, passing the worker index,
    /// and joins all workers.
    fn broadcast(&self, task: &(dyn Fn(usize) + Sync));
}

/// A dependency-free pool that spawns scoped threads per broadcast.
#[derive(Clone, Copy, Debug)]
pub struct ScopedPool {
    workers: usize,
}

impl ScopedPool {
    /// Creates a pool with the given worker count (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl TaskPool for ScopedPool {
    fn workers(&self) -> usize {
        self.workers
    }

    fn broadcast(&self, task: &(dyn Fn(usize) + Sync)) {
        std::thread::scope(|scope| {
            for worker in 1..self.workers {
                scope.spawn(move || task(worker));
            }
            task(0);
        });
    }
}

impl TaskPool for rayon::ThreadPool {
    fn workers(&self) -> usize {
        self.current_num_threads()
    }

    fn broadcast(&self, task: &(dyn Fn(usize) + Sync)) {
        rayon::ThreadPool::broadcast(self, |ctx| task(ctx.index()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn scoped_pool_runs_every_worker() {
        let pool = ScopedPool::new(4);
        let seen = AtomicUsize::new(0);
        pool.broadcast(&|worker| {
            seen.fetch_or(1 << worker, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 0b1111);
    }

    #[test]
    fn zero_workers_is_clamped() {
        let pool = ScopedPool::new(0);
        assert_eq!(pool.workers(), 1);
    }
}

//! Backend that runs a blocking loader on a private, bounded [`rayon`] pool.
//!
//! Each [`LoadRequest`] is moved onto a worker and resolved from there, so
//! completions reach the cycler through its channel in whatever order the
//! workers finish.  The pool is capped at [`ThreadedBackend::threads`]
//! workers; excess requests queue inside rayon instead of spawning OS
//! threads.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use bevy::log::trace;

use crate::{
    backend::{AssetBackend, LoadRequest},
    error::{CyclerError, LoadError},
    key::ResourceKey,
};

type Loader<R> = dyn Fn(ResourceKey) -> Result<R, LoadError> + Send + Sync;

/// [`AssetBackend`] that calls a blocking loader on its own worker threads.
pub struct ThreadedBackend<R> {
    pool: rayon::ThreadPool,
    loader: Arc<Loader<R>>,
    threads: usize,
}

impl<R: Send + 'static> ThreadedBackend<R> {
    /// Build a backend with `threads` workers calling `loader` per key.
    pub fn new<F>(threads: usize, loader: F) -> Result<Self, CyclerError>
    where
        F: Fn(ResourceKey) -> Result<R, LoadError> + Send + Sync + 'static,
    {
        let threads = threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("resource-load-{i}"))
            .build()?;
        Ok(Self {
            pool,
            loader: Arc::new(loader),
            threads,
        })
    }

    /// Worker count of the private pool.
    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl<R: Send + 'static> AssetBackend for ThreadedBackend<R> {
    type Resource = R;

    fn request_load(&mut self, request: LoadRequest<R>) {
        let loader = Arc::clone(&self.loader);
        self.pool.spawn(move || {
            let key = request.key();
            // A panicking loader must still resolve, or the request would
            // count as in flight forever.
            let result = catch_unwind(AssertUnwindSafe(|| loader(key)))
                .unwrap_or(Err(LoadError::WorkerPanicked { key }));
            request.resolve(result);
        });
    }

    fn release(&mut self, resource: R) {
        drop(resource);
    }

    fn reclaim_unused(&mut self) {
        trace!("threaded backend holds no cache; nothing to reclaim");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{config::CyclerConfig, cycler::ResourceCycler};

    fn config() -> CyclerConfig {
        CyclerConfig {
            universe_size: 8,
            admission_range: (6, 6),
            display_slot_count: 4,
            cycle_interval: 1_000,
            seed: Some(3),
        }
    }

    /// Drain until nothing is in flight or the deadline passes.
    fn settle<B, D>(cycler: &mut ResourceCycler<B, D>)
    where
        B: AssetBackend,
        D: crate::backend::DisplaySink<B::Resource>,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        while cycler.stats().in_flight() > 0 && Instant::now() < deadline {
            cycler.drain_completions();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn worker_completions_reach_the_pool() {
        let backend =
            ThreadedBackend::new(2, |key: ResourceKey| Ok(key.index() * 10)).unwrap();
        let mut cycler = ResourceCycler::new(config(), backend, ()).unwrap();
        cycler.tick();
        settle(&mut cycler);

        let stats = cycler.stats();
        assert_eq!(stats.in_flight(), 0);
        assert_eq!(stats.admitted + stats.duplicates, 6);
        for (key, value) in cycler.resident() {
            assert_eq!(*value, key.index() * 10);
        }
    }

    #[test]
    fn odd_keys_fail_without_surfacing() {
        let backend = ThreadedBackend::new(2, |key: ResourceKey| {
            if key.index() % 2 == 1 {
                Err(LoadError::NotFound { key })
            } else {
                Ok(key)
            }
        })
        .unwrap();
        let mut cycler = ResourceCycler::new(config(), backend, ()).unwrap();
        cycler.tick();
        settle(&mut cycler);

        assert!(cycler.resident_keys().iter().all(|k| k.index() % 2 == 0));
        assert_eq!(cycler.stats().in_flight(), 0);
    }

    #[test]
    fn panicking_loader_resolves_as_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let backend = ThreadedBackend::new(1, move |key: ResourceKey| -> Result<u32, LoadError> {
            counter.fetch_add(1, Ordering::Relaxed);
            panic!("loader exploded on {key}");
        })
        .unwrap();
        let mut cycler = ResourceCycler::new(config(), backend, ()).unwrap();
        cycler.tick();
        settle(&mut cycler);

        assert_eq!(calls.load(Ordering::Relaxed), 6);
        assert_eq!(cycler.stats().failed, 6);
        assert_eq!(cycler.resident_len(), 0);
    }

    #[test]
    fn zero_threads_rounds_up() {
        let backend = ThreadedBackend::new(0, |key: ResourceKey| Ok(key)).unwrap();
        assert_eq!(backend.threads(), 1);
    }
}

//! Collaborator seams: asset backend, display sink, and random source.
//!
//! A backend receives a [`LoadRequest`] per admitted key and resolves it
//! whenever the load finishes, from any thread.  Resolution pushes a
//! [`Completion`] onto the cycler's channel; the cycler drains that channel
//! on its own thread, so the backend never touches residency state.

use std::sync::mpsc;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{error::LoadError, key::ResourceKey};

/// Identifies which cycle a load was issued in.
///
/// Every [`evict_all`](crate::ResourceCycler::evict_all) advances the
/// generation, so a completion carrying an older one is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    /// Key being loaded.
    pub key: ResourceKey,
    /// Cycler generation at the time the load was requested.
    pub generation: u64,
}

/// A resolved load, as queued for the cycler.
#[derive(Debug)]
pub struct Completion<R> {
    /// Ticket of the originating request.
    pub ticket: LoadTicket,
    /// Loaded resource, or why the load failed.
    pub result: Result<R, LoadError>,
}

/// An in-flight load handed to an [`AssetBackend`].
///
/// Consumed by [`resolve`](Self::resolve).  Dropping a request without
/// resolving it is allowed; the load then never contributes to the pool.
#[derive(Debug)]
pub struct LoadRequest<R> {
    ticket: LoadTicket,
    tx: mpsc::Sender<Completion<R>>,
}

impl<R> LoadRequest<R> {
    pub(crate) fn new(ticket: LoadTicket, tx: mpsc::Sender<Completion<R>>) -> Self {
        Self { ticket, tx }
    }

    /// Key to load.
    pub fn key(&self) -> ResourceKey {
        self.ticket.key
    }

    /// Key and generation this request was issued with.
    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    /// Deliver the outcome to the cycler.
    ///
    /// If the cycler has already been dropped the result is discarded.
    pub fn resolve(self, result: Result<R, LoadError>) {
        self.tx
            .send(Completion {
                ticket: self.ticket,
                result,
            })
            .ok();
    }
}

/// Source of loadable resources.
pub trait AssetBackend {
    /// Loaded resource type, owned by the pool while resident.
    type Resource;

    /// Start loading `request.key()`.  Must not block on the load itself.
    fn request_load(&mut self, request: LoadRequest<Self::Resource>);

    /// Take back ownership of a resource the pool no longer holds.
    fn release(&mut self, resource: Self::Resource);

    /// Advisory hint that unreferenced resources may be reclaimed now.
    fn reclaim_unused(&mut self) {}
}

/// Presentation target for resident resources.
pub trait DisplaySink<R> {
    /// Associate `resource` with `slot`.  Called every tick, usually with an
    /// unchanged resource, so implementations should make repeats cheap.
    fn bind(&mut self, slot: usize, resource: &R);
}

/// Sink that discards every binding; useful when only churn matters.
impl<R> DisplaySink<R> for () {
    fn bind(&mut self, _slot: usize, _resource: &R) {}
}

/// Random choices made during admission.
pub trait AdmissionSampler {
    /// Batch size, uniform in `[low, high]`.
    fn batch_size(&mut self, low: usize, high: usize) -> usize;

    /// Key, uniform in `[0, universe_size)`, drawn with replacement.
    fn key(&mut self, universe_size: u32) -> ResourceKey;
}

/// [`AdmissionSampler`] backed by any [`rand::Rng`].
#[derive(Clone, Debug)]
pub struct RandomSampler<R = StdRng>(pub R);

impl RandomSampler<StdRng> {
    /// Seeded from `seed`, or from the OS when `None`.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_os_rng()),
        }
    }
}

impl<R: Rng> AdmissionSampler for RandomSampler<R> {
    fn batch_size(&mut self, low: usize, high: usize) -> usize {
        self.0.random_range(low..=high)
    }

    fn key(&mut self, universe_size: u32) -> ResourceKey {
        ResourceKey(self.0.random_range(0..universe_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_sampler_stays_in_bounds() {
        let mut sampler = RandomSampler::from_seed(Some(42));
        for _ in 0..1_000 {
            let k = sampler.batch_size(20, 50);
            assert!((20..=50).contains(&k), "batch size {k} out of range");
            let key = sampler.key(200);
            assert!(key.index() < 200, "key {key} out of universe");
        }
    }

    #[test]
    fn degenerate_range_is_exact() {
        let mut sampler = RandomSampler::from_seed(Some(7));
        for _ in 0..32 {
            assert_eq!(sampler.batch_size(2, 2), 2);
            assert_eq!(sampler.key(1), ResourceKey(0));
        }
    }

    #[test]
    fn resolve_after_receiver_dropped_is_silent() {
        let (tx, rx) = mpsc::channel::<Completion<u32>>();
        drop(rx);
        let request = LoadRequest::new(
            LoadTicket {
                key: ResourceKey(3),
                generation: 0,
            },
            tx,
        );
        request.resolve(Ok(3));
    }
}

//! The resource pool cycler.
//!
//! Holds a bounded set of resident resources drawn from a fixed key universe.
//! Every `cycle_interval` ticks the whole pool is evicted and a fresh random
//! batch is requested; every tick the resident set is projected onto the
//! display slots by position.
//!
//! Loads are fire-and-forget.  Backends resolve [`LoadRequest`]s onto an
//! [`mpsc`] channel and [`ResourceCycler::drain_completions`] applies them on
//! the cycler's thread, at the start of every tick.  A completion is dropped
//! when it failed, when its key is already resident, or when an eviction has
//! happened since it was issued.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError, mpsc},
};

use bevy::log::{debug, trace, warn};

use crate::{
    backend::{
        AdmissionSampler, AssetBackend, Completion, DisplaySink, LoadRequest, LoadTicket,
        RandomSampler,
    },
    config::CyclerConfig,
    error::CyclerError,
    key::ResourceKey,
    stats::{CompletionOutcome, CyclerStats},
};

/// Bounded pool of resources that is fully evicted and refilled with a random
/// batch every `cycle_interval` ticks.
///
/// `B` loads and releases resources, `D` presents them in display slots, and
/// `S` makes the random admission choices.  Drive it by calling
/// [`tick`](Self::tick) once per frame or fixed step.
pub struct ResourceCycler<B, D, S = RandomSampler>
where
    B: AssetBackend,
    D: DisplaySink<B::Resource>,
    S: AdmissionSampler,
{
    config: CyclerConfig,
    backend: B,
    sink: D,
    sampler: S,
    tick_count: u64,
    /// Advanced by every eviction; tickets from older generations are stale.
    generation: u64,
    /// Resident keys in completion order.
    order: Vec<ResourceKey>,
    resident: HashMap<ResourceKey, B::Resource>,
    /// Key last bound to each slot.  Not owning: may name an evicted key.
    slots: Vec<Option<ResourceKey>>,
    tx: mpsc::Sender<Completion<B::Resource>>,
    // Wrapped in Mutex so the cycler is Sync and can live in a Bevy Resource.
    rx: Mutex<mpsc::Receiver<Completion<B::Resource>>>,
    stats: CyclerStats,
}

impl<B, D> ResourceCycler<B, D>
where
    B: AssetBackend,
    D: DisplaySink<B::Resource>,
{
    /// Build a cycler whose random source is seeded from `config.seed`.
    pub fn new(config: CyclerConfig, backend: B, sink: D) -> Result<Self, CyclerError> {
        let sampler = RandomSampler::from_seed(config.seed);
        Self::with_sampler(config, backend, sink, sampler)
    }
}

impl<B, D, S> ResourceCycler<B, D, S>
where
    B: AssetBackend,
    D: DisplaySink<B::Resource>,
    S: AdmissionSampler,
{
    /// Build a cycler with an explicit random source.
    ///
    /// Fails with [`CyclerError::Config`] if `config` does not validate.
    pub fn with_sampler(
        config: CyclerConfig,
        backend: B,
        sink: D,
        sampler: S,
    ) -> Result<Self, CyclerError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            slots: vec![None; config.display_slot_count],
            config,
            backend,
            sink,
            sampler,
            tick_count: 0,
            generation: 0,
            order: Vec::new(),
            resident: HashMap::new(),
            tx,
            rx: Mutex::new(rx),
            stats: CyclerStats::default(),
        })
    }

    /// Advance one scheduling quantum.
    ///
    /// Drains completions, runs an evict/admit cycle when the tick count is a
    /// multiple of `cycle_interval` (including the very first tick), projects
    /// onto the display slots, and hints the backend to reclaim.
    pub fn tick(&mut self) {
        self.drain_completions();
        if self.tick_count % self.config.cycle_interval == 0 {
            self.evict_all();
            self.admit_batch();
            self.stats.cycles += 1;
        }
        self.project();
        self.backend.reclaim_unused();
        self.tick_count += 1;
        self.stats.ticks = self.tick_count;
    }

    /// Release every resident resource and empty the resident set.
    ///
    /// Loads still in flight become stale.  Returns the number evicted.
    pub fn evict_all(&mut self) -> usize {
        let evicted = self.order.len();
        for key in self.order.drain(..) {
            if let Some(resource) = self.resident.remove(&key) {
                self.backend.release(resource);
            }
        }
        self.generation += 1;
        self.stats.evicted += evicted as u64;
        self.stats.resident = 0;
        self.backend.reclaim_unused();
        debug!(
            "evicted {evicted} resources, generation now {}",
            self.generation
        );
        evicted
    }

    /// Request a random batch of keys and return how many loads were issued.
    ///
    /// Keys are drawn with replacement, so one batch may ask for the same key
    /// twice; the second arrival is discarded as a duplicate.
    pub fn admit_batch(&mut self) -> usize {
        let (low, high) = self.config.admission_range;
        let count = self.sampler.batch_size(low, high);
        for _ in 0..count {
            let ticket = LoadTicket {
                key: self.sampler.key(self.config.universe_size),
                generation: self.generation,
            };
            self.backend
                .request_load(LoadRequest::new(ticket, self.tx.clone()));
        }
        self.stats.requested += count as u64;
        debug!(
            "requested {count} loads for generation {}",
            self.generation
        );
        count
    }

    /// Bind slot `i` to the `i`-th resident resource for every slot that has
    /// one.  Slots past the resident count keep whatever they showed last.
    pub fn project(&mut self) {
        for (index, (key, slot)) in self.order.iter().zip(self.slots.iter_mut()).enumerate() {
            if let Some(resource) = self.resident.get(key) {
                self.sink.bind(index, resource);
                *slot = Some(*key);
                self.stats.last_bound = Some(*key);
            }
        }
    }

    /// Apply every queued completion.  Returns how many were drained.
    pub fn drain_completions(&mut self) -> usize {
        let mut drained = 0;
        while let Some(completion) = self.next_completion() {
            self.apply(completion);
            drained += 1;
        }
        self.stats.resident = self.order.len();
        drained
    }

    /// Release everything the pool owns and clear the slots.
    ///
    /// Also runs on drop.  Completions that arrive later are ignored.
    pub fn teardown(&mut self) {
        self.evict_all();
        self.drain_completions();
        self.slots.fill(None);
        self.stats.last_bound = None;
    }

    fn next_completion(&mut self) -> Option<Completion<B::Resource>> {
        self.rx
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    fn apply(&mut self, completion: Completion<B::Resource>) -> CompletionOutcome {
        let Completion { ticket, result } = completion;
        let outcome = match result {
            Err(e) => {
                warn!("load of key {} failed: {e}", ticket.key);
                CompletionOutcome::Failed
            }
            Ok(resource) if ticket.generation < self.generation => {
                self.backend.release(resource);
                CompletionOutcome::Stale
            }
            Ok(resource) if self.resident.contains_key(&ticket.key) => {
                self.backend.release(resource);
                CompletionOutcome::Duplicate
            }
            Ok(resource) => {
                self.resident.insert(ticket.key, resource);
                self.order.push(ticket.key);
                CompletionOutcome::Admitted
            }
        };
        trace!(
            "completion for key {} (generation {}): {outcome:?}",
            ticket.key, ticket.generation
        );
        self.stats.record(outcome);
        outcome
    }

    /// Configuration the cycler was built with.
    pub fn config(&self) -> &CyclerConfig {
        &self.config
    }

    /// Resident keys in completion order.
    pub fn resident_keys(&self) -> &[ResourceKey] {
        &self.order
    }

    /// Number of resident resources.
    pub fn resident_len(&self) -> usize {
        self.order.len()
    }

    /// `true` if `key` is currently resident.
    pub fn is_resident(&self, key: ResourceKey) -> bool {
        self.resident.contains_key(&key)
    }

    /// Resident resource for `key`, if any.
    pub fn get(&self, key: ResourceKey) -> Option<&B::Resource> {
        self.resident.get(&key)
    }

    /// Resident resources in completion order.
    pub fn resident(&self) -> impl Iterator<Item = (ResourceKey, &B::Resource)> {
        self.order
            .iter()
            .filter_map(|key| self.resident.get(key).map(|resource| (*key, resource)))
    }

    /// Key last bound to `slot`, which may no longer be resident.
    pub fn slot(&self, slot: usize) -> Option<ResourceKey> {
        self.slots.get(slot).copied().flatten()
    }

    /// Key last bound to each display slot, indexed by slot.
    pub fn slots(&self) -> &[Option<ResourceKey>] {
        &self.slots
    }

    /// Number of completed [`tick`](Self::tick) calls.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Eviction generation; advanced by every [`evict_all`](Self::evict_all).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Running counters since construction.
    pub fn stats(&self) -> &CyclerStats {
        &self.stats
    }

    /// The asset backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The asset backend, mutably (e.g. to poll it before a tick).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The display sink.
    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// The display sink, mutably.
    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }
}

impl<B, D, S> Drop for ResourceCycler<B, D, S>
where
    B: AssetBackend,
    D: DisplaySink<B::Resource>,
    S: AdmissionSampler,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

//! `bevy_texture_cycler` — a bounded, churning texture pool for stress-testing
//! asset streaming in Bevy.
//!
//! # Architecture
//! [`ResourceCycler`] is engine-agnostic.  It owns a small resident set drawn
//! from a fixed key universe, evicts the whole set every `cycle_interval`
//! ticks, requests a fresh random batch through an [`AssetBackend`], and
//! projects the resident set onto display slots through a [`DisplaySink`].
//! Loads complete asynchronously over a channel that the cycler drains at
//! the start of each tick.
//!
//! [`TextureCyclerPlugin`] wires it into Bevy with an [`AssetServer`]-backed
//! [`ImageBackend`](image::ImageBackend) and material-bound
//! [`DisplaySlot`]s.  [`ThreadedBackend`] runs any blocking loader on a
//! private rayon pool.
//!
//! [`AssetServer`]: bevy::asset::AssetServer

#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod cycler;
pub mod error;
pub mod image;
pub mod key;
pub mod stats;
pub mod streaming;
pub mod threaded;

pub use backend::{AdmissionSampler, AssetBackend, DisplaySink, LoadRequest, RandomSampler};
pub use config::CyclerConfig;
pub use cycler::ResourceCycler;
pub use error::{ConfigError, CyclerError, LoadError};
pub use image::TextureCyclerSettings;
pub use key::ResourceKey;
pub use stats::{CompletionOutcome, CyclerStats};
pub use streaming::{DisplaySlot, TextureCycler, apply_slot_bindings};
pub use threaded::ThreadedBackend;

use bevy::prelude::*;

/// Bevy plugin — builds the [`TextureCycler`] at startup and drives it every frame.
#[derive(Default)]
pub struct TextureCyclerPlugin {
    /// Inserted as a resource and used to build the cycler at startup.
    pub settings: TextureCyclerSettings,
}

impl Plugin for TextureCyclerPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .add_systems(Startup, streaming::init_texture_cycler)
            .add_systems(
                Update,
                (
                    streaming::tick_texture_cycler,
                    streaming::apply_slot_bindings,
                    streaming::log_cycler_status,
                )
                    .chain(),
            );
    }
}

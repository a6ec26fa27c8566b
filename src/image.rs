//! Bevy asset backend and display sink for [`Image`] textures.
//!
//! [`ImageBackend`] starts loads through the [`AssetServer`] and resolves
//! them once [`ImageBackend::poll`] sees them finish.  [`SlotBindings`]
//! records which image each display slot should show; the
//! [`apply_slot_bindings`](crate::apply_slot_bindings) system copies changed
//! bindings into the slot entities' materials.

use bevy::{
    asset::{AssetId, AssetServer, LoadState},
    image::Image,
    log::trace,
    prelude::{Handle, Resource},
};
use serde::{Deserialize, Serialize};

use crate::{
    backend::{AssetBackend, DisplaySink, LoadRequest},
    config::CyclerConfig,
    error::LoadError,
    key::ResourceKey,
};

/// Settings for the Bevy texture cycler.
///
/// Key `k` loads `"{folder}/{k}.{extension}"` relative to the asset root.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureCyclerSettings {
    /// Asset folder holding one file per key.
    pub folder: String,
    /// File extension, without the dot.
    pub extension: String,
    /// Parameters of the underlying cycler.
    pub cycler: CyclerConfig,
}

impl Default for TextureCyclerSettings {
    fn default() -> Self {
        Self {
            folder: "RandomTextures".into(),
            extension: "png".into(),
            cycler: CyclerConfig::default(),
        }
    }
}

impl TextureCyclerSettings {
    /// Asset path loaded for `key`.
    pub fn path_for(&self, key: ResourceKey) -> String {
        format!("{}/{}.{}", self.folder, key, self.extension)
    }
}

/// [`AssetBackend`] over Bevy's [`AssetServer`].
///
/// Resources are strong [`Handle<Image>`]s; releasing one drops it and Bevy
/// unloads the image once no other strong handle remains.
pub struct ImageBackend {
    asset_server: AssetServer,
    settings: TextureCyclerSettings,
    loading: Vec<(LoadRequest<Handle<Image>>, Handle<Image>)>,
}

impl ImageBackend {
    /// Backend loading through `asset_server` at paths from `settings`.
    pub fn new(asset_server: AssetServer, settings: TextureCyclerSettings) -> Self {
        Self {
            asset_server,
            settings,
            loading: Vec::new(),
        }
    }

    /// Resolve every load that has finished or failed since the last poll.
    ///
    /// Call once per frame before [`ResourceCycler::tick`](crate::ResourceCycler::tick).
    pub fn poll(&mut self) -> usize {
        let before = self.loading.len();
        let mut still_loading = Vec::with_capacity(before);
        for (request, handle) in self.loading.drain(..) {
            match self.asset_server.load_state(handle.id()) {
                LoadState::Loaded => request.resolve(Ok(handle)),
                LoadState::Failed(err) => {
                    request.resolve(Err(LoadError::Backend(err.to_string())));
                }
                _ => still_loading.push((request, handle)),
            }
        }
        self.loading = still_loading;
        before - self.loading.len()
    }

    /// Loads started but not yet resolved.
    pub fn loading(&self) -> usize {
        self.loading.len()
    }

    /// Settings used to build asset paths.
    pub fn settings(&self) -> &TextureCyclerSettings {
        &self.settings
    }
}

impl AssetBackend for ImageBackend {
    type Resource = Handle<Image>;

    fn request_load(&mut self, request: LoadRequest<Handle<Image>>) {
        let path = self.settings.path_for(request.key());
        let handle = self.asset_server.load::<Image>(path);
        self.loading.push((request, handle));
    }

    fn release(&mut self, resource: Handle<Image>) {
        drop(resource);
    }

    fn reclaim_unused(&mut self) {
        // Bevy frees an asset as soon as its last strong handle drops.
        trace!("{} image loads in flight", self.loading.len());
    }
}

/// [`DisplaySink`] that queues per-slot image changes for the ECS.
///
/// Repeated binds of the same image queue nothing.  The last image bound to
/// each slot is kept so slot entities spawned later can still be filled.
#[derive(Default)]
pub struct SlotBindings {
    bound: Vec<Option<Handle<Image>>>,
    changed: Vec<(usize, Handle<Image>)>,
}

impl SlotBindings {
    /// Sink with `count` unbound slots.
    pub fn with_slots(count: usize) -> Self {
        Self {
            bound: vec![None; count],
            changed: Vec::new(),
        }
    }

    /// Image id last bound to `slot`.
    pub fn bound(&self, slot: usize) -> Option<AssetId<Image>> {
        self.handle(slot).map(Handle::id)
    }

    /// Image last bound to `slot`, which may no longer be resident.
    pub fn handle(&self, slot: usize) -> Option<&Handle<Image>> {
        self.bound.get(slot).and_then(Option::as_ref)
    }

    /// Take the slot changes queued since the last call.
    pub fn take_changed(&mut self) -> Vec<(usize, Handle<Image>)> {
        std::mem::take(&mut self.changed)
    }
}

impl DisplaySink<Handle<Image>> for SlotBindings {
    fn bind(&mut self, slot: usize, resource: &Handle<Image>) {
        if slot >= self.bound.len() {
            self.bound.resize(slot + 1, None);
        }
        if self.bound[slot].as_ref().map(Handle::id) != Some(resource.id()) {
            self.bound[slot] = Some(resource.clone());
            self.changed.push((slot, resource.clone()));
        }
    }
}

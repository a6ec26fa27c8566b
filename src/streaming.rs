//! Bevy systems that drive a [`ResourceCycler`] of images every frame.
//!
//! # Usage
//! ```rust,ignore
//! app.add_plugins(TextureCyclerPlugin::default());
//!
//! // Any entity with a StandardMaterial becomes a display target.
//! commands.spawn((
//!     Mesh3d(cube),
//!     MeshMaterial3d(materials.add(StandardMaterial::default())),
//!     DisplaySlot(0),
//! ));
//! ```
//!
//! Each frame [`tick_texture_cycler`] polls the asset server, ticks the
//! cycler, and [`apply_slot_bindings`] writes changed slot images into the
//! `base_color_texture` of every matching [`DisplaySlot`] entity.  Slot
//! entities spawned later pick up the slot's last image on their first frame.

use std::collections::HashMap;

use bevy::{
    asset::{AssetServer, Assets},
    ecs::{
        component::Component,
        change_detection::{DetectChanges, Ref},
        system::{Commands, Local, Query, Res, ResMut},
    },
    log::{debug, error, info},
    pbr::{MeshMaterial3d, StandardMaterial},
    prelude::{Deref, DerefMut, Resource},
};

use crate::{
    cycler::ResourceCycler,
    image::{ImageBackend, SlotBindings, TextureCyclerSettings},
};

/// The cycler instance owned by the ECS world.
///
/// Dropping the resource (e.g. on app exit) releases every resident image.
#[derive(Resource, Deref, DerefMut)]
pub struct TextureCycler(pub ResourceCycler<ImageBackend, SlotBindings>);

/// Marks an entity whose material shows the display slot with this index.
///
/// Several entities may share a slot.  A slot past the resident count keeps
/// showing its last image until a later cycle rebinds it.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplaySlot(pub usize);

/// Startup system — builds the [`TextureCycler`] from [`TextureCyclerSettings`].
///
/// An invalid configuration is logged and leaves the cycler absent; the
/// per-frame systems then do nothing.
pub fn init_texture_cycler(
    mut commands: Commands,
    settings: Res<TextureCyclerSettings>,
    asset_server: Res<AssetServer>,
) {
    let settings = TextureCyclerSettings::clone(&settings);
    let config = settings.cycler.clone();
    let sink = SlotBindings::with_slots(config.display_slot_count);
    let backend = ImageBackend::new(AssetServer::clone(&asset_server), settings.clone());
    match ResourceCycler::new(config, backend, sink) {
        Ok(cycler) => {
            info!(
                "texture cycler streaming from '{}' ({} keys, {} slots)",
                settings.folder,
                settings.cycler.universe_size,
                settings.cycler.display_slot_count
            );
            commands.insert_resource(TextureCycler(cycler));
        }
        Err(e) => error!("Texture cycler disabled: {e}"),
    }
}

/// Bevy system — resolves finished image loads, then ticks the cycler.
pub fn tick_texture_cycler(cycler: Option<ResMut<TextureCycler>>) {
    let Some(mut cycler) = cycler else {
        return;
    };
    cycler.backend_mut().poll();
    cycler.tick();
}

/// Bevy system — copies slot images into slot materials.
///
/// Slots whose binding changed this frame are written to every matching
/// entity.  Entities that gained a [`DisplaySlot`] or a new material since the
/// last run receive the slot's current image even if the binding itself did
/// not change, which covers stale slots past the resident count.
pub fn apply_slot_bindings(
    cycler: Option<ResMut<TextureCycler>>,
    slots: Query<(Ref<DisplaySlot>, Ref<MeshMaterial3d<StandardMaterial>>)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(mut cycler) = cycler else {
        return;
    };
    let changed: HashMap<usize, _> = cycler.sink_mut().take_changed().into_iter().collect();
    for (slot, material) in &slots {
        let image = match changed.get(&slot.0) {
            Some(image) => image,
            None if slot.is_added() || material.is_changed() => {
                let Some(image) = cycler.sink().handle(slot.0) else {
                    continue;
                };
                image
            }
            None => continue,
        };
        if let Some(material) = materials.get_mut(&material.0) {
            material.base_color_texture = Some(image.clone());
        }
    }
}

/// Bevy system — logs the cycler's status line once per evict/admit cycle.
pub fn log_cycler_status(cycler: Option<Res<TextureCycler>>, mut last_cycle: Local<u64>) {
    let Some(cycler) = cycler else {
        return;
    };
    let stats = cycler.stats();
    if stats.cycles != *last_cycle {
        *last_cycle = stats.cycles;
        debug!("texture cycler {stats}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bevy::{
        app::App,
        asset::{AssetApp, AssetPlugin, Handle},
        ecs::entity::Entity,
        image::{CompressedImageFormats, Image, ImageLoader, ImagePlugin},
        prelude::MinimalPlugins,
    };

    use super::*;
    use crate::{CyclerConfig, TextureCyclerPlugin, TextureCyclerSettings};

    /// Two tiny PNGs live at `assets/cycler_test/{0,1}.png`.
    fn settings(folder: &str, universe_size: u32, admitted: usize) -> TextureCyclerSettings {
        TextureCyclerSettings {
            folder: folder.into(),
            extension: "png".into(),
            cycler: CyclerConfig {
                universe_size,
                admission_range: (admitted, admitted),
                display_slot_count: 2,
                cycle_interval: 100_000,
                seed: Some(1),
            },
        }
    }

    fn headless_app(settings: TextureCyclerSettings) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default(), ImagePlugin::default()))
            .init_asset::<StandardMaterial>()
            // Normally registered by the render plugin.
            .register_asset_loader(ImageLoader::new(CompressedImageFormats::NONE))
            .add_plugins(TextureCyclerPlugin { settings });
        app.finish();
        app.cleanup();
        app
    }

    fn spawn_slot(app: &mut App, slot: usize) -> Entity {
        let material = app
            .world_mut()
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());
        app.world_mut()
            .spawn((DisplaySlot(slot), MeshMaterial3d(material)))
            .id()
    }

    /// Run frames until `done` holds for the cycler or ten seconds pass.
    fn update_until(app: &mut App, done: impl Fn(&TextureCycler) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            app.update();
            if app.world().get_resource::<TextureCycler>().is_some_and(&done) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn texture_of(app: &App, entity: Entity) -> Option<Handle<Image>> {
        let material = app.world().get::<MeshMaterial3d<StandardMaterial>>(entity)?;
        app.world()
            .resource::<Assets<StandardMaterial>>()
            .get(&material.0)?
            .base_color_texture
            .clone()
    }

    fn slot_image(app: &App, slot: usize) -> Option<Handle<Image>> {
        let cycler = app.world().resource::<TextureCycler>();
        cycler.slot(slot).and_then(|key| cycler.get(key)).cloned()
    }

    #[test]
    fn loaded_images_reach_slot_materials() {
        let mut app = headless_app(settings("cycler_test", 2, 16));
        let first = spawn_slot(&mut app, 0);
        let second = spawn_slot(&mut app, 1);

        let settled = update_until(&mut app, |cycler| {
            cycler.resident_len() == 2 && cycler.stats().in_flight() == 0
        });
        assert!(settled, "both test images should load");

        let cycler = app.world().resource::<TextureCycler>();
        assert_eq!(cycler.backend().loading(), 0);
        assert_eq!(cycler.stats().failed, 0);
        for (entity, slot) in [(first, 0), (second, 1)] {
            let expected = slot_image(&app, slot).map(|h| h.id());
            assert!(expected.is_some(), "slot {slot} should be bound");
            assert_eq!(texture_of(&app, entity).map(|h| h.id()), expected);
        }
    }

    #[test]
    fn slot_spawned_after_binding_gets_current_image() {
        let mut app = headless_app(settings("cycler_test", 2, 16));
        spawn_slot(&mut app, 0);
        spawn_slot(&mut app, 1);
        assert!(update_until(&mut app, |cycler| cycler.resident_len() == 2));
        app.update();

        let late = spawn_slot(&mut app, 1);
        app.update();

        let expected = slot_image(&app, 1).map(|h| h.id());
        assert!(expected.is_some());
        assert_eq!(texture_of(&app, late).map(|h| h.id()), expected);
    }

    #[test]
    fn missing_image_counts_as_failed() {
        let mut app = headless_app(settings("cycler_test_missing", 1, 1));
        let slot = spawn_slot(&mut app, 0);

        let settled = update_until(&mut app, |cycler| cycler.stats().failed == 1);
        assert!(settled, "missing image should resolve as a failure");

        let cycler = app.world().resource::<TextureCycler>();
        assert_eq!(cycler.resident_len(), 0);
        assert_eq!(cycler.stats().in_flight(), 0);
        assert_eq!(cycler.backend().loading(), 0);
        assert_eq!(texture_of(&app, slot), None);
    }

    #[test]
    fn invalid_settings_leave_cycler_absent() {
        let mut app = headless_app(settings("cycler_test", 0, 1));
        app.update();
        app.update();
        assert!(app.world().get_resource::<TextureCycler>().is_none());
    }
}

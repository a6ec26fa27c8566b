//! `stress_grid` — a grid of cubes whose textures churn every second.
//!
//! Expects PNGs at `assets/RandomTextures/0.png ..= 199.png`.
//!
//! Run with:
//!   cargo run --example stress_grid

use bevy::prelude::*;
use bevy_texture_cycler::{DisplaySlot, TextureCyclerPlugin, TextureCyclerSettings};

const SPACING: f32 = 5.0;

fn main() {
    let settings = TextureCyclerSettings::default();
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "bevy_texture_cycler — stress grid".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(TextureCyclerPlugin { settings })
        .add_systems(Startup, spawn_grid)
        .run();
}

fn spawn_grid(
    mut commands: Commands,
    settings: Res<TextureCyclerSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let count = settings.cycler.display_slot_count;
    let rows = (count as f32).sqrt().ceil().max(1.0) as usize;
    let columns = count.div_ceil(rows);
    let cube = meshes.add(Cuboid::default());

    for slot in 0..count {
        let (row, col) = (slot / columns, slot % columns);
        commands.spawn((
            Mesh3d(cube.clone()),
            MeshMaterial3d(materials.add(StandardMaterial::default())),
            Transform::from_xyz(col as f32 * SPACING, 0.0, row as f32 * SPACING),
            DisplaySlot(slot),
        ));
    }

    let center = Vec3::new(
        (columns as f32 - 1.0) * SPACING * 0.5,
        0.0,
        (rows as f32 - 1.0) * SPACING * 0.5,
    );
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(center + Vec3::new(0.0, 1.0, 1.0) * rows as f32 * SPACING)
            .looking_at(center, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight::default(),
        Transform::from_xyz(0.0, 10.0, 0.0).looking_at(Vec3::new(0.3, 0.0, 0.2), Vec3::Y),
    ));
}

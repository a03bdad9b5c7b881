//! Mesh3d rendering for asteroids.
//!
//! Every asteroid whose [`AsteroidMesh`] was added or replaced (spawn, bite)
//! gets a fresh flat-shaded GPU mesh.  The entity transform is driven by
//! Rapier, and the mesh is in local space, so nothing else is needed here.

use crate::asteroid::{Asteroid, AsteroidMesh};
use crate::mesh::TriMesh;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::PrimitiveTopology;

pub struct AsteroidRenderingPlugin;

impl Plugin for AsteroidRenderingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PostUpdate, attach_asteroid_mesh_system);
    }
}

/// Attach or refresh the `Mesh3d` of asteroids whose geometry changed.
pub fn attach_asteroid_mesh_system(
    mut commands: Commands,
    query: Query<(Entity, &AsteroidMesh), (With<Asteroid>, Changed<AsteroidMesh>)>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, mesh) in query.iter() {
        if mesh.0.is_empty() {
            continue;
        }
        let material = materials.add(StandardMaterial {
            base_color: rock_color(entity.index()),
            perceptual_roughness: 0.95,
            ..Default::default()
        });
        commands.entity(entity).insert((
            Mesh3d(meshes.add(flat_shaded_mesh(&mesh.0))),
            MeshMaterial3d(material),
        ));
    }
}

/// De-indexed triangle list with per-face normals, so facets read as rock
/// rather than a smooth blob.
pub fn flat_shaded_mesh(mesh: &TriMesh) -> Mesh {
    let flat = mesh.to_flat_mesh();
    let positions: Vec<[f32; 3]> = flat.positions.iter().map(|p| p.to_array()).collect();
    let normals: Vec<[f32; 3]> = flat.normals.iter().map(|n| n.to_array()).collect();

    let mut out = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    out.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    out.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    out
}

/// Grey-brown rock tone seeded by the entity index.
///
/// Knuth multiplicative hash: deterministic per entity, visually distinct
/// between neighbours.
fn rock_color(seed: u32) -> Color {
    let h = seed.wrapping_mul(2_654_435_761).wrapping_add(0xDEAD_BEEF);
    let t = (h & 0xFFFF) as f32 / 65_535.0;

    let lum = 0.22 + t * 0.2;
    Color::srgb((lum + t * 0.05).min(1.0), lum, (lum - t * 0.04).max(0.0))
}

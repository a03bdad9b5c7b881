//! Plain-data payloads that cross the background-task boundary.
//!
//! Nothing in here references the ECS world: positions, rotations and meshes
//! are flattened into arrays so a task can be moved to another thread (or
//! serialized) without dragging live entities along.

use crate::error::{FractureError, FractureResult};
use crate::impact::{ImpactCause, ImpactRecord};
use crate::mesh::{FlatMesh, TriMesh};
use bevy::math::{EulerRot, Quat, Vec3};
use bevy::prelude::{Entity, Transform};
use serde::{Deserialize, Serialize};

/// Flatten vectors into `[x0, y0, z0, x1, ...]`.
pub fn flatten(points: &[Vec3]) -> Vec<f32> {
    points.iter().flat_map(|p| p.to_array()).collect()
}

/// Inverse of [`flatten`].  The array must hold whole triangles (a multiple of
/// nine floats).
pub fn unflatten(field: &'static str, floats: &[f32]) -> FractureResult<Vec<Vec3>> {
    if floats.len() % 9 != 0 {
        return Err(FractureError::MalformedPayload {
            field,
            len: floats.len(),
        });
    }
    Ok(floats
        .chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect())
}

fn decode_flat(positions: &[f32], normals: &[f32]) -> FractureResult<FlatMesh> {
    let positions = unflatten("positions", positions)?;
    let normals = unflatten("normals", normals)?;
    if normals.len() != positions.len() {
        return Err(FractureError::MalformedPayload {
            field: "normals",
            len: normals.len() * 3,
        });
    }
    Ok(FlatMesh { positions, normals })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactPayload {
    pub point: [f32; 3],
    pub velocity: [f32; 3],
    pub normal: Option<[f32; 3]>,
    pub cause: ImpactCause,
}

impl From<&ImpactRecord> for ImpactPayload {
    fn from(impact: &ImpactRecord) -> Self {
        Self {
            point: impact.point.to_array(),
            velocity: impact.velocity.to_array(),
            normal: impact.normal.map(|n| n.to_array()),
            cause: impact.cause,
        }
    }
}

impl From<&ImpactPayload> for ImpactRecord {
    fn from(payload: &ImpactPayload) -> Self {
        Self {
            point: Vec3::from_array(payload.point),
            velocity: Vec3::from_array(payload.velocity),
            normal: payload.normal.map(Vec3::from_array),
            cause: payload.cause,
        }
    }
}

/// Everything a split needs to know about its parent asteroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTask {
    /// `Entity::to_bits` of the parent.
    pub asteroid_id: u64,
    pub position: [f32; 3],
    /// Euler angles, XYZ order.
    pub rotation: [f32; 3],
    /// World-frame angular velocity at dispatch.
    pub angular_velocity: [f32; 3],
    pub diameter: f32,
    /// Flat local-space triangle list.
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    /// Seeds the crack noise and, carried into the result, the fragment spin.
    pub seed: u64,
    pub impact: ImpactPayload,
}

impl SplitTask {
    pub fn new(
        parent: Entity,
        transform: &Transform,
        angular_velocity: Vec3,
        diameter: f32,
        mesh: &TriMesh,
        impact: &ImpactRecord,
        seed: u64,
    ) -> Self {
        let (x, y, z) = transform.rotation.to_euler(EulerRot::XYZ);
        let flat = mesh.to_flat_mesh();
        Self {
            asteroid_id: parent.to_bits(),
            position: transform.translation.to_array(),
            rotation: [x, y, z],
            angular_velocity: angular_velocity.to_array(),
            diameter,
            positions: flatten(&flat.positions),
            normals: flatten(&flat.normals),
            seed,
            impact: ImpactPayload::from(impact),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn rotation(&self) -> Quat {
        let [x, y, z] = self.rotation;
        Quat::from_euler(EulerRot::XYZ, x, y, z)
    }

    pub fn impact(&self) -> ImpactRecord {
        ImpactRecord::from(&self.impact)
    }

    /// Decode the local-space mesh.
    pub fn mesh(&self) -> FractureResult<FlatMesh> {
        decode_flat(&self.positions, &self.normals)
    }
}

/// One half of a split, centred on its own bounding-box center.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FragmentPayload {
    /// Bounding-box center relative to the parent position, in the parent's
    /// orientation at dispatch time.
    pub offset: [f32; 3],
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
}

impl FragmentPayload {
    pub fn from_mesh(offset: Vec3, mesh: &FlatMesh) -> Self {
        Self {
            offset: offset.to_array(),
            positions: flatten(&mesh.positions),
            normals: flatten(&mesh.normals),
        }
    }

    pub fn offset(&self) -> Vec3 {
        Vec3::from_array(self.offset)
    }

    pub fn mesh(&self) -> FractureResult<FlatMesh> {
        decode_flat(&self.positions, &self.normals)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub asteroid_id: u64,
    /// Far fragment (subtraction) first, near fragment (intersection) second.
    pub fragments: [FragmentPayload; 2],
    pub impact_direction: [f32; 3],
    /// `atan2` of the impact direction in the XY play plane.
    pub impact_rotation: f32,
    pub seed: u64,
}

impl SplitResult {
    pub fn impact_direction(&self) -> Vec3 {
        Vec3::from_array(self.impact_direction)
    }
}

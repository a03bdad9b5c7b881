//! Destructible asteroids for a 3D arcade shooter.
//!
//! Asteroids are real triangle meshes.  A lethal hit cuts one in two along a
//! noisy crack with a CSG boolean on a background task; a lighter hit bites
//! a small crater out of it.  Boolean output is repaired (welded, T-junctions
//! split) so every fragment stays a closed solid with a meaningful volume.

pub mod asteroid;
pub mod asteroid_rendering;
pub mod config;
pub mod constants;
pub mod csg;
pub mod error;
pub mod fracture;
pub mod graphics;
pub mod impact;
pub mod mesh;
pub mod physics;
pub mod score;
pub mod simulation;

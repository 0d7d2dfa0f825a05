//! Foundational primitives for volumetric region analysis.
//!
//! ## Volumes and Raster Order
//! A [`Volume`] is an owned 3D grid of scalar voxels stored x-fastest, then
//! y, then z. "Raster order" throughout the workspace means exactly this
//! iteration order; the labeling passes and component point lists rely on it.
//!
//! ## Coordinates
//! Voxel coordinates are integer triples ([`Point3i`]). Derived quantities
//! (mass centers, fitted shapes, distances) use double-precision triples
//! ([`Point3f`], [`Vec3f`]).

mod error;
mod geom;
mod volume;
mod voxel;

pub use error::Error;
pub use geom::{Point3f, Point3i, Vec3f};
pub use volume::Volume;
pub use voxel::VoxelScalar;

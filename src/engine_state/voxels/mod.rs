//! # Voxel World Core
//!
//! This module contains the voxel data model and the algorithms that mutate it.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: the packed 32-bit cell codec, block faces and the block registry
//! * **Chunk**: fixed-size cubes of cells and the sparse `ChunkStore` holding them
//! * **Generation**: deterministic terrain and structure stamping
//! * **Slope**: post-processing that turns exposed edges into ramps and corners
//! * **Damage**: accumulated block damage, destruction and direct edits
//! * **Tasks**: background chunk generation
//!
//! ## Data Flow
//!
//! 1. `TerrainGenerator` fills a chunk (and stamps structures into neighbours)
//! 2. `SlopeResolver` rewrites the slope bits of the generated region
//! 3. The mesher turns the chunk into surfaces
//! 4. Runtime edits go through `DamageController`, which re-runs the slope
//!    resolver locally and reports which chunks need a new mesh
//!
//! ## Thread Safety
//!
//! All cell arrays live in one `ChunkStore` behind one `MtResource` lock.
//! Generation and meshing copy what they need under that lock and compute
//! without it.

pub mod block;
pub mod chunk;
pub mod damage;
pub mod generation;
pub mod slope;
pub mod tasks;

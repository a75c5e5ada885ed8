//! Background tasks for the rendering system.
//!
//! # Available Tasks
//! - `ChunkMeshGenerationTask`: Builds the mesh of one chunk in the background

pub mod chunk_mesh_generation_task;

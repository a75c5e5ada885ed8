//! Thread-safe world services shared by the main thread and every task.

use std::sync::Arc;

use super::config::GeneratorConfig;
use super::rendering::meshing::ChunkMesher;
use super::voxels::block::{BlockRegistry, RegistryError};
use super::voxels::chunk::ChunkStore;
use super::voxels::generation::TerrainGenerator;
use super::voxels::slope::SlopeResolver;
use crate::core::MtResource;

/// Handles to the chunk store and the stateless services that work on it.
///
/// Cloning is cheap; every clone refers to the same store.
#[derive(Clone)]
pub struct WorldServices {
    pub store: MtResource<ChunkStore>,
    pub generator: Arc<TerrainGenerator>,
    pub slopes: Arc<SlopeResolver>,
    pub mesher: Arc<ChunkMesher>,
}

impl WorldServices {
    /// Services around an empty store, generating with the default noise
    /// oracle.
    pub fn new(config: GeneratorConfig, registry: Arc<BlockRegistry>) -> Result<Self, RegistryError> {
        let generator = TerrainGenerator::new(config, registry.clone())?;
        Ok(Self::with_generator(generator, registry))
    }

    pub fn with_generator(generator: TerrainGenerator, registry: Arc<BlockRegistry>) -> Self {
        WorldServices {
            store: MtResource::new(ChunkStore::new()),
            generator: Arc::new(generator),
            slopes: Arc::new(SlopeResolver::new(registry.clone())),
            mesher: Arc::new(ChunkMesher::new(registry)),
        }
    }
}

//! # Engine State Module
//!
//! The core engine module that owns the voxel world and coordinates its
//! subsystems.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `config` - Engine and generator configuration
//! * `rendering` - Meshing and the installed-mesh registry read by renderers
//! * `task_management` - Manages asynchronous tasks and worker threads
//! * `voxels` - Cells, chunks, generation, slopes and damage
//!
//! ## Architecture
//!
//! `EngineState` holds the shared [`WorldServices`] (the chunk store behind
//! its store-wide lock plus the stateless generator, slope resolver and
//! mesher), the main-thread [`InstalledMeshes`], and the task manager that
//! connects the two. Generation and meshing run as tasks; their results are
//! applied in [`EngineState::process_tasks`]. Damage and block edits are
//! applied synchronously under the store lock and schedule re-meshing of the
//! chunks they touched.

use std::sync::Arc;
use std::time::Duration;

use cgmath::{MetricSpace, Point3};
use web_time::Instant;

use rendering::tasks::chunk_mesh_generation_task::remesh_tasks;
use task_management::TaskManager;
use voxels::block::{BlockId, BlockRegistry, Cell, SlopeType};
use voxels::chunk::{global_to_chunk, ChunkStore};
use voxels::damage::{DamageController, DamageRequest, DestructionListener, EditReport};
use voxels::generation::{NoiseSource, TerrainGenerator};
use voxels::tasks::chunk_generation_task::ChunkGenerationTask;

use crate::core::MtResource;

pub mod config;
pub mod error;
pub mod rendering;
pub mod services;
pub mod task_management;
pub mod voxels;

pub use config::{EngineConfig, GeneratorConfig};
pub use error::EngineError;
pub use rendering::{ChunkMesh, InstalledMeshes, Surface};
pub use services::WorldServices;

/// The main state container for the voxel engine.
///
/// # Examples
///
/// ```no_run
/// use voxel_world::engine_state::{EngineConfig, EngineState};
/// use cgmath::Point3;
///
/// let mut engine = EngineState::new(EngineConfig::default()).unwrap();
/// engine.update_focus(Point3::new(0, 0, 0));
///
/// // Main loop
/// loop {
///     engine.process_tasks();
///     for mesh in engine.installed_meshes().meshes() {
///         // hand mesh.surfaces to the renderer
///     }
/// }
/// ```
pub struct EngineState {
    config: EngineConfig,
    registry: Arc<BlockRegistry>,
    services: WorldServices,
    damage: DamageController,
    task_manager: TaskManager,
    meshes: InstalledMeshes,
    /// Chunk the loaded area is centred on
    focus: Option<Point3<i32>>,
    listener: Option<Arc<dyn DestructionListener>>,
}

impl EngineState {
    /// Creates an engine with the embedded block catalog.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let registry = BlockRegistry::default_catalog()?;
        Self::with_registry(config, registry)
    }

    /// Creates an engine with a caller-supplied block registry.
    ///
    /// # Errors
    /// Fails if the configuration is invalid or the registry lacks a block
    /// the generator needs.
    pub fn with_registry(config: EngineConfig, registry: BlockRegistry) -> Result<Self, EngineError> {
        config.validate()?;
        let registry = Arc::new(registry);
        let generator = TerrainGenerator::new(config.generator.clone(), registry.clone())?;
        Ok(Self::assemble(config, registry, generator))
    }

    /// Creates an engine whose generator samples `noise`.
    pub fn with_noise(
        config: EngineConfig,
        registry: BlockRegistry,
        noise: Box<dyn NoiseSource>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let registry = Arc::new(registry);
        let generator = TerrainGenerator::with_noise(config.generator.clone(), registry.clone(), noise)?;
        Ok(Self::assemble(config, registry, generator))
    }

    fn assemble(config: EngineConfig, registry: Arc<BlockRegistry>, generator: TerrainGenerator) -> Self {
        let services = WorldServices::with_generator(generator, registry.clone());
        let task_manager = TaskManager::new(config.worker_count, services.clone());
        log::info!(
            "Engine ready: {} block types, render distance {}, levels {:?}",
            registry.len(),
            config.render_distance,
            config.vertical_levels()
        );
        EngineState {
            damage: DamageController::new(registry.clone()),
            config,
            registry,
            services,
            task_manager,
            meshes: InstalledMeshes::new(),
            focus: None,
            listener: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// The shared chunk store. Lock it only briefly.
    pub fn store(&self) -> &MtResource<ChunkStore> {
        &self.services.store
    }

    pub fn installed_meshes(&self) -> &InstalledMeshes {
        &self.meshes
    }

    pub fn mesh_for(&self, chunk: Point3<i32>) -> Option<&ChunkMesh> {
        self.meshes.get(chunk)
    }

    /// Registers the collaborator told about destroyed blocks.
    pub fn set_destruction_listener(&mut self, listener: Arc<dyn DestructionListener>) {
        self.listener = Some(listener);
    }

    /// Loads a chunk: generates it if needed and meshes it.
    ///
    /// # Returns
    /// `false` if the chunk was already loaded.
    pub fn request_chunk(&mut self, chunk: Point3<i32>) -> bool {
        if !self.meshes.activate(chunk) {
            return false;
        }
        let revision = self.meshes.next_revision(chunk);
        self.task_manager.publish_task(Box::new(ChunkGenerationTask::new(
            self.services.clone(),
            chunk,
            revision,
        )));
        true
    }

    /// Unloads a chunk's mesh. Its cells stay in the store so edits survive
    /// a later reload; results still in flight for it are discarded.
    pub fn unload_chunk(&mut self, chunk: Point3<i32>) -> Option<ChunkMesh> {
        self.meshes.deactivate(chunk)
    }

    /// Re-centres the loaded area on the chunk containing `position`.
    ///
    /// Chunks within the render distance horizontally and within the
    /// configured vertical levels are requested nearest first; loaded chunks
    /// outside that area are unloaded.
    pub fn update_focus(&mut self, position: Point3<i32>) {
        let (center, _) = global_to_chunk(position);
        if self.focus == Some(center) {
            return;
        }
        self.focus = Some(center);

        let distance = self.config.render_distance;
        let mut wanted = Vec::new();
        for y in self.config.vertical_levels() {
            for z in (center.z - distance)..=(center.z + distance) {
                for x in (center.x - distance)..=(center.x + distance) {
                    wanted.push(Point3::new(x, y, z));
                }
            }
        }

        let outside: Vec<_> = self
            .meshes
            .active_chunks()
            .filter(|chunk| !wanted.contains(chunk))
            .collect();
        for chunk in &outside {
            self.unload_chunk(*chunk);
        }

        let center_f = Point3::new(center.x as f32, center.y as f32, center.z as f32);
        wanted.sort_by(|a, b| {
            let da = center_f.distance2(Point3::new(a.x as f32, a.y as f32, a.z as f32));
            let db = center_f.distance2(Point3::new(b.x as f32, b.y as f32, b.z as f32));
            da.total_cmp(&db)
        });
        let mut requested = 0;
        for chunk in wanted {
            if self.request_chunk(chunk) {
                requested += 1;
            }
        }
        log::info!(
            "Focus moved to chunk {:?}: {} chunks requested, {} unloaded",
            center,
            requested,
            outside.len()
        );
    }

    /// Applies finished background work and hands queued tasks to workers.
    /// Call once per tick.
    pub fn process_tasks(&mut self) {
        self.task_manager.process_completed_tasks(&mut self.meshes);
        self.task_manager.process_queued_tasks();
    }

    /// Runs [`EngineState::process_tasks`] until no work is left or
    /// `timeout` has passed.
    ///
    /// # Returns
    /// `true` if all work finished.
    pub fn flush_tasks(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_tasks();
            if self.task_manager.is_idle() {
                self.process_tasks();
                if self.task_manager.is_idle() {
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            if self.task_manager.worker_count() > 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.task_manager.is_idle()
    }

    pub fn cell_at(&self, position: Point3<i32>) -> Cell {
        self.services.store.get().cell_at(position)
    }

    /// Damages one block.
    pub fn damage(&mut self, position: Point3<i32>, amount: f32) -> EditReport {
        let report = self
            .services
            .store
            .with_mut(|store| self.damage.damage(store, position, amount));
        self.after_edit(report)
    }

    /// Damages several blocks, grouped per chunk under one lock.
    pub fn damage_batch(&mut self, requests: &[DamageRequest]) -> EditReport {
        let report = self
            .services
            .store
            .with_mut(|store| self.damage.damage_batch(store, requests));
        self.after_edit(report)
    }

    /// Places a block (`0` clears it). Unregistered ids are ignored.
    pub fn set_block(&mut self, position: Point3<i32>, id: BlockId) -> EditReport {
        let report = self
            .services
            .store
            .with_mut(|store| self.damage.set_block(store, position, id));
        self.after_edit(report)
    }

    /// Forces a slope shape onto a block.
    pub fn set_slope(
        &mut self,
        position: Point3<i32>,
        slope_type: SlopeType,
        rotation: u32,
        flipped: bool,
    ) -> EditReport {
        let report = self
            .services
            .store
            .with_mut(|store| self.damage.set_slope(store, position, slope_type, rotation, flipped));
        self.after_edit(report)
    }

    fn after_edit(&mut self, report: EditReport) -> EditReport {
        if !report.destroyed.is_empty() {
            if let Some(listener) = &self.listener {
                listener.on_destroyed(&report.destroyed);
            }
        }
        for task in remesh_tasks(&self.services, &mut self.meshes, &report.remesh_chunks) {
            self.task_manager.publish_task(task);
        }
        report
    }

    /// Raw bytes of a chunk for the persistence collaborator.
    pub fn serialize_chunk(&self, chunk: Point3<i32>) -> Option<Vec<u8>> {
        self.services.store.get().serialize_chunk(chunk)
    }

    /// Every chunk whose terrain has been generated or restored.
    pub fn generated_chunks(&self) -> Vec<Point3<i32>> {
        self.services.store.get().generated_chunks()
    }

    /// Installs persisted chunk bytes and marks the chunk generated, so it is
    /// never generated over. A loaded chunk is re-meshed.
    pub fn restore_chunk(&mut self, chunk: Point3<i32>, bytes: &[u8]) -> Result<(), EngineError> {
        let cells = ChunkStore::deserialize_chunk(bytes)?;
        self.services.store.with_mut(|store| store.restore_chunk(chunk, cells));
        for task in remesh_tasks(&self.services, &mut self.meshes, &[chunk]) {
            self.task_manager.publish_task(task);
        }
        Ok(())
    }

    /// Marks persisted chunks that had no cells (all air) as generated.
    pub fn mark_generated(&mut self, chunks: &[Point3<i32>]) {
        self.services.store.with_mut(|store| {
            for chunk in chunks {
                store.mark_generated(*chunk);
            }
        });
    }
}

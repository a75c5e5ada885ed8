//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask`, scheduled when a chunk
//! enters the loaded area. It generates the chunk's terrain, resolves slopes
//! over everything generation wrote to, and meshes the chunk, all on a worker.

use cgmath::Point3;
use log::{debug, info};
use web_time::Instant;

use crate::engine_state::{
    rendering::{
        meshing::ChunkMesh,
        tasks::chunk_mesh_generation_task::{build_chunk_mesh, remesh_tasks},
        InstalledMeshes,
    },
    services::WorldServices,
    task_management::task::{Task, TaskResult},
    voxels::chunk::{face_neighbors, global_to_chunk},
    voxels::generation::GenerationStatus,
};

/// Generates, slopes and meshes one chunk.
pub struct ChunkGenerationTask {
    services: WorldServices,
    /// The chunk to generate (in chunk coordinates)
    chunk: Point3<i32>,
    /// Revision the chunk's first mesh is installed under
    revision: u64,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `services` - Shared world services
    /// * `chunk` - The chunk coordinates to generate
    /// * `revision` - Revision number from `InstalledMeshes::next_revision`
    pub fn new(services: WorldServices, chunk: Point3<i32>, revision: u64) -> Self {
        ChunkGenerationTask {
            services,
            chunk,
            revision,
        }
    }
}

impl Task for ChunkGenerationTask {
    /// Generates the chunk unless it already is, then meshes it.
    ///
    /// Slope resolution runs under the store lock over the new chunk, over
    /// neighbours that are still waiting for their own generation, around
    /// structure cells stamped into settled neighbours, and over the border
    /// layers of neighbours that were classified before this chunk existed.
    ///
    /// A chunk another task is still generating is not meshed: its cells are
    /// incomplete and that task meshes it once they are final.
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let start = Instant::now();
        let outcome = self.services.generator.generate(&self.services.store, self.chunk);

        if outcome.status == GenerationStatus::InFlight {
            debug!("Chunk {:?} is already being generated", self.chunk);
            return Box::new(ChunkGenerationTaskResult {
                chunk: self.chunk,
                mesh: None,
                changed: Vec::new(),
            });
        }

        let mut changed = outcome.touched.clone();
        if outcome.generated() {
            let slopes = &self.services.slopes;
            let resolved = self.services.store.with_mut(|store| {
                let mut resolved = slopes.resolve_chunk(store, self.chunk);
                for chunk in &outcome.touched {
                    if *chunk != self.chunk && !store.is_generated(*chunk) {
                        resolved.extend(slopes.resolve_chunk(store, *chunk));
                    }
                }
                // settled neighbours keep their slopes away from the stamps
                let settled: Vec<Point3<i32>> = outcome
                    .stamped
                    .iter()
                    .copied()
                    .filter(|global| store.is_generated(global_to_chunk(*global).0))
                    .collect();
                resolved.extend(slopes.resolve_around(store, &settled));
                resolved.extend(slopes.resolve_border(store, self.chunk));
                resolved
            });
            for chunk in resolved {
                if !changed.contains(&chunk) {
                    changed.push(chunk);
                }
            }
            info!(
                "Generated chunk {:?} ({} chunks touched) in {:?}",
                self.chunk,
                changed.len(),
                start.elapsed()
            );
        }

        Box::new(ChunkGenerationTaskResult {
            chunk: self.chunk,
            mesh: Some(build_chunk_mesh(&self.services, self.chunk, self.revision)),
            changed,
        })
    }
}

/// The generated chunk's mesh and the chunks whose cells generation changed.
pub struct ChunkGenerationTaskResult {
    chunk: Point3<i32>,
    /// `None` if another task was still generating the chunk.
    mesh: Option<ChunkMesh>,
    changed: Vec<Point3<i32>>,
}

impl TaskResult for ChunkGenerationTaskResult {
    /// Installs the mesh and re-meshes loaded neighbours, whose border faces
    /// were culled against a chunk that did not exist yet.
    ///
    /// If the mesh was requested before the chunk was last reloaded it is
    /// dropped as stale; the chunk is then re-meshed under a current
    /// revision, since no other task will.
    fn handle_result(
        self: Box<Self>,
        services: &WorldServices,
        meshes: &mut InstalledMeshes,
    ) -> Vec<Box<dyn Task + Send>> {
        let Some(mesh) = self.mesh else {
            return Vec::new();
        };

        let mut stale: Vec<Point3<i32>> = face_neighbors(self.chunk).to_vec();
        if !meshes.install(mesh) && !meshes.is_meshed(self.chunk) {
            stale.push(self.chunk);
        }
        for chunk in self.changed {
            if chunk != self.chunk && !stale.contains(&chunk) {
                stale.push(chunk);
            }
        }
        remesh_tasks(services, meshes, &stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::engine_state::config::GeneratorConfig;
    use crate::engine_state::rendering::Surface;
    use crate::engine_state::voxels::block::cell;
    use crate::engine_state::voxels::block::{BlockRegistry, SlopeType};
    use crate::engine_state::voxels::generation::{NoiseSource, TerrainGenerator};

    struct FlatNoise;

    impl NoiseSource for FlatNoise {
        fn noise3d(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            0.0
        }

        fn noise2d(&self, _x: f64, _z: f64) -> f64 {
            0.0
        }
    }

    /// Flat ground whose surface sits at y = 9.
    fn flat_config() -> GeneratorConfig {
        GeneratorConfig {
            height_scale: 20.0,
            lava_height: 0,
            structure_chance: 0.0,
            damage_chance: 0.0,
            ..GeneratorConfig::default()
        }
    }

    fn services(config: GeneratorConfig) -> WorldServices {
        let registry = Arc::new(BlockRegistry::default_catalog().unwrap());
        let generator = TerrainGenerator::with_noise(config, registry.clone(), Box::new(FlatNoise)).unwrap();
        WorldServices::with_generator(generator, registry)
    }

    /// Runs a task and everything it schedules, inline.
    fn run(task: Box<dyn Task + Send>, services: &WorldServices, meshes: &mut InstalledMeshes) {
        let mut queue = vec![task];
        while let Some(task) = queue.pop() {
            queue.extend(task.process().handle_result(services, meshes));
        }
    }

    #[test]
    fn reloading_during_generation_still_meshes_the_chunk() {
        let services = services(flat_config());
        let mut meshes = InstalledMeshes::new();
        let chunk = Point3::new(0, 0, 0);

        meshes.activate(chunk);
        let first = ChunkGenerationTask::new(services.clone(), chunk, meshes.next_revision(chunk));
        meshes.deactivate(chunk);
        meshes.activate(chunk);
        let second = ChunkGenerationTask::new(services.clone(), chunk, meshes.next_revision(chunk));

        // the first task is still computing cells when the second one runs
        assert!(services.store.with_mut(|store| store.try_begin_generation(chunk)));
        let second_result = second.process();
        services.store.with_mut(|store| store.abort_generation(chunk));
        let first_result = first.process();

        assert!(second_result.handle_result(&services, &mut meshes).is_empty());
        assert!(!meshes.is_meshed(chunk));

        // the first mesh predates the reload and is dropped, so the chunk is
        // re-meshed under a current revision
        let follow_ups = first_result.handle_result(&services, &mut meshes);
        assert_eq!(follow_ups.len(), 1);
        for task in follow_ups {
            run(task, &services, &mut meshes);
        }

        let mesh = meshes.get(chunk).unwrap();
        assert!(!mesh.is_empty());
        assert!(!mesh.surface(Surface::GrassTop).is_empty());
    }

    #[test]
    fn stamping_into_a_settled_chunk_keeps_its_other_slopes() {
        let config = GeneratorConfig {
            structure_chance: 1.0,
            totem_share: 1.0,
            ..flat_config()
        };
        let services = services(config);
        let mut meshes = InstalledMeshes::new();
        let ground = Point3::new(0, 0, 0);
        let sky = Point3::new(0, 1, 0);

        meshes.activate(ground);
        let revision = meshes.next_revision(ground);
        run(Box::new(ChunkGenerationTask::new(services.clone(), ground, revision)), &services, &mut meshes);

        // buried stone, far below the surface the totems stand on
        let forced = Point3::new(5, 2, 5);
        services.store.with_mut(|store| {
            let value = store.cell_at(forced);
            store.set_cell_at(forced, cell::with_slope(value, SlopeType::Side, 1, false));
        });
        let before = services.store.get().cell_at(forced);
        assert_eq!(cell::get_slope_type(before), SlopeType::Side);

        meshes.activate(sky);
        let revision = meshes.next_revision(sky);
        run(Box::new(ChunkGenerationTask::new(services.clone(), sky, revision)), &services, &mut meshes);

        let store = services.store.get();
        let totem = services.generator.blocks().totem;
        assert_eq!(cell::get_id(store.cell_at(Point3::new(5, 10, 5))), totem);
        assert_eq!(store.cell_at(forced), before);
    }
}

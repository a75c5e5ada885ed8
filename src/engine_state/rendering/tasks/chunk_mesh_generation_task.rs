//! Task for building a chunk's mesh in a background thread.
//!
//! The chunk and its one-cell border are copied out of the store under the
//! store lock; the mesher then runs on the copy without holding it.

use cgmath::Point3;
use web_time::Instant;

use crate::engine_state::{
    rendering::{
        meshing::{ChunkMesh, PaddedChunk},
        InstalledMeshes,
    },
    services::WorldServices,
    task_management::task::{Task, TaskResult},
};

/// Builds the mesh of one chunk.
pub struct ChunkMeshGenerationTask {
    services: WorldServices,
    chunk: Point3<i32>,
    /// Revision the finished mesh is installed under
    revision: u64,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `services` - Shared world services
    /// * `chunk` - The chunk to mesh
    /// * `revision` - Revision number from `InstalledMeshes::next_revision`
    pub fn new(services: WorldServices, chunk: Point3<i32>, revision: u64) -> Self {
        ChunkMeshGenerationTask {
            services,
            chunk,
            revision,
        }
    }
}

/// Copies the chunk out of the store and meshes it. A chunk that was never
/// allocated is all air and meshes to nothing.
pub(crate) fn build_chunk_mesh(services: &WorldServices, chunk: Point3<i32>, revision: u64) -> ChunkMesh {
    let start = Instant::now();
    let padded = PaddedChunk::capture(&services.store.get(), chunk);
    let mesh = match padded {
        Some(padded) => services.mesher.build(&padded, revision),
        None => ChunkMesh::new(chunk, revision),
    };
    log::debug!(
        "Meshed chunk {:?} (revision {}): {} vertices in {:?}",
        chunk,
        revision,
        mesh.vertex_count(),
        start.elapsed()
    );
    mesh
}

/// Mesh tasks for every chunk in `chunks` that is loaded and generated.
///
/// Chunks still waiting for generation are skipped: their generation task
/// meshes them once their cells exist, and a newer revision requested now
/// would make that result stale.
pub(crate) fn remesh_tasks(
    services: &WorldServices,
    meshes: &mut InstalledMeshes,
    chunks: &[Point3<i32>],
) -> Vec<Box<dyn Task + Send>> {
    let generated: Vec<Point3<i32>> = {
        let store = services.store.get();
        chunks
            .iter()
            .copied()
            .filter(|chunk| meshes.is_active(*chunk) && store.is_generated(*chunk))
            .collect()
    };
    generated
        .into_iter()
        .map(|chunk| {
            let revision = meshes.next_revision(chunk);
            Box::new(ChunkMeshGenerationTask::new(services.clone(), chunk, revision)) as Box<dyn Task + Send>
        })
        .collect()
}

impl Task for ChunkMeshGenerationTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        Box::new(ChunkMeshGenerationTaskResult {
            mesh: build_chunk_mesh(&self.services, self.chunk, self.revision),
        })
    }
}

/// The finished mesh, waiting to be installed on the main thread.
pub struct ChunkMeshGenerationTaskResult {
    mesh: ChunkMesh,
}

impl TaskResult for ChunkMeshGenerationTaskResult {
    fn handle_result(
        self: Box<Self>,
        _services: &WorldServices,
        meshes: &mut InstalledMeshes,
    ) -> Vec<Box<dyn Task + Send>> {
        meshes.install(self.mesh);
        Vec::new()
    }
}

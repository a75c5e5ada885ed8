//! Render-facing output of the voxel engine.
//!
//! This module turns chunk cells into meshes and keeps the set of meshes the
//! external renderer and physics collaborators should currently show. It
//! does not talk to a GPU: the collaborators read [`ChunkMesh`] values out
//! of [`InstalledMeshes`] once per tick.

use std::collections::{HashMap, HashSet};

use cgmath::Point3;

pub mod meshing;
pub mod tasks;
pub mod vertex;

pub use meshing::{ChunkMesh, ChunkMesher, Surface};
pub use vertex::{FaceMetadata, Vertex};

#[derive(Copy, Clone, Debug, Default)]
struct RevisionSlot {
    /// Highest revision handed out for this chunk.
    requested: u64,
    /// Results below this revision belong to an earlier activation.
    floor: u64,
}

/// Main-thread registry of active chunks and their installed meshes.
///
/// Background results are only ever applied through [`InstalledMeshes::install`],
/// which swaps in a whole mesh at once. Every mesh request gets a revision
/// number; a result is dropped if its chunk has been torn down since the
/// request, or if a newer result is already installed.
#[derive(Debug, Default)]
pub struct InstalledMeshes {
    active: HashSet<Point3<i32>>,
    meshes: HashMap<Point3<i32>, ChunkMesh>,
    revisions: HashMap<Point3<i32>, RevisionSlot>,
}

impl InstalledMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a chunk as wanted.
    ///
    /// # Returns
    /// `false` if it was already active.
    pub fn activate(&mut self, chunk: Point3<i32>) -> bool {
        if !self.active.insert(chunk) {
            return false;
        }
        let slot = self.revisions.entry(chunk).or_default();
        slot.floor = slot.requested + 1;
        true
    }

    /// Tears a chunk down. Results still in flight for it will be discarded.
    pub fn deactivate(&mut self, chunk: Point3<i32>) -> Option<ChunkMesh> {
        self.active.remove(&chunk);
        self.meshes.remove(&chunk)
    }

    pub fn is_active(&self, chunk: Point3<i32>) -> bool {
        self.active.contains(&chunk)
    }

    /// Revision number for a new mesh request of `chunk`.
    pub fn next_revision(&mut self, chunk: Point3<i32>) -> u64 {
        let slot = self.revisions.entry(chunk).or_default();
        slot.requested += 1;
        slot.requested
    }

    /// Installs a finished mesh, replacing the previous one.
    ///
    /// # Returns
    /// `false` if the mesh was stale and has been dropped.
    pub fn install(&mut self, mesh: ChunkMesh) -> bool {
        let coord = mesh.coord;
        if !self.active.contains(&coord) {
            log::debug!("Dropping mesh for unloaded chunk {:?}", coord);
            return false;
        }
        let floor = self.revisions.get(&coord).map_or(0, |slot| slot.floor);
        let installed = self.meshes.get(&coord).map(|m| m.revision);
        if mesh.revision < floor || installed.is_some_and(|r| r > mesh.revision) {
            log::warn!(
                "Dropping stale mesh revision {} for chunk {:?}",
                mesh.revision,
                coord
            );
            return false;
        }
        self.meshes.insert(coord, mesh);
        true
    }

    pub fn get(&self, chunk: Point3<i32>) -> Option<&ChunkMesh> {
        self.meshes.get(&chunk)
    }

    pub fn is_meshed(&self, chunk: Point3<i32>) -> bool {
        self.meshes.contains_key(&chunk)
    }

    pub fn active_chunks(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        self.active.iter().copied()
    }

    pub fn meshes(&self) -> impl Iterator<Item = &ChunkMesh> {
        self.meshes.values()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}

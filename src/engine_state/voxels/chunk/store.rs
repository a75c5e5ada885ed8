//! # Chunk Store
//!
//! The `ChunkStore` is the sparse map from chunk coordinates to cell arrays,
//! together with the set of coordinates whose terrain has already been
//! generated.
//!
//! ## Architecture
//!
//! Only chunks that have been generated, edited or touched by a neighbouring
//! structure are allocated. Chunk arrays are created lazily; a tree trunk that
//! straddles a boundary may allocate the neighbour's array before that
//! neighbour is generated.
//!
//! ## Thread Safety
//!
//! The store itself is a plain struct. It is shared as
//! `MtResource<ChunkStore>`, so the map, every array reached through it and the
//! generated set all sit behind one store-wide lock. Code that needs a
//! consistent view during a long computation copies what it needs under the
//! lock (see [`ChunkStore::snapshot`]) and releases it before computing.

use std::collections::{HashMap, HashSet};

use cgmath::{Point3, Vector3};

use super::codec::{self, ChunkCodecError};
use super::{global_to_chunk, local_index, wrap_local, CHUNK_VOLUME};
use crate::engine_state::voxels::block::cell::{self, AIR};
use crate::engine_state::voxels::block::Cell;

/// Sparse storage for all allocated chunks of the world.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: HashMap<Point3<i32>, Vec<Cell>>,
    generated: HashSet<Point3<i32>>,
    in_flight: HashSet<Point3<i32>>,
}

impl ChunkStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell array of a chunk, or `None` if it was never allocated.
    pub fn get(&self, chunk: Point3<i32>) -> Option<&[Cell]> {
        self.chunks.get(&chunk).map(Vec::as_slice)
    }

    /// Mutable access to an already allocated chunk.
    pub fn get_mut(&mut self, chunk: Point3<i32>) -> Option<&mut Vec<Cell>> {
        self.chunks.get_mut(&chunk)
    }

    /// Returns a copy of a chunk's cells for lock-free processing.
    pub fn snapshot(&self, chunk: Point3<i32>) -> Option<Vec<Cell>> {
        self.chunks.get(&chunk).cloned()
    }

    /// Returns the cell array of a chunk, allocating an all-air array if absent.
    pub fn get_or_create(&mut self, chunk: Point3<i32>) -> &mut Vec<Cell> {
        self.chunks
            .entry(chunk)
            .or_insert_with(|| vec![AIR; CHUNK_VOLUME])
    }

    /// Replaces a chunk's cell array wholesale.
    ///
    /// Arrays of the wrong length are padded or truncated to `CHUNK_VOLUME`.
    pub fn set(&mut self, chunk: Point3<i32>, mut cells: Vec<Cell>) {
        if cells.len() != CHUNK_VOLUME {
            log::warn!(
                "Chunk {:?} replaced with {} cells, resizing to {}",
                chunk,
                cells.len(),
                CHUNK_VOLUME
            );
            cells.resize(CHUNK_VOLUME, AIR);
        }
        self.chunks.insert(chunk, cells);
    }

    /// Drops a chunk's cells. The generated mark is kept so the chunk is not
    /// regenerated over a later restore.
    pub fn remove(&mut self, chunk: Point3<i32>) -> Option<Vec<Cell>> {
        self.chunks.remove(&chunk)
    }

    pub fn contains(&self, chunk: Point3<i32>) -> bool {
        self.chunks.contains_key(&chunk)
    }

    /// Coordinates of every allocated chunk.
    pub fn chunk_coords(&self) -> impl Iterator<Item = Point3<i32>> + '_ {
        self.chunks.keys().copied()
    }

    /// Number of allocated chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Reads the cell at `local + offset` relative to `chunk`, crossing into
    /// neighbouring chunks as needed.
    ///
    /// # Returns
    /// The empty cell if the resolved chunk has never been allocated.
    pub fn neighbor_cell(&self, chunk: Point3<i32>, local: Point3<i32>, offset: Vector3<i32>) -> Cell {
        let (owner, wrapped) = wrap_local(chunk, local + offset);
        self.cell_in(owner, wrapped)
    }

    /// Writes the cell at `local + offset` relative to `chunk`, allocating the
    /// resolved chunk if needed.
    pub fn set_neighbor_cell(
        &mut self,
        chunk: Point3<i32>,
        local: Point3<i32>,
        offset: Vector3<i32>,
        value: Cell,
    ) {
        let (owner, wrapped) = wrap_local(chunk, local + offset);
        if let Some(index) = local_index(wrapped) {
            self.get_or_create(owner)[index] = value;
        }
    }

    /// Like [`ChunkStore::set_neighbor_cell`] but only writes into an empty
    /// cell.
    ///
    /// # Returns
    /// The chunk that was written to, or `None` if the target was occupied.
    pub fn fill_neighbor_cell(
        &mut self,
        chunk: Point3<i32>,
        local: Point3<i32>,
        offset: Vector3<i32>,
        value: Cell,
    ) -> Option<Point3<i32>> {
        let (owner, wrapped) = wrap_local(chunk, local + offset);
        let index = local_index(wrapped)?;
        let cells = self.get_or_create(owner);
        if !cell::is_empty(cells[index]) {
            return None;
        }
        cells[index] = value;
        Some(owner)
    }

    /// Reads the cell at a global position.
    pub fn cell_at(&self, global: Point3<i32>) -> Cell {
        let (chunk, local) = global_to_chunk(global);
        self.cell_in(chunk, local)
    }

    /// Writes the cell at a global position, allocating the chunk if needed.
    ///
    /// # Returns
    /// The chunk coordinate that was written.
    pub fn set_cell_at(&mut self, global: Point3<i32>, value: Cell) -> Point3<i32> {
        let (chunk, local) = global_to_chunk(global);
        if let Some(index) = local_index(local) {
            self.get_or_create(chunk)[index] = value;
        }
        chunk
    }

    fn cell_in(&self, chunk: Point3<i32>, local: Point3<i32>) -> Cell {
        match (self.chunks.get(&chunk), local_index(local)) {
            (Some(cells), Some(index)) => cells[index],
            _ => AIR,
        }
    }

    /// Atomically checks and marks a chunk as being generated.
    ///
    /// # Returns
    /// `false` if the chunk is already generated or another caller is
    /// currently generating it. The caller must then skip generation.
    pub fn try_begin_generation(&mut self, chunk: Point3<i32>) -> bool {
        if self.generated.contains(&chunk) || self.in_flight.contains(&chunk) {
            return false;
        }
        self.in_flight.insert(chunk);
        true
    }

    /// Marks a chunk as generated. Must be the last step of generation.
    pub fn finish_generation(&mut self, chunk: Point3<i32>) {
        self.in_flight.remove(&chunk);
        self.generated.insert(chunk);
    }

    /// Releases an in-flight mark without marking the chunk generated, so a
    /// later call retries.
    pub fn abort_generation(&mut self, chunk: Point3<i32>) {
        self.in_flight.remove(&chunk);
    }

    pub fn is_generated(&self, chunk: Point3<i32>) -> bool {
        self.generated.contains(&chunk)
    }

    /// The generated set, for persistence.
    pub fn generated_chunks(&self) -> Vec<Point3<i32>> {
        self.generated.iter().copied().collect()
    }

    /// Installs a persisted chunk and marks it generated.
    pub fn restore_chunk(&mut self, chunk: Point3<i32>, cells: Vec<Cell>) {
        self.set(chunk, cells);
        self.in_flight.remove(&chunk);
        self.generated.insert(chunk);
    }

    /// Marks a chunk generated without touching its cells, for persisted
    /// generated sets whose chunks were all air.
    pub fn mark_generated(&mut self, chunk: Point3<i32>) {
        self.generated.insert(chunk);
    }

    /// Raw little-endian bytes of a chunk's cells.
    pub fn serialize_chunk(&self, chunk: Point3<i32>) -> Option<Vec<u8>> {
        self.get(chunk).map(codec::encode_cells)
    }

    /// Parses bytes produced by [`ChunkStore::serialize_chunk`].
    pub fn deserialize_chunk(bytes: &[u8]) -> Result<Vec<Cell>, ChunkCodecError> {
        codec::decode_cells(bytes)
    }
}

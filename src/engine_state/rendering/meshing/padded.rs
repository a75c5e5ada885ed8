//! A chunk plus a one-cell border copied from its neighbours.
//!
//! The mesher needs the border so that faces on the chunk boundary are culled
//! against the neighbouring chunk rather than against air. The copy is taken
//! under the store lock and meshing then runs without it.

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::cell::AIR;
use crate::engine_state::voxels::block::Cell;
use crate::engine_state::voxels::chunk::{
    local_index, ChunkStore, CHUNK_SIZE, CHUNK_SIZE_PADDED, CHUNK_VOLUME_PADDED,
};

const P: i32 = CHUNK_SIZE_PADDED as i32;

#[derive(Clone, Debug)]
pub struct PaddedChunk {
    pub chunk: Point3<i32>,
    cells: Vec<Cell>,
}

impl PaddedChunk {
    /// Copies `chunk` and its border out of the store.
    ///
    /// # Returns
    /// `None` if the chunk has never been allocated.
    pub fn capture(store: &ChunkStore, chunk: Point3<i32>) -> Option<Self> {
        let interior = store.get(chunk)?;
        let mut cells = vec![AIR; CHUNK_VOLUME_PADDED];

        for py in 0..P {
            for pz in 0..P {
                for px in 0..P {
                    let local = Point3::new(px - 1, py - 1, pz - 1);
                    let value = match local_index(local) {
                        Some(index) => interior[index],
                        None => store.neighbor_cell(chunk, local, Vector3::new(0, 0, 0)),
                    };
                    cells[Self::padded_index(px, py, pz)] = value;
                }
            }
        }

        Some(PaddedChunk { chunk, cells })
    }

    /// Wraps bare chunk cells with an all-air border.
    pub fn from_cells(chunk: Point3<i32>, interior: &[Cell]) -> Self {
        let mut cells = vec![AIR; CHUNK_VOLUME_PADDED];
        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    if let Some(&value) = local_index(Point3::new(x, y, z)).and_then(|i| interior.get(i)) {
                        cells[Self::padded_index(x + 1, y + 1, z + 1)] = value;
                    }
                }
            }
        }
        PaddedChunk { chunk, cells }
    }

    #[inline]
    fn padded_index(px: i32, py: i32, pz: i32) -> usize {
        (px + pz * P + py * P * P) as usize
    }

    /// Cell at padded coordinates (chunk-local + 1). Anything outside the
    /// padded array is air.
    #[inline]
    pub fn get(&self, px: i32, py: i32, pz: i32) -> Cell {
        if !(0..P).contains(&px) || !(0..P).contains(&py) || !(0..P).contains(&pz) {
            return AIR;
        }
        self.cells[Self::padded_index(px, py, pz)]
    }

    /// Cell at chunk-local coordinates, which may reach one cell outside.
    #[inline]
    pub fn local(&self, local: Point3<i32>) -> Cell {
        self.get(local.x + 1, local.y + 1, local.z + 1)
    }
}

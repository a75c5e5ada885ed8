//! # Slope Resolver
//!
//! Decides which blocks render as ramps and writes the result into the slope
//! bits of their cells.
//!
//! A block is a *slope candidate* when it can slope (not air, lava or leaves),
//! has a block directly below, and either nothing directly above or an
//! inverted corner directly below. Candidates are classified from their four
//! horizontal neighbours (north = -Z, east = +X, south = +Z, west = -X) and,
//! for inverted corners, the four diagonals:
//!
//! | neighbours present           | shape      | rotation                     |
//! |------------------------------|------------|------------------------------|
//! | two, forming an L, unsloped  | `Corner`   | S+W 0, S+E 1, N+E 2, N+W 3   |
//! | one or three                 | `Side`     | free side S 0, E 1, N 2, W 3 |
//! | four, one free diagonal      | `InvCorner`| SW 0, SE 1, NE 2, NW 3       |
//! | anything else                | full cube  |                              |
//!
//! A batch is classified entirely against the pre-batch cell states and only
//! then written back, so the order of positions in a batch never matters.

use std::collections::HashMap;
use std::sync::Arc;

use bitvec::prelude::BitVec;
use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::cell;
use crate::engine_state::voxels::block::{BlockRegistry, BlockSpecies, Cell, SlopeType};
use crate::engine_state::voxels::chunk::{
    global_to_chunk, local_index, local_position, wrap_local, ChunkStore, CHUNK_SIZE, CHUNK_VOLUME,
};

/// The 3×3×3 cells around a block, captured before any write of a batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Neighborhood {
    cells: [Cell; 27],
}

impl Neighborhood {
    /// Builds a neighbourhood from a lookup of offsets in `-1..=1`.
    pub fn from_fn(mut cell_at: impl FnMut(Vector3<i32>) -> Cell) -> Self {
        let mut cells = [cell::AIR; 27];
        for dy in -1..=1 {
            for dz in -1..=1 {
                for dx in -1..=1 {
                    cells[Self::slot(dx, dy, dz)] = cell_at(Vector3::new(dx, dy, dz));
                }
            }
        }
        Neighborhood { cells }
    }

    /// Reads the neighbourhood of `local` in `chunk`, crossing chunk borders.
    pub fn capture(store: &ChunkStore, chunk: Point3<i32>, local: Point3<i32>) -> Self {
        Self::from_fn(|offset| store.neighbor_cell(chunk, local, offset))
    }

    #[inline]
    fn slot(dx: i32, dy: i32, dz: i32) -> usize {
        ((dx + 1) + (dz + 1) * 3 + (dy + 1) * 9) as usize
    }

    /// Cell at an offset in `-1..=1` on each axis.
    #[inline]
    pub fn at(&self, dx: i32, dy: i32, dz: i32) -> Cell {
        self.cells[Self::slot(dx, dy, dz)]
    }

    pub fn center(&self) -> Cell {
        self.at(0, 0, 0)
    }

    fn present(&self, dx: i32, dy: i32, dz: i32) -> bool {
        !cell::is_empty(self.at(dx, dy, dz))
    }
}

/// Classification result for one block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlopeShape {
    pub slope_type: SlopeType,
    pub rotation: u32,
}

impl SlopeShape {
    pub const CUBE: SlopeShape = SlopeShape {
        slope_type: SlopeType::None,
        rotation: 0,
    };

    fn new(slope_type: SlopeType, rotation: u32) -> Self {
        SlopeShape {
            slope_type,
            rotation,
        }
    }
}

/// Pending write of a classified batch.
struct SlopeWrite {
    chunk: Point3<i32>,
    local: Point3<i32>,
    shape: SlopeShape,
}

pub struct SlopeResolver {
    registry: Arc<BlockRegistry>,
}

impl SlopeResolver {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        SlopeResolver { registry }
    }

    /// Classifies the centre block of a neighbourhood.
    ///
    /// # Returns
    /// `None` if the block must not be touched at all (air, lava, leaves).
    /// Otherwise the shape it should have; [`SlopeShape::CUBE`] clears any
    /// slope it had.
    pub fn classify(&self, n: &Neighborhood) -> Option<SlopeShape> {
        let center = n.center();
        if cell::is_empty(center) {
            return None;
        }
        let species = self.registry.species(cell::get_id(center));
        if !species.can_slope() {
            return None;
        }

        let below = n.at(0, -1, 0);
        if cell::is_empty(below) {
            return Some(SlopeShape::CUBE);
        }
        let below_inv_corner = cell::get_slope_type(below) == SlopeType::InvCorner;
        if n.present(0, 1, 0) && !below_inv_corner {
            return Some(SlopeShape::CUBE);
        }

        let north = n.present(0, 0, -1);
        let east = n.present(1, 0, 0);
        let south = n.present(0, 0, 1);
        let west = n.present(-1, 0, 0);
        let count = [north, east, south, west].iter().filter(|p| **p).count();

        let shape = match count {
            1 | 3 => {
                let free = if count == 1 {
                    // the free side faces away from the single neighbour
                    [(north, 0), (west, 1), (south, 2), (east, 3)]
                } else {
                    [(!south, 0), (!east, 1), (!north, 2), (!west, 3)]
                };
                free.iter()
                    .find(|(is_free, _)| *is_free)
                    .map(|(_, rotation)| SlopeShape::new(SlopeType::Side, *rotation))
                    .unwrap_or(SlopeShape::CUBE)
            }
            2 => {
                let corners = [
                    (south && west, 0, Vector3::new(0, 0, 1), Vector3::new(-1, 0, 0)),
                    (south && east, 1, Vector3::new(0, 0, 1), Vector3::new(1, 0, 0)),
                    (north && east, 2, Vector3::new(0, 0, -1), Vector3::new(1, 0, 0)),
                    (north && west, 3, Vector3::new(0, 0, -1), Vector3::new(-1, 0, 0)),
                ];
                let matching: Vec<_> = corners.iter().filter(|c| c.0).collect();
                match matching.as_slice() {
                    [(_, rotation, a, b)] => {
                        let a_sloped = cell::is_sloped(n.at(a.x, a.y, a.z));
                        let b_sloped = cell::is_sloped(n.at(b.x, b.y, b.z));
                        if a_sloped || b_sloped {
                            SlopeShape::CUBE
                        } else {
                            SlopeShape::new(SlopeType::Corner, *rotation)
                        }
                    }
                    _ => SlopeShape::CUBE,
                }
            }
            4 => {
                let diagonals = [
                    (!n.present(-1, 0, 1), 0),
                    (!n.present(1, 0, 1), 1),
                    (!n.present(1, 0, -1), 2),
                    (!n.present(-1, 0, -1), 3),
                ];
                let free: Vec<_> = diagonals.iter().filter(|d| d.0).collect();
                match free.as_slice() {
                    [(_, rotation)] => SlopeShape::new(SlopeType::InvCorner, *rotation),
                    _ => SlopeShape::CUBE,
                }
            }
            _ => SlopeShape::CUBE,
        };
        Some(shape)
    }

    /// Classifies every position against the current store state, then writes
    /// all results back.
    ///
    /// # Returns
    /// The chunks whose cells changed.
    pub fn resolve_positions(
        &self,
        store: &mut ChunkStore,
        positions: &[(Point3<i32>, Point3<i32>)],
    ) -> Vec<Point3<i32>> {
        let writes: Vec<SlopeWrite> = positions
            .iter()
            .filter_map(|&(chunk, local)| {
                let neighborhood = Neighborhood::capture(store, chunk, local);
                self.classify(&neighborhood).map(|shape| SlopeWrite { chunk, local, shape })
            })
            .collect();

        let mut changed = Vec::new();
        let mut mark = |chunk: Point3<i32>| {
            if !changed.contains(&chunk) {
                changed.push(chunk);
            }
        };

        for write in writes {
            let Some(index) = local_index(write.local) else {
                continue;
            };
            let Some(cells) = store.get(write.chunk) else {
                continue;
            };
            let current = cells[index];
            if cell::is_empty(current) {
                continue;
            }

            let updated = cell::with_slope(
                current,
                write.shape.slope_type,
                write.shape.rotation,
                cell::is_flipped(current),
            );
            if updated != current {
                store.set_neighbor_cell(write.chunk, write.local, Vector3::new(0, 0, 0), updated);
                mark(write.chunk);
            }

            if write.shape.slope_type == SlopeType::Corner {
                let down = Vector3::new(0, -1, 0);
                let below = store.neighbor_cell(write.chunk, write.local, down);
                let below_species = self.registry.species(cell::get_id(below));
                if !cell::is_empty(below) && below_species != BlockSpecies::Lava {
                    let propagated = cell::with_id(below, cell::get_id(current));
                    if propagated != below {
                        store.set_neighbor_cell(write.chunk, write.local, down, propagated);
                        let (owner, _) = wrap_local(write.chunk, write.local + down);
                        mark(owner);
                    }
                }
            }
        }

        changed
    }

    /// Resolves every non-empty block of a chunk.
    pub fn resolve_chunk(&self, store: &mut ChunkStore, chunk: Point3<i32>) -> Vec<Point3<i32>> {
        let Some(cells) = store.get(chunk) else {
            return Vec::new();
        };
        let positions: Vec<_> = cells
            .iter()
            .enumerate()
            .filter(|(_, value)| !cell::is_empty(**value))
            .map(|(index, _)| (chunk, local_position(index)))
            .collect();
        self.resolve_positions(store, &positions)
    }

    /// Resolves the layer of every allocated face neighbour that touches
    /// `chunk`. Those cells were classified against whatever `chunk` held
    /// before, usually nothing.
    pub fn resolve_border(&self, store: &mut ChunkStore, chunk: Point3<i32>) -> Vec<Point3<i32>> {
        let mut positions = Vec::new();
        for axis in 0..3 {
            for step in [1, -1] {
                let mut offset = Vector3::new(0, 0, 0);
                offset[axis] = step;
                let neighbor = chunk + offset;
                if !store.contains(neighbor) {
                    continue;
                }
                let layer = if step > 0 { 0 } else { CHUNK_SIZE - 1 };
                for a in 0..CHUNK_SIZE {
                    for b in 0..CHUNK_SIZE {
                        let mut local = Point3::new(0, 0, 0);
                        local[axis] = layer;
                        local[(axis + 1) % 3] = a;
                        local[(axis + 2) % 3] = b;
                        positions.push((neighbor, local));
                    }
                }
            }
        }
        self.resolve_positions(store, &positions)
    }

    /// Resolves the 3×3×3 block around each global position, visiting every
    /// affected cell once.
    pub fn resolve_around(&self, store: &mut ChunkStore, globals: &[Point3<i32>]) -> Vec<Point3<i32>> {
        let mut visited: HashMap<Point3<i32>, BitVec> = HashMap::new();
        let mut positions = Vec::new();

        for global in globals {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    for dx in -1..=1 {
                        let (chunk, local) = global_to_chunk(global + Vector3::new(dx, dy, dz));
                        let Some(index) = local_index(local) else {
                            continue;
                        };
                        let seen = visited
                            .entry(chunk)
                            .or_insert_with(|| BitVec::repeat(false, CHUNK_VOLUME));
                        if seen[index] {
                            continue;
                        }
                        seen.set(index, true);
                        positions.push((chunk, local));
                    }
                }
            }
        }

        self.resolve_positions(store, &positions)
    }
}

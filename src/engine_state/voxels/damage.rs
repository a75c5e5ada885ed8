//! # Damage Controller
//!
//! Applies damage and direct block edits to the store.
//!
//! Damage accumulates in the cell's 5-bit damage field, scaled by the block
//! type's fragility and rounded to the nearest integer. A block whose damage
//! reaches [`MAX_DAMAGE`](cell::MAX_DAMAGE) turns into air and is reported as
//! destroyed. Air and lava are invincible: damaging them is a no-op, which also
//! makes a second hit on an already destroyed block a no-op.
//!
//! Requests of a batch are grouped by chunk and applied in order, so repeated
//! hits on the same block add up. Afterwards the slope resolver is re-run
//! around every destroyed block, since removing a block can turn its
//! neighbours into slope candidates.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::cell::{self, AIR};
use crate::engine_state::voxels::block::{BlockId, BlockRegistry, BlockSpecies, Cell, DamageType};
use crate::engine_state::voxels::chunk::{chunk_origin, global_to_chunk, local_index, local_position, ChunkStore};
use crate::engine_state::voxels::slope::SlopeResolver;

/// One hit on one block.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DamageRequest {
    pub position: Point3<i32>,
    pub amount: f32,
}

/// A block that was turned into air, with the cell it had before.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DestroyedBlock {
    pub position: Point3<i32>,
    pub previous_cell: Cell,
}

/// Receives destroyed blocks, e.g. to spawn particles.
pub trait DestructionListener: Send + Sync {
    fn on_destroyed(&self, destroyed: &[DestroyedBlock]);
}

/// What an edit changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditReport {
    pub destroyed: Vec<DestroyedBlock>,
    /// Chunks whose own cells changed.
    pub changed_chunks: Vec<Point3<i32>>,
    /// Chunks whose mesh may be stale: the changed chunks plus every chunk
    /// that shares a face with a changed cell.
    pub remesh_chunks: Vec<Point3<i32>>,
}

impl EditReport {
    pub fn is_empty(&self) -> bool {
        self.changed_chunks.is_empty()
    }

    fn record(&mut self, global: Point3<i32>) {
        let (chunk, _) = global_to_chunk(global);
        push_unique(&mut self.changed_chunks, chunk);
        push_unique(&mut self.remesh_chunks, chunk);
        for offset in FACE_OFFSETS {
            let (neighbor, _) = global_to_chunk(global + offset);
            push_unique(&mut self.remesh_chunks, neighbor);
        }
    }
}

const FACE_OFFSETS: [Vector3<i32>; 6] = [
    Vector3::new(1, 0, 0),
    Vector3::new(-1, 0, 0),
    Vector3::new(0, 1, 0),
    Vector3::new(0, -1, 0),
    Vector3::new(0, 0, 1),
    Vector3::new(0, 0, -1),
];

fn push_unique(chunks: &mut Vec<Point3<i32>>, chunk: Point3<i32>) {
    if !chunks.contains(&chunk) {
        chunks.push(chunk);
    }
}

pub struct DamageController {
    registry: Arc<BlockRegistry>,
    slopes: SlopeResolver,
}

impl DamageController {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        DamageController {
            slopes: SlopeResolver::new(registry.clone()),
            registry,
        }
    }

    /// Applies one hit.
    pub fn damage(&self, store: &mut ChunkStore, position: Point3<i32>, amount: f32) -> EditReport {
        self.damage_batch(store, &[DamageRequest { position, amount }])
    }

    /// Applies a batch of hits, grouped per chunk.
    pub fn damage_batch(&self, store: &mut ChunkStore, requests: &[DamageRequest]) -> EditReport {
        let mut groups: Vec<(Point3<i32>, Vec<(usize, f32)>)> = Vec::new();
        let mut group_of: HashMap<Point3<i32>, usize> = HashMap::new();
        for request in requests {
            let (chunk, local) = global_to_chunk(request.position);
            let Some(index) = local_index(local) else {
                continue;
            };
            let slot = *group_of.entry(chunk).or_insert_with(|| {
                groups.push((chunk, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push((index, request.amount));
        }

        let mut report = EditReport::default();
        let mut touched = Vec::new();
        for (chunk, hits) in groups {
            let Some(cells) = store.get_mut(chunk) else {
                continue;
            };
            let origin = chunk_origin(chunk);
            for (index, amount) in hits {
                let current = cells[index];
                if cell::is_empty(current) || self.is_lava(current) {
                    continue;
                }

                let id = cell::get_id(current);
                let accumulated = cell::get_damage_amount(current) as f32 + amount * self.registry.fragility(id);
                let damage = accumulated.round().clamp(0.0, cell::MAX_DAMAGE as f32) as u32;
                let global = origin + (local_position(index) - Point3::new(0, 0, 0));

                if damage >= cell::MAX_DAMAGE {
                    cells[index] = AIR;
                    report.destroyed.push(DestroyedBlock {
                        position: global,
                        previous_cell: current,
                    });
                } else {
                    cells[index] = cell::with_damage(current, DamageType::PHYSICAL, damage);
                }
                if cells[index] != current {
                    touched.push(global);
                }
            }
        }

        let destroyed: Vec<_> = report.destroyed.iter().map(|d| d.position).collect();
        self.finish_edit(store, &touched, &destroyed, report)
    }

    /// Replaces the block at `position`, keeping nothing of the old cell.
    /// Ids missing from the registry are rejected and leave the cell alone.
    pub fn set_block(&self, store: &mut ChunkStore, position: Point3<i32>, id: BlockId) -> EditReport {
        if id != 0 && self.registry.get(id).is_none() {
            log::warn!("Ignoring unknown block id {} at {:?}", id, position);
            return EditReport::default();
        }
        let previous = store.cell_at(position);
        let value = cell::pack(id);
        if previous == value {
            return EditReport::default();
        }
        store.set_cell_at(position, value);
        self.finish_edit(store, &[position], &[position], EditReport::default())
    }

    /// Forces a slope shape onto a block. Air and lava are left alone.
    pub fn set_slope(
        &self,
        store: &mut ChunkStore,
        position: Point3<i32>,
        slope_type: cell::SlopeType,
        rotation: u32,
        flipped: bool,
    ) -> EditReport {
        let previous = store.cell_at(position);
        if cell::is_empty(previous) || self.is_lava(previous) {
            return EditReport::default();
        }
        let value = cell::with_slope(previous, slope_type, rotation, flipped);
        if value == previous {
            return EditReport::default();
        }
        store.set_cell_at(position, value);
        let mut report = EditReport::default();
        report.record(position);
        report
    }

    fn finish_edit(
        &self,
        store: &mut ChunkStore,
        touched: &[Point3<i32>],
        occupancy_changed: &[Point3<i32>],
        mut report: EditReport,
    ) -> EditReport {
        for global in touched {
            report.record(*global);
        }
        if !occupancy_changed.is_empty() {
            for chunk in self.slopes.resolve_around(store, occupancy_changed) {
                push_unique(&mut report.changed_chunks, chunk);
                push_unique(&mut report.remesh_chunks, chunk);
            }
        }
        if !report.destroyed.is_empty() {
            log::debug!("{} blocks destroyed", report.destroyed.len());
        }
        report
    }

    fn is_lava(&self, value: Cell) -> bool {
        self.registry.species(cell::get_id(value)) == BlockSpecies::Lava
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::cell::{get_damage_amount, get_damage_type, pack};

    const DIRT: BlockId = 1;
    const STONE: BlockId = 3;
    const LEAVES: BlockId = 5;
    const LAVA: BlockId = 6;

    fn controller() -> DamageController {
        DamageController::new(Arc::new(BlockRegistry::default_catalog().unwrap()))
    }

    #[test]
    fn fragility_scales_and_rounds() {
        let controller = controller();
        let mut store = ChunkStore::new();
        let stone = Point3::new(1, 1, 1);
        let leaves = Point3::new(2, 1, 1);
        store.set_cell_at(stone, pack(STONE));
        store.set_cell_at(leaves, pack(LEAVES));

        controller.damage(&mut store, stone, 5.0);
        controller.damage(&mut store, leaves, 5.0);
        // stone fragility 0.5: 2.5 rounds away from zero
        assert_eq!(get_damage_amount(store.cell_at(stone)), 3);
        assert_eq!(get_damage_type(store.cell_at(stone)), DamageType::PHYSICAL);
        assert_eq!(get_damage_amount(store.cell_at(leaves)), 10);
    }

    #[test]
    fn lava_and_air_ignore_damage() {
        let controller = controller();
        let mut store = ChunkStore::new();
        store.set_cell_at(Point3::new(0, 0, 0), pack(LAVA));
        let report = controller.damage_batch(
            &mut store,
            &[
                DamageRequest { position: Point3::new(0, 0, 0), amount: 100.0 },
                DamageRequest { position: Point3::new(1, 0, 0), amount: 100.0 },
                DamageRequest { position: Point3::new(500, 0, 0), amount: 100.0 },
            ],
        );
        assert!(report.is_empty());
        assert_eq!(store.cell_at(Point3::new(0, 0, 0)), pack(LAVA));
        assert_eq!(store.cell_at(Point3::new(1, 0, 0)), AIR);
    }

    #[test]
    fn batched_hits_on_one_block_accumulate() {
        let controller = controller();
        let mut store = ChunkStore::new();
        let target = Point3::new(3, 3, 3);
        store.set_cell_at(target, pack(DIRT));
        let hit = DamageRequest { position: target, amount: 12.0 };
        let report = controller.damage_batch(&mut store, &[hit, hit]);
        assert!(report.destroyed.is_empty());
        assert_eq!(get_damage_amount(store.cell_at(target)), 24);
    }

    #[test]
    fn border_edits_remesh_the_neighbour() {
        let controller = controller();
        let mut store = ChunkStore::new();
        let target = Point3::new(0, 5, 5);
        store.set_cell_at(target, pack(DIRT));
        let report = controller.damage(&mut store, target, 40.0);
        assert_eq!(report.destroyed.len(), 1);
        assert_eq!(report.changed_chunks, vec![Point3::new(0, 0, 0)]);
        assert!(report.remesh_chunks.contains(&Point3::new(-1, 0, 0)));
    }

    #[test]
    fn set_block_reports_and_resolves_slopes() {
        let controller = controller();
        let mut store = ChunkStore::new();
        store.set_cell_at(Point3::new(4, 0, 4), pack(STONE));
        store.set_cell_at(Point3::new(4, 0, 5), pack(STONE));
        store.set_cell_at(Point3::new(4, 1, 5), pack(STONE));

        let report = controller.set_block(&mut store, Point3::new(4, 1, 4), DIRT);
        assert_eq!(report.changed_chunks, vec![Point3::new(0, 0, 0)]);
        let placed = store.cell_at(Point3::new(4, 1, 4));
        assert_eq!(cell::get_id(placed), DIRT);
        assert_eq!(cell::get_slope_type(placed), cell::SlopeType::Side);
    }

    #[test]
    fn set_block_rejects_unregistered_ids() {
        let controller = controller();
        let mut store = ChunkStore::new();
        let target = Point3::new(2, 2, 2);
        store.set_cell_at(target, pack(DIRT));

        let report = controller.set_block(&mut store, target, 999);
        assert!(report.is_empty());
        assert_eq!(store.cell_at(target), pack(DIRT));

        // clearing with air is always allowed
        let report = controller.set_block(&mut store, target, 0);
        assert_eq!(report.changed_chunks, vec![Point3::new(0, 0, 0)]);
        assert_eq!(store.cell_at(target), AIR);
    }
}

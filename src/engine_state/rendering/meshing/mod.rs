//! Mesh generation for voxel chunks.
//!
//! This module turns a chunk's cells into render surfaces. The key goals are:
//! 1. Emit only faces that can be seen
//! 2. Merge coplanar faces of identical cells into as few quads as possible
//! 3. Never merge faces whose cells differ in any bit, so damage and slope
//!    state always survive into the vertex metadata
//!
//! # Architecture
//! - `PaddedChunk`: the chunk plus a one-cell border, copied out under the
//!   store lock
//! - `greedy`: binary face masks and the plane merger
//! - `slope_geometry`: ramp, corner and inner-corner shapes
//! - `mesh`: the surface and vertex containers handed to the renderer
//!
//! Full cubes go through the greedy path. Sloped cells count as empty there,
//! so neighbouring cubes keep the faces the slope leaves uncovered, and are
//! emitted per cell from their slope geometry instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use cgmath::{EuclideanSpace, Point3, Vector3};

mod greedy;
mod mesh;
mod padded;
mod slope_geometry;

pub use greedy::{greedy_mesh_plane, GreedyRect};
pub use mesh::{plane_axes, ChunkMesh, MeshQuad, Surface, SurfaceMesh};
pub use padded::PaddedChunk;
pub use slope_geometry::{slope_polygons, SlopePolygon};

use greedy::{ascending_faces, descending_faces, FacePlane};

use crate::engine_state::rendering::vertex::FaceMetadata;
use crate::engine_state::voxels::block::cell;
use crate::engine_state::voxels::block::{BlockId, BlockRegistry, BlockSide, BlockSpecies, Cell};
use crate::engine_state::voxels::chunk::{CHUNK_SIZE, CHUNK_SIZE_PADDED};

const P: usize = CHUNK_SIZE_PADDED;
const COLUMNS: usize = P * P;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Occupancy {
    Empty,
    Opaque,
    Lava,
}

/// Occupancy columns for the three axes, indexed `u + v * 32`.
struct Columns {
    opaque: [Vec<u32>; 3],
    lava: [Vec<u32>; 3],
}

impl Columns {
    fn new() -> Self {
        Columns {
            opaque: [vec![0; COLUMNS], vec![0; COLUMNS], vec![0; COLUMNS]],
            lava: [vec![0; COLUMNS], vec![0; COLUMNS], vec![0; COLUMNS]],
        }
    }

    fn set(target: &mut [Vec<u32>; 3], x: usize, y: usize, z: usize) {
        target[0][z + y * P] |= 1 << x;
        target[1][x + z * P] |= 1 << y;
        target[2][x + y * P] |= 1 << z;
    }
}

/// Builds chunk meshes. Holds only the block registry, so one instance can be
/// shared by every worker.
pub struct ChunkMesher {
    registry: Arc<BlockRegistry>,
}

impl ChunkMesher {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        ChunkMesher { registry }
    }

    fn occupancy(&self, value: Cell) -> Occupancy {
        if cell::is_empty(value) {
            Occupancy::Empty
        } else if self.registry.species(cell::get_id(value)) == BlockSpecies::Lava {
            Occupancy::Lava
        } else if cell::is_sloped(value) {
            Occupancy::Empty
        } else {
            Occupancy::Opaque
        }
    }

    /// Greedy-merged quads of every visible full-cube face.
    ///
    /// Faces are bucketed by exact cell value and by depth, and each bucket's
    /// plane is merged on its own. Lava faces are culled against lava and
    /// opaque cells; opaque faces only against opaque cells.
    pub fn build_quads(&self, padded: &PaddedChunk) -> Vec<MeshQuad> {
        let mut columns = Columns::new();
        for y in 0..P {
            for z in 0..P {
                for x in 0..P {
                    match self.occupancy(padded.get(x as i32, y as i32, z as i32)) {
                        Occupancy::Empty => {}
                        Occupancy::Opaque => Columns::set(&mut columns.opaque, x, y, z),
                        Occupancy::Lava => Columns::set(&mut columns.lava, x, y, z),
                    }
                }
            }
        }

        let mut quads = Vec::new();
        let mut rects = Vec::new();
        for axis in 0..3 {
            let (u_axis, v_axis) = plane_axes(axis);
            for positive in [true, false] {
                let side = BlockSide::from_axis(axis, positive);
                let faces = if positive { ascending_faces } else { descending_faces };

                let mut planes: BTreeMap<(Cell, u32), FacePlane> = BTreeMap::new();
                for v in 1..=CHUNK_SIZE as usize {
                    for u in 1..=CHUNK_SIZE as usize {
                        let column = u + v * P;
                        let opaque = columns.opaque[axis][column];
                        let lava = columns.lava[axis][column];
                        let mut visible = faces(opaque, opaque) | faces(lava, opaque | lava);

                        while visible != 0 {
                            let depth = visible.trailing_zeros();
                            visible &= visible - 1;

                            let mut p = [0i32; 3];
                            p[axis] = depth as i32;
                            p[u_axis] = u as i32;
                            p[v_axis] = v as i32;
                            let value = padded.get(p[0], p[1], p[2]);

                            planes.entry((value, depth)).or_insert([0; CHUNK_SIZE as usize])[v - 1] |=
                                1 << (u - 1);
                        }
                    }
                }

                for ((value, depth), mut plane) in planes {
                    rects.clear();
                    greedy_mesh_plane(&mut plane, &mut rects);
                    for rect in &rects {
                        let mut position = Point3::new(0, 0, 0);
                        position[axis] = depth as i32 - 1;
                        position[u_axis] = rect.col as i32;
                        position[v_axis] = rect.row as i32;
                        quads.push(MeshQuad {
                            side,
                            position,
                            width: rect.width,
                            height: rect.height,
                            cell: value,
                        });
                    }
                }
            }
        }
        quads
    }

    /// Meshes a chunk into its render surfaces.
    pub fn build(&self, padded: &PaddedChunk, revision: u64) -> ChunkMesh {
        let mut mesh = ChunkMesh::new(padded.chunk, revision);

        for quad in self.build_quads(padded) {
            let id = cell::get_id(quad.cell);
            let surface = self.route(id, quad.side);
            let metadata = self.metadata(quad.cell, quad.side, quad.width, quad.height, surface);
            let (w, h) = (quad.width as f32, quad.height as f32);
            let uvs = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
            let normal = quad.side.normal().cast::<f32>().unwrap_or(Vector3::new(0.0, 0.0, 0.0));
            mesh.surface_mut(surface)
                .push_polygon(&quad.corners(), &uvs, normal, metadata);
        }

        self.push_slopes(padded, &mut mesh);
        mesh
    }

    fn push_slopes(&self, padded: &PaddedChunk, mesh: &mut ChunkMesh) {
        for y in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let value = padded.local(Point3::new(x, y, z));
                    if !cell::is_sloped(value) || self.occupancy(value) == Occupancy::Lava || cell::is_empty(value) {
                        continue;
                    }
                    let id = cell::get_id(value);
                    let flipped = cell::is_flipped(value);
                    let polygons = slope_polygons(
                        cell::get_slope_type(value),
                        cell::get_slope_rotation(value),
                        flipped,
                        |side| {
                            let n = side.normal();
                            self.occupancy(padded.local(Point3::new(x + n.x, y + n.y, z + n.z))) == Occupancy::Opaque
                        },
                    );

                    let centre = Point3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
                    for polygon in polygons {
                        let side = polygon.texture_side(flipped);
                        let surface = self.route(id, side);
                        let metadata = self.metadata(value, side, 1, 1, surface);
                        let (u_axis, v_axis) = plane_axes(side.axis());

                        let corners: Vec<Point3<f32>> = polygon.corners.iter().map(|c| centre + c.to_vec()).collect();
                        let uvs: Vec<[f32; 2]> = polygon
                            .corners
                            .iter()
                            .map(|c| [c[u_axis] + 0.5, c[v_axis] + 0.5])
                            .collect();
                        mesh.surface_mut(surface)
                            .push_polygon(&corners, &uvs, polygon.normal, metadata);
                    }
                }
            }
        }
    }

    fn route(&self, id: BlockId, side: BlockSide) -> Surface {
        match self.registry.species(id) {
            BlockSpecies::Grass if side == BlockSide::TOP => Surface::GrassTop,
            BlockSpecies::Lava => Surface::Lava,
            BlockSpecies::Leaves | BlockSpecies::Totem => Surface::Secondary,
            _ => Surface::Opaque,
        }
    }

    fn metadata(&self, value: Cell, side: BlockSide, width: u32, height: u32, surface: Surface) -> FaceMetadata {
        if surface == Surface::Lava {
            return FaceMetadata::default();
        }
        FaceMetadata {
            texture_index: self.registry.texture_index(cell::get_id(value), side),
            uv_scale_x: width,
            uv_scale_y: height,
            damage: cell::get_damage_amount(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::cell::{pack, pack_damage, pack_slope};
    use crate::engine_state::voxels::block::{DamageType, SlopeType};
    use crate::engine_state::voxels::chunk::{local_index, ChunkStore, CHUNK_VOLUME};

    const DIRT: BlockId = 1;
    const GRASS: BlockId = 2;
    const STONE: BlockId = 3;
    const LAVA: BlockId = 6;

    fn mesher() -> ChunkMesher {
        ChunkMesher::new(Arc::new(BlockRegistry::default_catalog().unwrap()))
    }

    fn chunk_with(cells: &[(Point3<i32>, Cell)]) -> PaddedChunk {
        let mut interior = vec![cell::AIR; CHUNK_VOLUME];
        for (local, value) in cells {
            interior[local_index(*local).unwrap()] = *value;
        }
        PaddedChunk::from_cells(Point3::new(0, 0, 0), &interior)
    }

    #[test]
    fn single_block_has_six_faces() {
        let quads = mesher().build_quads(&chunk_with(&[(Point3::new(3, 3, 3), pack(STONE))]));
        assert_eq!(quads.len(), 6);
        let mut sides: Vec<_> = quads.iter().map(|q| q.side).collect();
        sides.sort();
        let mut expected = BlockSide::all().to_vec();
        expected.sort();
        assert_eq!(sides, expected);
        assert!(quads.iter().all(|q| q.area() == 1));
    }

    #[test]
    fn different_damage_never_merges() {
        let damaged = pack(STONE) | pack_damage(DamageType::PHYSICAL, 4);
        let quads = mesher().build_quads(&chunk_with(&[
            (Point3::new(0, 0, 0), pack(STONE)),
            (Point3::new(1, 0, 0), damaged),
        ]));
        let tops: Vec<_> = quads.iter().filter(|q| q.side == BlockSide::TOP).collect();
        assert_eq!(tops.len(), 2);
        assert!(tops.iter().any(|q| q.cell == damaged));
    }

    #[test]
    fn lava_faces_hide_against_lava_but_stone_shows_against_lava() {
        let quads = mesher().build_quads(&chunk_with(&[
            (Point3::new(0, 0, 0), pack(LAVA)),
            (Point3::new(1, 0, 0), pack(LAVA)),
            (Point3::new(2, 0, 0), pack(STONE)),
        ]));
        let stone_left = quads
            .iter()
            .any(|q| q.side == BlockSide::LEFT && cell::get_id(q.cell) == STONE);
        let lava_right = quads
            .iter()
            .any(|q| q.side == BlockSide::RIGHT && cell::get_id(q.cell) == LAVA);
        assert!(stone_left);
        assert!(!lava_right);
    }

    #[test]
    fn surfaces_follow_species() {
        let mesh = mesher().build(
            &chunk_with(&[(Point3::new(0, 0, 0), pack(GRASS)), (Point3::new(5, 0, 0), pack(LAVA))]),
            7,
        );
        assert_eq!(mesh.revision, 7);
        assert_eq!(mesh.surface(Surface::GrassTop).triangle_count(), 2);
        assert_eq!(mesh.surface(Surface::Opaque).triangle_count(), 10);
        let lava = mesh.surface(Surface::Lava);
        assert_eq!(lava.triangle_count(), 12);
        assert!(lava.vertices.iter().all(|v| v.metadata == [0; 4]));
    }

    #[test]
    fn metadata_carries_texture_scale_and_damage() {
        let damaged = pack(DIRT) | pack_damage(DamageType::PHYSICAL, 9);
        let mesh = mesher().build(
            &chunk_with(&[(Point3::new(0, 0, 0), damaged), (Point3::new(1, 0, 0), damaged)]),
            0,
        );
        let opaque = mesh.surface(Surface::Opaque);
        let registry = BlockRegistry::default_catalog().unwrap();
        let top_texture = registry.texture_index(DIRT, BlockSide::TOP);
        let wide = opaque
            .vertices
            .iter()
            .find(|v| v.normal == [0.0, 1.0, 0.0])
            .unwrap();
        assert_eq!(wide.metadata, [top_texture, 2, 1, 9]);
    }

    #[test]
    fn sloped_cells_leave_neighbour_faces_visible() {
        let ramp = pack(DIRT) | pack_slope(SlopeType::Side, 0);
        let padded = chunk_with(&[(Point3::new(0, 0, 0), pack(STONE)), (Point3::new(1, 0, 0), ramp)]);
        let quads = mesher().build_quads(&padded);
        assert_eq!(quads.len(), 6);

        let mesh = mesher().build(&padded, 0);
        // 6 cube faces plus the ramp: bottom, back, slant, one side
        // triangle, the other side hidden by the stone
        assert_eq!(mesh.surface(Surface::Opaque).triangle_count(), 12 + 2 + 2 + 2 + 1);
    }

    #[test]
    fn chunk_borders_cull_against_neighbours() {
        let mut store = ChunkStore::new();
        store.set_cell_at(Point3::new(CHUNK_SIZE - 1, 0, 0), pack(STONE));
        store.set_cell_at(Point3::new(CHUNK_SIZE, 0, 0), pack(STONE));
        let padded = PaddedChunk::capture(&store, Point3::new(0, 0, 0)).unwrap();
        let quads = mesher().build_quads(&padded);
        assert_eq!(quads.len(), 5);
        assert!(quads.iter().all(|q| q.side != BlockSide::RIGHT));
    }
}

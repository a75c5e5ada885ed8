//! Mesh data structures produced by the chunk mesher.
//!
//! A chunk mesh is split into one [`SurfaceMesh`] per render surface so the
//! external renderer can draw each with its own material: opaque blocks, grass
//! tops, lava, and the secondary surface used by foliage and totems.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Vector3};

use crate::engine_state::rendering::vertex::{FaceMetadata, Vertex};
use crate::engine_state::voxels::block::{BlockSide, Cell};
use crate::engine_state::voxels::chunk::chunk_origin;

/// Render surface a face is routed to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Surface {
    Opaque = 0,
    GrassTop = 1,
    Lava = 2,
    Secondary = 3,
}

impl Surface {
    pub fn all() -> [Surface; 4] {
        [Surface::Opaque, Surface::GrassTop, Surface::Lava, Surface::Secondary]
    }

    /// Whether faces of this surface take part in collision.
    pub fn is_solid(self) -> bool {
        self != Surface::Lava
    }
}

/// A greedy-merged rectangle of identical block faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshQuad {
    pub side: BlockSide,
    /// Chunk-local cell at the quad's minimum corner.
    pub position: Point3<i32>,
    /// Extent in cells along the first plane axis.
    pub width: u32,
    /// Extent in cells along the second plane axis.
    pub height: u32,
    /// The exact cell value shared by every face of the quad.
    pub cell: Cell,
}

/// The two axes spanning a face plane perpendicular to `axis`.
///
/// X faces span (z, y), Y faces span (x, z) and Z faces span (x, y).
pub fn plane_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (2, 1),
        1 => (0, 2),
        _ => (0, 1),
    }
}

fn unit(axis: usize) -> Vector3<f32> {
    let mut v = Vector3::new(0.0, 0.0, 0.0);
    v[axis] = 1.0;
    v
}

impl MeshQuad {
    /// Corners in chunk-local space: origin, origin + u, origin + u + v,
    /// origin + v.
    pub fn corners(&self) -> [Point3<f32>; 4] {
        let axis = self.side.axis();
        let (u, v) = plane_axes(axis);
        let mut base = self.position.cast::<f32>().unwrap_or(Point3::new(0.0, 0.0, 0.0));
        if self.side.is_positive() {
            base[axis] += 1.0;
        }
        let e_u = unit(u) * self.width as f32;
        let e_v = unit(v) * self.height as f32;
        [base, base + e_u, base + e_u + e_v, base + e_v]
    }

    /// Number of cells covered by the quad.
    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Vertices and triangle indices of one surface.
#[derive(Clone, Debug)]
pub struct SurfaceMesh {
    pub surface: Surface,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    pub fn new(surface: Surface) -> Self {
        SurfaceMesh {
            surface,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Appends a convex planar polygon as a triangle fan.
    ///
    /// The corner order is reversed when needed so the triangles wind
    /// counter-clockwise seen from the `outward` side.
    pub fn push_polygon(
        &mut self,
        corners: &[Point3<f32>],
        uvs: &[[f32; 2]],
        outward: Vector3<f32>,
        metadata: FaceMetadata,
    ) {
        if corners.len() < 3 || corners.len() != uvs.len() {
            return;
        }
        let winding = (corners[1] - corners[0]).cross(corners[2] - corners[0]);
        let reversed = winding.dot(outward) < 0.0;
        let normal = outward.normalize();

        let start = self.vertices.len() as u32;
        let order: Vec<usize> = if reversed {
            (0..corners.len()).rev().collect()
        } else {
            (0..corners.len()).collect()
        };
        for i in order {
            self.vertices.push(Vertex::new(corners[i], normal, uvs[i], metadata));
        }
        for i in 1..(corners.len() as u32 - 1) {
            self.indices.extend_from_slice(&[start, start + i, start + i + 1]);
        }
    }

    /// Triangles in chunk-local space.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                self.vertices[tri[0] as usize].position(),
                self.vertices[tri[1] as usize].position(),
                self.vertices[tri[2] as usize].position(),
            ]
        })
    }
}

/// All surfaces of one chunk.
#[derive(Clone, Debug)]
pub struct ChunkMesh {
    pub coord: Point3<i32>,
    /// Revision of the chunk's content the mesh was built from. The engine
    /// discards meshes older than the installed one.
    pub revision: u64,
    pub surfaces: [SurfaceMesh; 4],
}

impl ChunkMesh {
    pub fn new(coord: Point3<i32>, revision: u64) -> Self {
        ChunkMesh {
            coord,
            revision,
            surfaces: Surface::all().map(SurfaceMesh::new),
        }
    }

    pub fn surface(&self, surface: Surface) -> &SurfaceMesh {
        &self.surfaces[surface as usize]
    }

    pub fn surface_mut(&mut self, surface: Surface) -> &mut SurfaceMesh {
        &mut self.surfaces[surface as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.iter().all(SurfaceMesh::is_empty)
    }

    pub fn vertex_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.vertices.len()).sum()
    }

    /// World-space offset of the chunk-local vertex positions.
    pub fn world_offset(&self) -> Vector3<f32> {
        chunk_origin(self.coord)
            .cast::<f32>()
            .map(|p| p.to_vec())
            .unwrap_or(Vector3::new(0.0, 0.0, 0.0))
    }

    /// World-space triangles of every solid surface, for the physics
    /// collaborator. Lava is left out.
    pub fn collision_triangles(&self) -> Vec<[Point3<f32>; 3]> {
        let offset = self.world_offset();
        self.surfaces
            .iter()
            .filter(|s| s.surface.is_solid())
            .flat_map(|s| s.triangles())
            .map(|tri| tri.map(|p| p + offset))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_corners_sit_on_the_outer_plane() {
        let quad = MeshQuad {
            side: BlockSide::TOP,
            position: Point3::new(1, 2, 3),
            width: 2,
            height: 3,
            cell: 1,
        };
        let corners = quad.corners();
        assert!(corners.iter().all(|c| c.y == 3.0));
        assert_eq!(corners[2], Point3::new(3.0, 3.0, 6.0));
        assert_eq!(quad.area(), 6);
    }

    #[test]
    fn polygons_wind_towards_the_outward_normal() {
        let mut mesh = SurfaceMesh::new(Surface::Opaque);
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        mesh.push_polygon(&corners, &uvs, Vector3::new(0.0, 1.0, 0.0), FaceMetadata::default());
        mesh.push_polygon(&corners, &uvs, Vector3::new(0.0, -1.0, 0.0), FaceMetadata::default());

        assert_eq!(mesh.triangle_count(), 4);
        let triangles: Vec<_> = mesh.triangles().collect();
        let normal = |t: &[Point3<f32>; 3]| (t[1] - t[0]).cross(t[2] - t[0]);
        assert!(normal(&triangles[0]).y > 0.0);
        assert!(normal(&triangles[2]).y < 0.0);
    }

    #[test]
    fn lava_has_no_collision() {
        let mut mesh = ChunkMesh::new(Point3::new(1, 0, 0), 0);
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
        ];
        let uvs = [[0.0, 0.0]; 3];
        let up = Vector3::new(0.0, 1.0, 0.0);
        mesh.surface_mut(Surface::Lava)
            .push_polygon(&corners, &uvs, up, FaceMetadata::default());
        assert!(mesh.collision_triangles().is_empty());

        mesh.surface_mut(Surface::Opaque)
            .push_polygon(&corners, &uvs, up, FaceMetadata::default());
        let triangles = mesh.collision_triangles();
        assert_eq!(triangles.len(), 1);
        assert!(triangles[0].contains(&Point3::new(30.0, 0.0, 0.0)));
        assert!(triangles[0].contains(&Point3::new(31.0, 0.0, 1.0)));
    }
}

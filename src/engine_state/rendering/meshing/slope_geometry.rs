//! Geometry of sloped blocks.
//!
//! Each slope type has one canonical shape at rotation 0, built in a unit cube
//! centred on the origin. North is -Z, east +X, south +Z and west -X.
//!
//! * `Side`: a ramp, high along the north edge and low along the south edge.
//!   It has no south face and no top face.
//! * `Corner`: a pyramid whose only raised point is the south-west top corner.
//! * `InvCorner`: a cube whose south-west top corner is pushed down to the
//!   bottom, leaving a flat top triangle and a slanted triangle.
//!
//! A rotation step maps (x, z) to (z, -x), i.e. south to east, and the flip bit
//! mirrors the shape vertically. Winding is not stored: every polygon is
//! oriented away from the shape's centre after transformation.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::engine_state::voxels::block::{BlockSide, SlopeType};

const L: f32 = -0.5;
const H: f32 = 0.5;

struct Template {
    side: Option<BlockSide>,
    corners: &'static [[f32; 3]],
}

const fn face(side: BlockSide, corners: &'static [[f32; 3]]) -> Template {
    Template { side: Some(side), corners }
}

const fn slant(corners: &'static [[f32; 3]]) -> Template {
    Template { side: None, corners }
}

const SIDE: [Template; 5] = [
    face(BlockSide::BOTTOM, &[[L, L, L], [H, L, L], [H, L, H], [L, L, H]]),
    face(BlockSide::BACK, &[[L, L, L], [H, L, L], [H, H, L], [L, H, L]]),
    face(BlockSide::LEFT, &[[L, L, L], [L, H, L], [L, L, H]]),
    face(BlockSide::RIGHT, &[[H, L, L], [H, H, L], [H, L, H]]),
    slant(&[[L, H, L], [H, H, L], [H, L, H], [L, L, H]]),
];

const CORNER: [Template; 5] = [
    face(BlockSide::BOTTOM, &[[L, L, L], [H, L, L], [H, L, H], [L, L, H]]),
    face(BlockSide::LEFT, &[[L, L, L], [L, L, H], [L, H, H]]),
    face(BlockSide::FRONT, &[[L, L, H], [H, L, H], [L, H, H]]),
    slant(&[[L, H, H], [L, L, L], [H, L, L]]),
    slant(&[[L, H, H], [H, L, L], [H, L, H]]),
];

const INV_CORNER: [Template; 7] = [
    face(BlockSide::BOTTOM, &[[L, L, L], [H, L, L], [H, L, H], [L, L, H]]),
    face(BlockSide::BACK, &[[L, L, L], [H, L, L], [H, H, L], [L, H, L]]),
    face(BlockSide::RIGHT, &[[H, L, L], [H, L, H], [H, H, H], [H, H, L]]),
    face(BlockSide::LEFT, &[[L, L, L], [L, L, H], [L, H, L]]),
    face(BlockSide::FRONT, &[[L, L, H], [H, L, H], [H, H, H]]),
    face(BlockSide::TOP, &[[L, H, L], [H, H, L], [H, H, H]]),
    slant(&[[L, H, L], [H, H, H], [L, L, H]]),
];

/// One polygon of a transformed slope shape.
#[derive(Clone, Debug, PartialEq)]
pub struct SlopePolygon {
    /// The cube face the polygon lies on, or `None` for slanted faces.
    pub side: Option<BlockSide>,
    /// Corners relative to the cell centre, counter-clockwise seen from
    /// outside.
    pub corners: Vec<Point3<f32>>,
    pub normal: Vector3<f32>,
}

impl SlopePolygon {
    /// The face whose texture and surface a slanted polygon borrows.
    pub fn texture_side(&self, flipped: bool) -> BlockSide {
        self.side.unwrap_or(if flipped { BlockSide::BOTTOM } else { BlockSide::TOP })
    }
}

fn templates(slope_type: SlopeType) -> &'static [Template] {
    match slope_type {
        SlopeType::None => &[],
        SlopeType::Side => &SIDE,
        SlopeType::Corner => &CORNER,
        SlopeType::InvCorner => &INV_CORNER,
    }
}

fn transform(corner: [f32; 3], rotation: u32, flipped: bool) -> Point3<f32> {
    let [mut x, mut y, mut z] = corner;
    for _ in 0..(rotation % 4) {
        (x, z) = (z, -x);
    }
    if flipped {
        y = -y;
    }
    Point3::new(x, y, z)
}

/// Builds the polygons of a slope shape.
///
/// `occluded` is asked for every polygon lying on a cube face; polygons whose
/// face is covered by an opaque neighbour are dropped. `SlopeType::None`
/// yields nothing, full cubes go through the greedy mesher.
pub fn slope_polygons(
    slope_type: SlopeType,
    rotation: u32,
    flipped: bool,
    mut occluded: impl FnMut(BlockSide) -> bool,
) -> Vec<SlopePolygon> {
    let shape: Vec<(Option<BlockSide>, Vec<Point3<f32>>)> = templates(slope_type)
        .iter()
        .map(|template| {
            let side = template.side.map(|s| {
                let rotated = s.rotated_y(rotation);
                if flipped { rotated.flipped_y() } else { rotated }
            });
            let corners = template
                .corners
                .iter()
                .map(|c| transform(*c, rotation, flipped))
                .collect();
            (side, corners)
        })
        .collect();

    let all: Vec<&Point3<f32>> = shape.iter().flat_map(|(_, corners)| corners).collect();
    if all.is_empty() {
        return Vec::new();
    }
    let centre = all
        .iter()
        .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + (**p - Point3::new(0.0, 0.0, 0.0)))
        / all.len() as f32;

    shape
        .into_iter()
        .filter(|(side, _)| side.map_or(true, |s| !occluded(s)))
        .map(|(side, mut corners)| {
            let mut normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize();
            let polygon_centre = corners
                .iter()
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, p| acc + (*p - Point3::new(0.0, 0.0, 0.0)))
                / corners.len() as f32;
            if normal.dot(polygon_centre - centre) < 0.0 {
                corners.reverse();
                normal = -normal;
            }
            SlopePolygon { side, corners, normal }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn cubes_have_no_slope_geometry() {
        assert!(slope_polygons(SlopeType::None, 0, false, |_| false).is_empty());
    }

    #[test]
    fn side_ramp_faces_south_and_up() {
        let polygons = slope_polygons(SlopeType::Side, 0, false, |_| false);
        assert_eq!(polygons.len(), 5);
        assert!(polygons.iter().all(|p| p.side != Some(BlockSide::FRONT)));
        let ramp = polygons.iter().find(|p| p.side.is_none()).unwrap();
        let expected = Vector3::new(0.0, 1.0, 1.0).normalize();
        assert_close(ramp.normal, expected);
    }

    #[test]
    fn rotation_turns_south_into_east() {
        let polygons = slope_polygons(SlopeType::Side, 1, false, |_| false);
        let ramp = polygons.iter().find(|p| p.side.is_none()).unwrap();
        assert_close(ramp.normal, Vector3::new(1.0, 1.0, 0.0).normalize());
        assert!(polygons.iter().any(|p| p.side == Some(BlockSide::LEFT)));
        assert!(polygons.iter().all(|p| p.side != Some(BlockSide::RIGHT)));
    }

    #[test]
    fn flipped_shapes_hang_from_the_ceiling() {
        let polygons = slope_polygons(SlopeType::Side, 0, true, |_| false);
        assert!(polygons.iter().any(|p| p.side == Some(BlockSide::TOP)));
        let ramp = polygons.iter().find(|p| p.side.is_none()).unwrap();
        assert_close(ramp.normal, Vector3::new(0.0, -1.0, 1.0).normalize());
    }

    #[test]
    fn face_normals_match_their_cube_side() {
        for slope_type in [SlopeType::Side, SlopeType::Corner, SlopeType::InvCorner] {
            for rotation in 0..4 {
                for flipped in [false, true] {
                    for polygon in slope_polygons(slope_type, rotation, flipped, |_| false) {
                        if let Some(side) = polygon.side {
                            assert_close(polygon.normal, side.normal().cast::<f32>().unwrap());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn occluded_faces_are_dropped() {
        let polygons = slope_polygons(SlopeType::InvCorner, 0, false, |side| side == BlockSide::BOTTOM);
        assert_eq!(polygons.len(), 6);
        assert!(polygons.iter().all(|p| p.side != Some(BlockSide::BOTTOM)));
    }

    #[test]
    fn corner_apex_points_up_and_out() {
        let polygons = slope_polygons(SlopeType::Corner, 0, false, |_| false);
        let slants: Vec<_> = polygons.iter().filter(|p| p.side.is_none()).collect();
        assert_eq!(slants.len(), 2);
        for slant in slants {
            assert!(slant.normal.y > 0.0);
            assert!(slant.normal.x >= 0.0 && slant.normal.z <= 0.0);
        }
    }
}

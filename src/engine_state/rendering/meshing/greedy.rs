//! Binary greedy meshing.
//!
//! Occupancy is stored as one `u32` column per (u, v) line of the padded
//! chunk, with bit `d` set when the cell at depth `d` along the axis is
//! occupied. Visible faces fall out of two shifts and a mask, and coplanar
//! faces of identical cells are merged into rectangles one 32-bit row at a
//! time.

use crate::engine_state::voxels::chunk::CHUNK_SIZE;

/// Bits 1..=30 of a padded column: the chunk's own cells.
pub const INTERIOR_MASK: u32 = 0x7FFF_FFFE;

/// One face plane: row `v`, bit `u`, both in chunk-local coordinates.
pub type FacePlane = [u32; CHUNK_SIZE as usize];

/// A merged rectangle of a face plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GreedyRect {
    /// First row (v).
    pub row: u32,
    /// First bit (u).
    pub col: u32,
    /// Extent along the bits (u).
    pub width: u32,
    /// Extent along the rows (v).
    pub height: u32,
}

/// Faces looking towards +axis: occupied cells whose next cell is free.
#[inline]
pub fn ascending_faces(occupied: u32, blockers: u32) -> u32 {
    occupied & !(blockers >> 1) & INTERIOR_MASK
}

/// Faces looking towards -axis: occupied cells whose previous cell is free.
#[inline]
pub fn descending_faces(occupied: u32, blockers: u32) -> u32 {
    occupied & !(blockers << 1) & INTERIOR_MASK
}

/// Merges the set bits of `plane` into rectangles, consuming the plane.
///
/// Each row is scanned for runs of set bits; a run grows into the following
/// rows for as long as they contain the whole run, and the covered bits are
/// cleared so every bit lands in exactly one rectangle.
pub fn greedy_mesh_plane(plane: &mut [u32], rects: &mut Vec<GreedyRect>) {
    let rows = plane.len();
    for row in 0..rows {
        let mut col = 0;
        while col < u32::BITS {
            let remaining = plane[row] >> col;
            if remaining == 0 {
                break;
            }
            col += remaining.trailing_zeros();

            let width = (plane[row] >> col).trailing_ones();
            let run = if width >= u32::BITS { u32::MAX } else { (1u32 << width) - 1 };
            let mask = run << col;

            let mut height = 1;
            while row + height < rows && (plane[row + height] >> col) & run == run {
                plane[row + height] &= !mask;
                height += 1;
            }
            plane[row] &= !mask;

            rects.push(GreedyRect {
                row: row as u32,
                col,
                width,
                height: height as u32,
            });
            col += width;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(mut plane: Vec<u32>) -> Vec<GreedyRect> {
        let mut rects = Vec::new();
        greedy_mesh_plane(&mut plane, &mut rects);
        assert!(plane.iter().all(|row| *row == 0));
        rects
    }

    #[test]
    fn square_merges_into_one_rect() {
        let rects = mesh(vec![0b1111, 0b1111, 0b1111, 0b1111]);
        assert_eq!(
            rects,
            vec![GreedyRect {
                row: 0,
                col: 0,
                width: 4,
                height: 4
            }]
        );
    }

    #[test]
    fn checkerboard_never_merges() {
        let rects = mesh(vec![0b0101, 0b1010, 0b0101, 0b1010]);
        assert_eq!(rects.len(), 8);
        assert!(rects.iter().all(|r| r.width == 1 && r.height == 1));
    }

    #[test]
    fn narrower_rows_stop_the_expansion() {
        let rects = mesh(vec![0b0111, 0b0111, 0b0011]);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0], GreedyRect { row: 0, col: 0, width: 3, height: 2 });
        assert_eq!(rects[1], GreedyRect { row: 2, col: 0, width: 2, height: 1 });
    }

    #[test]
    fn full_width_rows() {
        let rects = mesh(vec![u32::MAX, u32::MAX]);
        assert_eq!(rects, vec![GreedyRect { row: 0, col: 0, width: 32, height: 2 }]);
    }

    #[test]
    fn face_masks_respect_blockers_and_padding() {
        // cells 1..=3 solid, cell 4 blocked by something else
        let solid = 0b1110;
        assert_eq!(ascending_faces(solid, solid), 0b1000);
        assert_eq!(descending_faces(solid, solid), 0b0010);
        assert_eq!(ascending_faces(solid, solid | 0b10000), 0);
        // padding bits never produce faces
        assert_eq!(ascending_faces(u32::MAX, 0), INTERIOR_MASK);
    }
}

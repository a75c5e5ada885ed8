//! # Chunk Module
//!
//! Chunks are fixed-size cubes of packed cells and the unit of generation,
//! meshing and storage. A chunk is stored as a flat `Vec<Cell>` of
//! `CHUNK_SIZE³` entries.
//!
//! ## Index layout
//!
//! Cells are laid out x-fastest, then z, then y:
//!
//! ```text
//! index = x + z * CHUNK_SIZE + y * CHUNK_SIZE²
//! ```
//!
//! Every piece of code that touches a chunk array (generation, slopes, damage,
//! meshing, persistence) goes through [`local_index`] / [`local_position`], so
//! the axis order is defined in exactly one place.
//!
//! ## Padding
//!
//! `CHUNK_SIZE` is 30 so that a chunk plus a one-cell border on each side is
//! 32 cells wide and every padded column fits a single `u32` bitmask.

use cgmath::{Point3, Vector3};

pub mod codec;
pub mod store;

pub use codec::ChunkCodecError;
pub use store::ChunkStore;

/// The dimension (width, height, depth) of a chunk in cells.
pub const CHUNK_SIZE: i32 = 30;
/// The number of cells in a single horizontal plane of a chunk.
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_SIZE * CHUNK_SIZE;
/// The total number of cells in a chunk.
pub const CHUNK_VOLUME: usize = (CHUNK_PLANE_SIZE * CHUNK_SIZE) as usize;
/// The dimension of a chunk including one border cell on each side.
pub const CHUNK_SIZE_PADDED: usize = (CHUNK_SIZE + 2) as usize;
/// The total number of cells in a padded chunk.
pub const CHUNK_VOLUME_PADDED: usize = CHUNK_SIZE_PADDED * CHUNK_SIZE_PADDED * CHUNK_SIZE_PADDED;

/// Whether a chunk-local position lies inside `[0, CHUNK_SIZE)` on every axis.
#[inline]
pub fn in_bounds(local: Point3<i32>) -> bool {
    (0..CHUNK_SIZE).contains(&local.x)
        && (0..CHUNK_SIZE).contains(&local.y)
        && (0..CHUNK_SIZE).contains(&local.z)
}

/// Flat index of an in-bounds local position.
///
/// # Returns
/// `None` if any coordinate is outside `[0, CHUNK_SIZE)`.
#[inline]
pub fn local_index(local: Point3<i32>) -> Option<usize> {
    if !in_bounds(local) {
        return None;
    }
    Some((local.x + local.z * CHUNK_SIZE + local.y * CHUNK_PLANE_SIZE) as usize)
}

/// Inverse of [`local_index`].
#[inline]
pub fn local_position(index: usize) -> Point3<i32> {
    let index = index as i32;
    Point3::new(
        index % CHUNK_SIZE,
        index / CHUNK_PLANE_SIZE,
        (index / CHUNK_SIZE) % CHUNK_SIZE,
    )
}

/// Splits a position relative to `chunk` (possibly outside its bounds) into
/// the owning chunk coordinate and the wrapped local position.
///
/// Uses floor-division so that `-1` lands at `CHUNK_SIZE - 1` of the previous
/// chunk rather than at `-1` of the current one.
#[inline]
pub fn wrap_local(chunk: Point3<i32>, local: Point3<i32>) -> (Point3<i32>, Point3<i32>) {
    let carry = Vector3::new(
        local.x.div_euclid(CHUNK_SIZE),
        local.y.div_euclid(CHUNK_SIZE),
        local.z.div_euclid(CHUNK_SIZE),
    );
    let wrapped = Point3::new(
        local.x.rem_euclid(CHUNK_SIZE),
        local.y.rem_euclid(CHUNK_SIZE),
        local.z.rem_euclid(CHUNK_SIZE),
    );
    (chunk + carry, wrapped)
}

/// Converts a global cell position into (chunk coordinate, local position).
#[inline]
pub fn global_to_chunk(global: Point3<i32>) -> (Point3<i32>, Point3<i32>) {
    wrap_local(Point3::new(0, 0, 0), global)
}

/// World-space position of a chunk's local origin.
#[inline]
pub fn chunk_origin(chunk: Point3<i32>) -> Point3<i32> {
    Point3::new(chunk.x * CHUNK_SIZE, chunk.y * CHUNK_SIZE, chunk.z * CHUNK_SIZE)
}

/// The six face-adjacent chunk coordinates of `chunk`.
pub fn face_neighbors(chunk: Point3<i32>) -> [Point3<i32>; 6] {
    [
        chunk + Vector3::new(1, 0, 0),
        chunk + Vector3::new(-1, 0, 0),
        chunk + Vector3::new(0, 1, 0),
        chunk + Vector3::new(0, -1, 0),
        chunk + Vector3::new(0, 0, 1),
        chunk + Vector3::new(0, 0, -1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_layout_is_x_then_z_then_y() {
        assert_eq!(local_index(Point3::new(1, 0, 0)), Some(1));
        assert_eq!(local_index(Point3::new(0, 0, 1)), Some(CHUNK_SIZE as usize));
        assert_eq!(local_index(Point3::new(0, 1, 0)), Some(CHUNK_PLANE_SIZE as usize));
        assert_eq!(local_index(Point3::new(CHUNK_SIZE, 0, 0)), None);
        assert_eq!(local_index(Point3::new(0, -1, 0)), None);

        for index in [0, 17, 931, CHUNK_VOLUME - 1] {
            assert_eq!(local_index(local_position(index)), Some(index));
        }
    }

    #[test]
    fn wrapping_uses_floor_division() {
        let (chunk, local) = wrap_local(Point3::new(0, 0, 0), Point3::new(-1, 5, 5));
        assert_eq!(chunk, Point3::new(-1, 0, 0));
        assert_eq!(local, Point3::new(CHUNK_SIZE - 1, 5, 5));

        let (chunk, local) = wrap_local(Point3::new(2, 0, -3), Point3::new(CHUNK_SIZE, -CHUNK_SIZE - 1, 0));
        assert_eq!(chunk, Point3::new(3, -2, -3));
        assert_eq!(local, Point3::new(0, CHUNK_SIZE - 1, 0));
    }

    #[test]
    fn global_positions_round_trip_through_chunk_origin() {
        let global = Point3::new(-31, 62, 7);
        let (chunk, local) = global_to_chunk(global);
        assert_eq!(chunk, Point3::new(-2, 2, 0));
        assert_eq!(chunk_origin(chunk) + (local - Point3::new(0, 0, 0)), global);
    }
}

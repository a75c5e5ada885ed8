//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the axis math the
//! mesher and slope code use to move between faces, normals and rotations.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a stable integer value which doubles as the index
/// into a block's `face_texture_indices` table.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
///
/// Horizontal faces are also referred to by compass direction in the slope
/// code: FRONT is south (+Z), BACK is north (-Z), LEFT is west (-X) and RIGHT
/// is east (+X).
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, PartialOrd, Ord, FromPrimitive)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Integer offset from a block to the neighbour this face looks at.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// The axis the face normal runs along: 0 = X, 1 = Y, 2 = Z.
    pub fn axis(self) -> usize {
        match self {
            BlockSide::LEFT | BlockSide::RIGHT => 0,
            BlockSide::BOTTOM | BlockSide::TOP => 1,
            BlockSide::FRONT | BlockSide::BACK => 2,
        }
    }

    /// Whether the face normal points along the positive axis direction.
    pub fn is_positive(self) -> bool {
        matches!(self, BlockSide::FRONT | BlockSide::TOP | BlockSide::RIGHT)
    }

    /// Inverse of [`BlockSide::axis`] / [`BlockSide::is_positive`].
    pub fn from_axis(axis: usize, positive: bool) -> BlockSide {
        match (axis, positive) {
            (0, false) => BlockSide::LEFT,
            (0, true) => BlockSide::RIGHT,
            (1, false) => BlockSide::BOTTOM,
            (1, true) => BlockSide::TOP,
            (_, false) => BlockSide::BACK,
            (_, true) => BlockSide::FRONT,
        }
    }

    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
        }
    }

    /// Rotates a face by `steps` quarter turns about the +Y axis.
    ///
    /// One step maps south to east, east to north, north to west and west to
    /// south, which is the same rotation applied to slope geometry. Top and
    /// bottom faces are unaffected.
    pub fn rotated_y(self, steps: u32) -> BlockSide {
        let mut side = self;
        for _ in 0..(steps % 4) {
            side = match side {
                BlockSide::FRONT => BlockSide::RIGHT,
                BlockSide::RIGHT => BlockSide::BACK,
                BlockSide::BACK => BlockSide::LEFT,
                BlockSide::LEFT => BlockSide::FRONT,
                vertical => vertical,
            };
        }
        side
    }

    /// Mirrors the face vertically; horizontal faces are unaffected.
    pub fn flipped_y(self) -> BlockSide {
        match self {
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::BOTTOM => BlockSide::TOP,
            horizontal => horizontal,
        }
    }
}

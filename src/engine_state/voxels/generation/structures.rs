//! Structure stamps.
//!
//! A stamp is a list of (offset, block id) pairs relative to the structure's
//! base cell. Offsets may leave the chunk; the generator resolves them through
//! the store's wrap-around math and only ever fills empty cells, so earlier
//! entries win over later ones at the same offset.

use cgmath::Vector3;

use crate::engine_state::voxels::block::BlockId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StructureKind {
    Tree,
    Totem,
}

/// Offset → block id mapping produced by a stamp.
pub type Stamp = Vec<(Vector3<i32>, BlockId)>;

/// A trunk of `wood` 4 to 6 tall under a rounded `leaves` canopy.
pub fn tree(rng: &mut fastrand::Rng, wood: BlockId, leaves: BlockId) -> Stamp {
    let trunk_height = rng.i32(4..=6);
    let mut stamp = Vec::with_capacity(64);

    for y in 0..trunk_height {
        stamp.push((Vector3::new(0, y, 0), wood));
    }

    let top = trunk_height - 1;
    for dy in -1..=2 {
        let radius: i32 = if dy >= 1 { 1 } else { 2 };
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                // clip the corners of the wide layers
                if radius == 2 && dx.abs() == 2 && dz.abs() == 2 {
                    continue;
                }
                if dy == 2 && dx != 0 && dz != 0 {
                    continue;
                }
                stamp.push((Vector3::new(dx, top + dy, dz), leaves));
            }
        }
    }

    stamp
}

/// A single column of `totem` blocks 3 to 5 tall.
pub fn totem(rng: &mut fastrand::Rng, totem: BlockId) -> Stamp {
    let height = rng.i32(3..=5);
    (0..height)
        .map(|y| (Vector3::new(0, y, 0), totem))
        .collect()
}

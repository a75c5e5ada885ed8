//! # Packed Cell Codec
//!
//! Every voxel is stored as a single `u32`. The layout, least significant bit
//! first:
//!
//! | bits  | field                                              |
//! |-------|----------------------------------------------------|
//! | 0-15  | block-type id (0 = air)                            |
//! | 16-20 | damage amount, 0..=31                              |
//! | 21-23 | damage-type flags (physical, fire, other)          |
//! | 24-25 | slope type (none, side, corner, inverted corner)   |
//! | 26-27 | slope rotation in quarter turns                    |
//! | 28    | slope flip (geometry mirrored vertically)          |
//!
//! Every setter touches only its own bit range, so fields combine with a plain
//! OR in any order. Emptiness is decided by the id field alone.

use num_derive::FromPrimitive;

use super::BlockId;

/// One packed voxel.
pub type Cell = u32;

/// The empty cell.
pub const AIR: Cell = 0;

pub const ID_MASK: u32 = 0xFFFF;

pub const DAMAGE_SHIFT: u32 = 16;
pub const DAMAGE_MASK: u32 = 0x1F << DAMAGE_SHIFT;

pub const DAMAGE_TYPE_SHIFT: u32 = 21;
pub const DAMAGE_TYPE_MASK: u32 = 0x7 << DAMAGE_TYPE_SHIFT;

pub const SLOPE_TYPE_SHIFT: u32 = 24;
pub const SLOPE_TYPE_MASK: u32 = 0x3 << SLOPE_TYPE_SHIFT;

pub const SLOPE_ROTATION_SHIFT: u32 = 26;
pub const SLOPE_ROTATION_MASK: u32 = 0x3 << SLOPE_ROTATION_SHIFT;

pub const SLOPE_FLIP_SHIFT: u32 = 28;
pub const SLOPE_FLIP_MASK: u32 = 0x1 << SLOPE_FLIP_SHIFT;

/// All slope-related bits.
pub const SLOPE_BITS: u32 = SLOPE_TYPE_MASK | SLOPE_ROTATION_MASK | SLOPE_FLIP_MASK;

/// Damage at which a block is destroyed.
pub const MAX_DAMAGE: u32 = 31;

/// Damage-type flags stored in bits 21-23.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct DamageType(pub u8);

impl DamageType {
    pub const NONE: DamageType = DamageType(0);
    pub const PHYSICAL: DamageType = DamageType(0b001);
    pub const FIRE: DamageType = DamageType(0b010);
    pub const OTHER: DamageType = DamageType(0b100);

    pub fn contains(self, other: DamageType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: DamageType) -> DamageType {
        DamageType((self.0 | other.0) & 0x7)
    }
}

/// Which ramp shape a block renders as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum SlopeType {
    /// A full cube.
    None = 0,
    /// A single-face ramp.
    Side = 1,
    /// An outer corner: one raised top corner.
    Corner = 2,
    /// An inner corner: one depressed top corner.
    InvCorner = 3,
}

/// Packs a block-type id into an otherwise clean cell.
#[inline]
pub fn pack(id: BlockId) -> Cell {
    id as Cell & ID_MASK
}

/// Damage amount and type bits, ready to be OR-ed into a cell.
///
/// Amounts above [`MAX_DAMAGE`] are clamped.
#[inline]
pub fn pack_damage(damage_type: DamageType, amount: u32) -> Cell {
    let amount = amount.min(MAX_DAMAGE);
    ((amount << DAMAGE_SHIFT) & DAMAGE_MASK)
        | (((damage_type.0 as u32) << DAMAGE_TYPE_SHIFT) & DAMAGE_TYPE_MASK)
}

/// Slope type and rotation bits, ready to be OR-ed into a cell.
#[inline]
pub fn pack_slope(slope_type: SlopeType, rotation: u32) -> Cell {
    (((slope_type as u32) << SLOPE_TYPE_SHIFT) & SLOPE_TYPE_MASK)
        | (((rotation % 4) << SLOPE_ROTATION_SHIFT) & SLOPE_ROTATION_MASK)
}

#[inline]
pub fn pack_flip(flipped: bool) -> Cell {
    (flipped as u32) << SLOPE_FLIP_SHIFT
}

#[inline]
pub fn get_id(cell: Cell) -> BlockId {
    (cell & ID_MASK) as BlockId
}

#[inline]
pub fn get_damage_amount(cell: Cell) -> u32 {
    (cell & DAMAGE_MASK) >> DAMAGE_SHIFT
}

#[inline]
pub fn get_damage_type(cell: Cell) -> DamageType {
    DamageType(((cell & DAMAGE_TYPE_MASK) >> DAMAGE_TYPE_SHIFT) as u8)
}

#[inline]
pub fn get_slope_type(cell: Cell) -> SlopeType {
    let bits = (cell & SLOPE_TYPE_MASK) >> SLOPE_TYPE_SHIFT;
    num::FromPrimitive::from_u32(bits).unwrap_or(SlopeType::None)
}

#[inline]
pub fn get_slope_rotation(cell: Cell) -> u32 {
    (cell & SLOPE_ROTATION_MASK) >> SLOPE_ROTATION_SHIFT
}

#[inline]
pub fn is_flipped(cell: Cell) -> bool {
    cell & SLOPE_FLIP_MASK != 0
}

/// True iff the id field is zero, whatever the other bits hold.
#[inline]
pub fn is_empty(cell: Cell) -> bool {
    cell & ID_MASK == 0
}

#[inline]
pub fn is_sloped(cell: Cell) -> bool {
    cell & SLOPE_TYPE_MASK != 0
}

/// Air and lava can never be damaged or sloped.
#[inline]
pub fn is_invincible(cell: Cell, lava_id: BlockId) -> bool {
    is_empty(cell) || get_id(cell) == lava_id
}

/// Replaces the damage fields of `cell`, leaving id and slope intact.
#[inline]
pub fn with_damage(cell: Cell, damage_type: DamageType, amount: u32) -> Cell {
    (cell & !(DAMAGE_MASK | DAMAGE_TYPE_MASK)) | pack_damage(damage_type, amount)
}

/// Replaces the slope fields of `cell`, leaving id and damage intact.
#[inline]
pub fn with_slope(cell: Cell, slope_type: SlopeType, rotation: u32, flipped: bool) -> Cell {
    (cell & !SLOPE_BITS) | pack_slope(slope_type, rotation) | pack_flip(flipped)
}

/// Replaces only the id, keeping damage and slope bits.
#[inline]
pub fn with_id(cell: Cell, id: BlockId) -> Cell {
    (cell & !ID_MASK) | pack(id)
}

#[inline]
pub fn clear_slope(cell: Cell) -> Cell {
    cell & !SLOPE_BITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_survive_or_merge_in_any_order() {
        let id = pack(0xBEEF);
        let damage = pack_damage(DamageType::FIRE.union(DamageType::PHYSICAL), 27);
        let slope = pack_slope(SlopeType::InvCorner, 3);

        for cell in [id | damage | slope, slope | id | damage, damage | slope | id] {
            assert_eq!(get_id(cell), 0xBEEF);
            assert_eq!(get_damage_amount(cell), 27);
            assert_eq!(get_damage_type(cell), DamageType(0b011));
            assert_eq!(get_slope_type(cell), SlopeType::InvCorner);
            assert_eq!(get_slope_rotation(cell), 3);
            assert!(!is_flipped(cell));
        }
    }

    #[test]
    fn emptiness_only_looks_at_the_id() {
        let junk = pack_damage(DamageType::OTHER, 31) | pack_slope(SlopeType::Side, 2) | pack_flip(true);
        assert!(is_empty(junk));
        assert!(is_empty(AIR));
        assert!(!is_empty(pack(1) | junk));
    }

    #[test]
    fn setters_stay_in_their_lane() {
        let cell = pack(42) | pack_slope(SlopeType::Corner, 1);
        let damaged = with_damage(cell, DamageType::PHYSICAL, 40);
        assert_eq!(get_damage_amount(damaged), MAX_DAMAGE);
        assert_eq!(get_slope_type(damaged), SlopeType::Corner);
        assert_eq!(get_id(damaged), 42);

        let resloped = with_slope(damaged, SlopeType::Side, 6, true);
        assert_eq!(get_slope_rotation(resloped), 2);
        assert!(is_flipped(resloped));
        assert_eq!(get_damage_amount(resloped), MAX_DAMAGE);

        assert!(!is_sloped(clear_slope(resloped)));
        assert_eq!(get_id(with_id(resloped, 7)), 7);
        assert_eq!(get_damage_amount(with_id(resloped, 7)), MAX_DAMAGE);
    }

    #[test]
    fn lava_and_air_are_invincible() {
        assert!(is_invincible(AIR, 6));
        assert!(is_invincible(pack(6) | pack_damage(DamageType::FIRE, 3), 6));
        assert!(!is_invincible(pack(5), 6));
    }
}

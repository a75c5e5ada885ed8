//! # Block Species Module
//!
//! Species is the coarse behavioural class of a block type. The mesher uses it
//! to pick a render surface, the slope resolver uses it to exclude leaves and
//! lava, and structure stamping uses it to decide which blocks get weathered.

use serde::Deserialize;

/// Enumerates the behavioural classes a block type can belong to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSpecies {
    /// Plain opaque block.
    #[default]
    Normal,

    /// Opaque block whose top face is rendered on its own surface so a blend
    /// shader can treat it differently from the sides.
    Grass,

    /// Foliage. Never sloped, never weathered by generation.
    Leaves,

    /// Animated liquid. Invincible, never sloped, excluded from collision.
    Lava,

    /// Structure marker block rendered on the secondary surface.
    Totem,
}

impl BlockSpecies {
    /// Whether the slope resolver may ever turn this species into a ramp.
    pub fn can_slope(self) -> bool {
        !matches!(self, BlockSpecies::Leaves | BlockSpecies::Lava)
    }

    /// Whether freshly stamped structure blocks of this species receive
    /// random weathering damage.
    pub fn weathers(self) -> bool {
        matches!(self, BlockSpecies::Normal | BlockSpecies::Grass)
    }
}

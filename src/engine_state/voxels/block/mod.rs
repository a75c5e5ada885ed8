//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine:
//! the packed per-voxel cell codec, block face handling, block species and the
//! block registry loaded at startup.

pub mod block_side;
pub mod block_type;
pub mod cell;
pub mod registry;

pub use block_side::BlockSide;
pub use block_type::BlockSpecies;
pub use cell::{Cell, DamageType, SlopeType};
pub use registry::{BlockProperties, BlockRegistry, RegistryError};

/// The integer type used to represent block-type ids inside a packed cell.
pub type BlockId = u16;

//! # Block Registry
//!
//! Static catalog of block-type properties, keyed by block-type id. It is
//! loaded once at startup from JSON and treated as read-only afterwards; the
//! registry is shared between threads behind an `Arc`.
//!
//! A missing or malformed entry is a startup error: the atlas lookup and the
//! damage logic cannot proceed safely without it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Deserialize;

use super::{BlockId, BlockSide, BlockSpecies};

/// Default catalog shipped with the crate.
const DEFAULT_BLOCKS_JSON: &str = include_str!("../../../../assets/blocks.json");

/// Texture face groups accepted in block definitions.
///
/// Groups are applied in ascending priority so that e.g. `top` always wins
/// over `sides`, which always wins over `all`, independent of JSON key order.
static FACE_GROUPS: phf::Map<&'static str, (u8, &'static [BlockSide])> = phf::phf_map! {
    "all" => (0, &[
        BlockSide::FRONT,
        BlockSide::BACK,
        BlockSide::BOTTOM,
        BlockSide::TOP,
        BlockSide::LEFT,
        BlockSide::RIGHT,
    ]),
    "sides" => (1, &[BlockSide::FRONT, BlockSide::BACK, BlockSide::LEFT, BlockSide::RIGHT]),
    "front" => (2, &[BlockSide::FRONT]),
    "back" => (2, &[BlockSide::BACK]),
    "left" => (2, &[BlockSide::LEFT]),
    "right" => (2, &[BlockSide::RIGHT]),
    "top" => (2, &[BlockSide::TOP]),
    "bottom" => (2, &[BlockSide::BOTTOM]),
};

/// Errors raised while building the registry.
#[derive(Debug)]
pub enum RegistryError {
    Parse(serde_json::Error),
    ReservedAirId { name: String },
    DuplicateId(BlockId),
    DuplicateName(String),
    UnknownFaceGroup { block: String, group: String },
    InvalidFragility { block: String, fragility: f32 },
    MissingBlock(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "failed to parse block registry: {err}"),
            Self::ReservedAirId { name } => {
                write!(f, "block '{name}' uses id 0, which is reserved for air")
            }
            Self::DuplicateId(id) => write!(f, "block id {id} is registered twice"),
            Self::DuplicateName(name) => write!(f, "block name '{name}' is registered twice"),
            Self::UnknownFaceGroup { block, group } => {
                write!(f, "block '{block}' uses unknown texture face group '{group}'")
            }
            Self::InvalidFragility { block, fragility } => {
                write!(f, "block '{block}' has invalid fragility {fragility}")
            }
            Self::MissingBlock(name) => write!(f, "required block '{name}' is not registered"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct BlocksFile {
    blocks: Vec<BlockDefinition>,
}

/// One entry of the registry JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefinition {
    pub id: BlockId,
    pub name: String,
    #[serde(default)]
    pub max_health: u32,
    #[serde(default = "default_fragility")]
    pub fragility: f32,
    #[serde(default)]
    pub species: BlockSpecies,
    #[serde(default)]
    pub textures: BTreeMap<String, u32>,
}

fn default_fragility() -> f32 {
    1.0
}

/// Resolved properties of a block type.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProperties {
    pub id: BlockId,
    pub name: String,
    pub max_health: u32,
    /// Multiplier applied to raw damage before it is accumulated.
    pub fragility: f32,
    pub species: BlockSpecies,
    /// Atlas index per face, indexed by `BlockSide as usize`.
    pub face_texture_indices: [u32; 6],
}

/// Catalog mapping block-type ids to their properties.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: Vec<Option<BlockProperties>>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the catalog embedded in the crate.
    pub fn default_catalog() -> Result<Self, RegistryError> {
        Self::from_json(DEFAULT_BLOCKS_JSON)
    }

    /// Builds a registry from a `{ "blocks": [...] }` JSON document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: BlocksFile = serde_json::from_str(json).map_err(RegistryError::Parse)?;
        let mut registry = Self::new();
        for definition in file.blocks {
            registry.register(definition)?;
        }
        log::info!("Block registry loaded with {} block types", registry.len());
        Ok(registry)
    }

    /// Adds one definition, validating it against what is already registered.
    pub fn register(&mut self, definition: BlockDefinition) -> Result<(), RegistryError> {
        if definition.id == 0 {
            return Err(RegistryError::ReservedAirId {
                name: definition.name,
            });
        }
        if !definition.fragility.is_finite() || definition.fragility < 0.0 {
            return Err(RegistryError::InvalidFragility {
                block: definition.name,
                fragility: definition.fragility,
            });
        }
        if self.get(definition.id).is_some() {
            return Err(RegistryError::DuplicateId(definition.id));
        }
        if self.by_name.contains_key(&definition.name) || definition.name == "air" {
            return Err(RegistryError::DuplicateName(definition.name));
        }

        let mut groups = Vec::with_capacity(definition.textures.len());
        for (group, index) in &definition.textures {
            let Some(&(priority, sides)) = FACE_GROUPS.get(group.as_str()) else {
                return Err(RegistryError::UnknownFaceGroup {
                    block: definition.name.clone(),
                    group: group.clone(),
                });
            };
            groups.push((priority, sides, *index));
        }
        groups.sort_by_key(|(priority, _, _)| *priority);

        let mut face_texture_indices = [0u32; 6];
        for (_, sides, index) in groups {
            for side in sides {
                face_texture_indices[*side as usize] = index;
            }
        }

        let slot = definition.id as usize;
        if self.blocks.len() <= slot {
            self.blocks.resize(slot + 1, None);
        }
        self.by_name.insert(definition.name.clone(), definition.id);
        self.blocks[slot] = Some(BlockProperties {
            id: definition.id,
            name: definition.name,
            max_health: definition.max_health,
            fragility: definition.fragility,
            species: definition.species,
            face_texture_indices,
        });
        Ok(())
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockProperties> {
        self.blocks.get(id as usize).and_then(Option::as_ref)
    }

    /// Looks a block up by name. `air` always resolves to id 0.
    pub fn id_of(&self, name: &str) -> Option<BlockId> {
        if name == "air" {
            return Some(0);
        }
        self.by_name.get(name).copied()
    }

    /// Like [`BlockRegistry::id_of`] but a missing block is an error.
    pub fn require(&self, name: &str) -> Result<BlockId, RegistryError> {
        self.id_of(name)
            .ok_or_else(|| RegistryError::MissingBlock(name.to_string()))
    }

    /// Species of a block type; unregistered ids behave as [`BlockSpecies::Normal`].
    pub fn species(&self, id: BlockId) -> BlockSpecies {
        self.get(id).map(|b| b.species).unwrap_or_default()
    }

    /// Fragility of a block type; unregistered ids use 1.0.
    pub fn fragility(&self, id: BlockId) -> f32 {
        self.get(id).map(|b| b.fragility).unwrap_or(1.0)
    }

    pub fn texture_index(&self, id: BlockId, side: BlockSide) -> u32 {
        self.get(id)
            .map(|b| b.face_texture_indices[side as usize])
            .unwrap_or(0)
    }

    /// Column/row of a face's sub-texture in an atlas `atlas_columns` wide.
    pub fn atlas_position(&self, id: BlockId, side: BlockSide, atlas_columns: u32) -> (u32, u32) {
        let index = self.texture_index(id, side);
        let columns = atlas_columns.max(1);
        (index % columns, index / columns)
    }

    /// Number of registered (non-air) block types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockProperties> {
        self.blocks.iter().flatten()
    }
}

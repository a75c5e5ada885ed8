//! # Terrain Generation
//!
//! Fills chunks deterministically from their coordinate.
//!
//! ## Vertical layout
//!
//! Each chunk y level plays one role:
//!
//! * `checkerboard_levels` - a 3D checkerboard of test blocks
//! * `ground_level` - columns following a 2D cellular heightmap: grass on top,
//!   a few cells of dirt, stone below and lava flooding low columns
//! * `structure_level` - air, plus trees and totems stamped on the ground
//!   surface below (stamps reach down into the ground chunk)
//! * anything below ground - 3D noise caves and overhangs in stone
//! * anything else - air
//!
//! ## Protocol
//!
//! 1. Under the store lock: skip if the chunk is generated or in flight,
//!    otherwise mark it in flight.
//! 2. Without the lock: compute the chunk's cells and the structure stamps.
//! 3. Under the store lock: merge the cells into whatever is already there
//!    (only empty cells are filled, so structures stamped earlier by a
//!    neighbour survive), stamp structures into this and neighbouring chunks,
//!    then mark the chunk generated.

use std::num::NonZeroUsize;
use std::sync::Arc;

use cgmath::{Point3, Vector3};
use lru::LruCache;
use web_time::Instant;

use crate::core::MtResource;
use crate::engine_state::config::GeneratorConfig;
use crate::engine_state::voxels::block::cell::{self, AIR};
use crate::engine_state::voxels::block::{BlockId, BlockRegistry, Cell, DamageType, RegistryError};
use crate::engine_state::voxels::chunk::{
    chunk_origin, local_index, local_position, ChunkStore, CHUNK_PLANE_SIZE, CHUNK_SIZE, CHUNK_VOLUME,
};

pub mod noise_source;
pub mod structures;

pub use noise_source::{NoiseOracle, NoiseSource};
use structures::StructureKind;

/// Depth of the dirt layer under the grass, in cells.
const DIRT_DEPTH: i32 = 3;

/// Block ids the generator places, resolved once from the registry.
#[derive(Copy, Clone, Debug)]
pub struct TerrainBlocks {
    pub dirt: BlockId,
    pub grass: BlockId,
    pub stone: BlockId,
    pub wood: BlockId,
    pub leaves: BlockId,
    pub lava: BlockId,
    pub totem: BlockId,
    pub checker: BlockId,
}

impl TerrainBlocks {
    /// Resolves every block the generator needs.
    ///
    /// # Returns
    /// `RegistryError::MissingBlock` naming the first absent block.
    pub fn resolve(registry: &BlockRegistry) -> Result<Self, RegistryError> {
        registry.require("air")?;
        Ok(TerrainBlocks {
            dirt: registry.require("dirt")?,
            grass: registry.require("grass")?,
            stone: registry.require("stone")?,
            wood: registry.require("wood")?,
            leaves: registry.require("leaves")?,
            lava: registry.require("lava")?,
            totem: registry.require("totem")?,
            checker: registry.require("checker")?,
        })
    }
}

/// How a call to [`TerrainGenerator::generate`] ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GenerationStatus {
    /// This call generated the chunk.
    Generated,
    /// The chunk was generated or restored earlier; its cells are final.
    AlreadyGenerated,
    /// Another caller is generating the chunk; its cells are not final yet.
    InFlight,
}

/// What a call to [`TerrainGenerator::generate`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub chunk: Point3<i32>,
    pub status: GenerationStatus,
    /// Every chunk whose cells were written, the generated chunk included.
    pub touched: Vec<Point3<i32>>,
    /// Global positions of structure cells written into other chunks.
    pub stamped: Vec<Point3<i32>>,
}

impl GenerationOutcome {
    fn skipped(chunk: Point3<i32>, status: GenerationStatus) -> Self {
        GenerationOutcome {
            chunk,
            status,
            touched: Vec::new(),
            stamped: Vec::new(),
        }
    }

    /// `true` if this call generated the chunk.
    pub fn generated(&self) -> bool {
        self.status == GenerationStatus::Generated
    }
}

/// Per-column surface heights of one chunk column, indexed `x + z * CHUNK_SIZE`.
type Heightmap = Arc<[i32]>;

/// Deterministic terrain and structure generator.
pub struct TerrainGenerator {
    config: GeneratorConfig,
    blocks: TerrainBlocks,
    registry: Arc<BlockRegistry>,
    noise: Box<dyn NoiseSource>,
    heightmaps: MtResource<LruCache<(i32, i32), Heightmap>>,
}

impl TerrainGenerator {
    /// Creates a generator backed by the `noise`-crate oracle.
    pub fn new(config: GeneratorConfig, registry: Arc<BlockRegistry>) -> Result<Self, RegistryError> {
        let noise = Box::new(NoiseOracle::new(config.seed));
        Self::with_noise(config, registry, noise)
    }

    /// Creates a generator with a caller-supplied noise oracle.
    pub fn with_noise(
        config: GeneratorConfig,
        registry: Arc<BlockRegistry>,
        noise: Box<dyn NoiseSource>,
    ) -> Result<Self, RegistryError> {
        let blocks = TerrainBlocks::resolve(&registry)?;
        let capacity = NonZeroUsize::new(config.heightmap_cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(TerrainGenerator {
            config,
            blocks,
            registry,
            noise,
            heightmaps: MtResource::new(LruCache::new(capacity)),
        })
    }

    pub fn blocks(&self) -> &TerrainBlocks {
        &self.blocks
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates `chunk` into the store. Idempotent: a chunk that is already
    /// generated, or being generated by another caller, is left untouched and
    /// no noise is evaluated.
    pub fn generate(&self, store: &MtResource<ChunkStore>, chunk: Point3<i32>) -> GenerationOutcome {
        let skipped = store.with_mut(|store| {
            if store.is_generated(chunk) {
                Some(GenerationStatus::AlreadyGenerated)
            } else if !store.try_begin_generation(chunk) {
                Some(GenerationStatus::InFlight)
            } else {
                None
            }
        });
        if let Some(status) = skipped {
            return GenerationOutcome::skipped(chunk, status);
        }

        let start = Instant::now();
        let mut rng = fastrand::Rng::with_seed(chunk_seed(self.config.seed, chunk));
        let cells = self.fill_cells(chunk, &mut rng);
        let stamps = if chunk.y == self.config.structure_level {
            self.structure_stamps(chunk, &mut rng)
        } else {
            Vec::new()
        };

        let origin = chunk_origin(chunk);
        let (touched, stamped) = store.with_mut(|store| {
            let mut touched = vec![chunk];
            let mut stamped = Vec::new();

            let target = store.get_or_create(chunk);
            for (existing, generated) in target.iter_mut().zip(cells) {
                if cell::is_empty(*existing) && !cell::is_empty(generated) {
                    *existing = generated;
                }
            }

            for (local, value) in stamps {
                if let Some(owner) = store.fill_neighbor_cell(chunk, local, Vector3::new(0, 0, 0), value) {
                    if owner != chunk {
                        stamped.push(origin + (local - Point3::new(0, 0, 0)));
                    }
                    if !touched.contains(&owner) {
                        touched.push(owner);
                    }
                }
            }

            store.finish_generation(chunk);
            (touched, stamped)
        });

        log::debug!(
            "Generated chunk {:?} in {:?} ({} chunks touched)",
            chunk,
            start.elapsed(),
            touched.len()
        );

        GenerationOutcome {
            chunk,
            status: GenerationStatus::Generated,
            touched,
            stamped,
        }
    }

    fn fill_cells(&self, chunk: Point3<i32>, rng: &mut fastrand::Rng) -> Vec<Cell> {
        let mut cells = vec![AIR; CHUNK_VOLUME];
        let origin = chunk_origin(chunk);

        if self.config.checkerboard_levels.contains(&chunk.y) {
            for (index, slot) in cells.iter_mut().enumerate() {
                let local = local_position(index);
                let global = origin + (local - Point3::new(0, 0, 0));
                if (global.x + global.y + global.z).rem_euclid(2) == 0 {
                    *slot = self.weathered(self.blocks.checker, rng);
                }
            }
        } else if chunk.y == self.config.ground_level {
            let heights = self.heightmap(chunk.x, chunk.z);
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let height = heights[(x + z * CHUNK_SIZE) as usize];
                    for y in 0..CHUNK_SIZE {
                        let Some(index) = local_index(Point3::new(x, y, z)) else {
                            continue;
                        };
                        cells[index] = match self.ground_block(y, height) {
                            Some(id) if id == self.blocks.lava => cell::pack(id),
                            Some(id) => self.weathered(id, rng),
                            None => AIR,
                        };
                    }
                }
            }
        } else if chunk.y < self.config.ground_level {
            let scale = self.config.noise_scale_3d;
            for (index, slot) in cells.iter_mut().enumerate() {
                let local = local_position(index);
                let global = origin + (local - Point3::new(0, 0, 0));
                let sample = self.noise.noise3d(
                    global.x as f64 * scale,
                    global.y as f64 * scale,
                    global.z as f64 * scale,
                );
                if sample >= self.config.solid_threshold {
                    *slot = self.weathered(self.blocks.stone, rng);
                }
            }
        }

        cells
    }

    /// Block at local height `y` of a ground column whose surface is `height`.
    fn ground_block(&self, y: i32, height: i32) -> Option<BlockId> {
        let lava_height = self.config.lava_height;
        if y >= height {
            return (y < lava_height).then_some(self.blocks.lava);
        }
        if y == height - 1 {
            return Some(if height > lava_height {
                self.blocks.grass
            } else {
                self.blocks.dirt
            });
        }
        if y >= height - 1 - DIRT_DEPTH {
            return Some(self.blocks.dirt);
        }
        Some(self.blocks.stone)
    }

    /// Surface heights for the ground chunk column `(cx, cz)`, cached.
    pub fn heightmap(&self, cx: i32, cz: i32) -> Heightmap {
        if let Some(heights) = self.heightmaps.get_mut().get(&(cx, cz)) {
            return heights.clone();
        }

        let origin = chunk_origin(Point3::new(cx, 0, cz));
        let scale = self.config.noise_scale_2d;
        let mut heights = Vec::with_capacity(CHUNK_PLANE_SIZE as usize);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let sample = self
                    .noise
                    .noise2d((origin.x + x) as f64 * scale, (origin.z + z) as f64 * scale);
                let height = ((sample + 1.0) / 2.0 * self.config.height_scale) as i32;
                heights.push(height.clamp(1, CHUNK_SIZE - 1));
            }
        }

        let heights: Heightmap = heights.into();
        self.heightmaps.get_mut().put((cx, cz), heights.clone());
        heights
    }

    /// Structures for a structure-level chunk, as (local position, cell)
    /// pairs. Local positions may lie outside the chunk.
    fn structure_stamps(&self, chunk: Point3<i32>, rng: &mut fastrand::Rng) -> Vec<(Point3<i32>, Cell)> {
        let levels_down = chunk.y - self.config.ground_level;
        if levels_down <= 0 {
            return Vec::new();
        }

        let heights = self.heightmap(chunk.x, chunk.z);
        let mut stamps = Vec::new();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let height = heights[(x + z * CHUNK_SIZE) as usize];
                if height <= self.config.lava_height {
                    continue;
                }
                if rng.f64() >= self.config.structure_chance {
                    continue;
                }

                let kind = if rng.f64() < self.config.totem_share {
                    StructureKind::Totem
                } else {
                    StructureKind::Tree
                };
                let stamp = match kind {
                    StructureKind::Tree => structures::tree(rng, self.blocks.wood, self.blocks.leaves),
                    StructureKind::Totem => structures::totem(rng, self.blocks.totem),
                };

                let base = Point3::new(x, height - levels_down * CHUNK_SIZE, z);
                for (offset, id) in stamp {
                    let value = if self.registry.species(id).weathers() {
                        self.weathered(id, rng)
                    } else {
                        cell::pack(id)
                    };
                    stamps.push((base + offset, value));
                }
            }
        }
        stamps
    }

    /// Packs `id` with random weathering damage.
    fn weathered(&self, id: BlockId, rng: &mut fastrand::Rng) -> Cell {
        let mut value = cell::pack(id);
        if rng.f64() < self.config.damage_chance {
            let damage_type = if rng.bool() {
                DamageType::PHYSICAL
            } else {
                DamageType::FIRE
            };
            value |= cell::pack_damage(damage_type, rng.u32(1..cell::MAX_DAMAGE));
        }
        value
    }
}

/// Seed of the per-chunk random stream.
fn chunk_seed(seed: u64, chunk: Point3<i32>) -> u64 {
    let mut hash = seed ^ 0x9E37_79B9_7F4A_7C15;
    for component in [chunk.x, chunk.y, chunk.z] {
        hash ^= component as u32 as u64;
        hash = hash.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        hash ^= hash >> 31;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatNoise(f64);

    impl NoiseSource for FlatNoise {
        fn noise3d(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            self.0
        }

        fn noise2d(&self, _x: f64, _z: f64) -> f64 {
            self.0
        }
    }

    fn generator(config: GeneratorConfig, noise: f64) -> TerrainGenerator {
        let registry = Arc::new(BlockRegistry::default_catalog().unwrap());
        TerrainGenerator::with_noise(config, registry, Box::new(FlatNoise(noise))).unwrap()
    }

    #[test]
    fn flat_ground_has_grass_dirt_and_stone() {
        // noise 0 maps to half the height scale
        let config = GeneratorConfig {
            height_scale: 20.0,
            lava_height: 0,
            damage_chance: 0.0,
            ..GeneratorConfig::default()
        };
        let generator = generator(config, 0.0);
        let store = MtResource::new(ChunkStore::new());
        let outcome = generator.generate(&store, Point3::new(0, 0, 0));
        assert!(outcome.generated());

        let blocks = *generator.blocks();
        let store = store.get();
        assert_eq!(store.cell_at(Point3::new(3, 9, 3)), cell::pack(blocks.grass));
        assert_eq!(store.cell_at(Point3::new(3, 8, 3)), cell::pack(blocks.dirt));
        assert_eq!(store.cell_at(Point3::new(3, 5, 3)), cell::pack(blocks.stone));
        assert_eq!(store.cell_at(Point3::new(3, 10, 3)), AIR);
    }

    #[test]
    fn low_columns_are_flooded_with_undamaged_lava() {
        let config = GeneratorConfig {
            height_scale: 4.0,
            lava_height: 6,
            damage_chance: 1.0,
            ..GeneratorConfig::default()
        };
        let generator = generator(config, 0.0);
        let store = MtResource::new(ChunkStore::new());
        generator.generate(&store, Point3::new(0, 0, 0));

        let lava = generator.blocks().lava;
        let surface = store.get().cell_at(Point3::new(0, 5, 0));
        assert_eq!(surface, cell::pack(lava));
    }

    #[test]
    fn checkerboard_levels_alternate() {
        let config = GeneratorConfig {
            checkerboard_levels: vec![4],
            damage_chance: 0.0,
            ..GeneratorConfig::default()
        };
        let generator = generator(config, 0.0);
        let store = MtResource::new(ChunkStore::new());
        let chunk = Point3::new(0, 4, 0);
        generator.generate(&store, chunk);

        let store = store.get();
        let cells = store.get(chunk).unwrap();
        for (index, value) in cells.iter().enumerate() {
            let local = local_position(index);
            let parity = (local.x + local.y + local.z + 4 * CHUNK_SIZE).rem_euclid(2);
            assert_eq!(cell::is_empty(*value), parity == 1);
        }
    }

    #[test]
    fn structures_reach_into_the_ground_chunk() {
        let config = GeneratorConfig {
            height_scale: 20.0,
            lava_height: 0,
            structure_chance: 1.0,
            totem_share: 1.0,
            damage_chance: 0.0,
            ..GeneratorConfig::default()
        };
        let generator = generator(config, 0.0);
        let store = MtResource::new(ChunkStore::new());
        let outcome = generator.generate(&store, Point3::new(0, 1, 0));

        assert!(outcome.touched.contains(&Point3::new(0, 0, 0)));
        assert!(outcome.stamped.contains(&Point3::new(0, 10, 0)));
        assert!(outcome.stamped.iter().all(|p| p.y < CHUNK_SIZE));
        let totem = generator.blocks().totem;
        assert_eq!(store.get().cell_at(Point3::new(0, 10, 0)), cell::pack(totem));
        assert!(!store.get().is_generated(Point3::new(0, 0, 0)));

        // the ground generated afterwards must not overwrite the totem base
        generator.generate(&store, Point3::new(0, 0, 0));
        assert_eq!(store.get().cell_at(Point3::new(0, 10, 0)), cell::pack(totem));
    }

    #[test]
    fn skipped_calls_report_why() {
        let generator = generator(GeneratorConfig::default(), 0.0);
        let store = MtResource::new(ChunkStore::new());
        let chunk = Point3::new(0, 0, 0);

        assert!(store.with_mut(|store| store.try_begin_generation(chunk)));
        let outcome = generator.generate(&store, chunk);
        assert_eq!(outcome.status, GenerationStatus::InFlight);
        assert!(outcome.touched.is_empty());

        store.with_mut(|store| store.abort_generation(chunk));
        assert!(generator.generate(&store, chunk).generated());
        assert_eq!(generator.generate(&store, chunk).status, GenerationStatus::AlreadyGenerated);
    }

    #[test]
    fn same_seed_same_chunk() {
        let config = GeneratorConfig::default();
        let a = generator(config.clone(), 0.3);
        let b = generator(config, 0.3);
        let store_a = MtResource::new(ChunkStore::new());
        let store_b = MtResource::new(ChunkStore::new());
        a.generate(&store_a, Point3::new(2, 0, -1));
        b.generate(&store_b, Point3::new(2, 0, -1));
        assert_eq!(
            store_a.get().get(Point3::new(2, 0, -1)),
            store_b.get().get(Point3::new(2, 0, -1))
        );
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cgmath::Point3;
use voxel_world::engine_state::config::GeneratorConfig;
use voxel_world::engine_state::voxels::block::cell::{self, AIR};
use voxel_world::engine_state::voxels::block::BlockRegistry;
use voxel_world::engine_state::voxels::damage::{DestroyedBlock, DestructionListener};
use voxel_world::engine_state::voxels::generation::NoiseSource;
use voxel_world::engine_state::{EngineConfig, EngineState, Surface};

const GRASS: u16 = 2;

struct FlatNoise;

impl NoiseSource for FlatNoise {
    fn noise3d(&self, _x: f64, _y: f64, _z: f64) -> f64 {
        0.0
    }

    fn noise2d(&self, _x: f64, _z: f64) -> f64 {
        0.0
    }
}

#[derive(Default)]
struct CountingListener {
    destroyed: AtomicUsize,
}

impl DestructionListener for CountingListener {
    fn on_destroyed(&self, destroyed: &[DestroyedBlock]) {
        self.destroyed.fetch_add(destroyed.len(), Ordering::SeqCst);
    }
}

/// Single-threaded engine over flat ground whose surface sits at y = 9.
fn flat_engine() -> EngineState {
    let config = EngineConfig {
        worker_count: 0,
        render_distance: 0,
        min_level: 0,
        max_level: 1,
        generator: GeneratorConfig {
            height_scale: 20.0,
            lava_height: 0,
            structure_chance: 0.0,
            damage_chance: 0.0,
            ..GeneratorConfig::default()
        },
    };
    let registry = BlockRegistry::default_catalog().unwrap();
    EngineState::with_noise(config, registry, Box::new(FlatNoise)).unwrap()
}

#[test]
fn focus_loads_meshes_and_damage_remeshes() {
    let mut engine = flat_engine();
    let listener = Arc::new(CountingListener::default());
    engine.set_destruction_listener(listener.clone());

    engine.update_focus(Point3::new(5, 5, 5));
    assert!(engine.flush_tasks(Duration::from_secs(30)));
    assert!(engine.is_idle());

    let ground = Point3::new(0, 0, 0);
    let sky = Point3::new(0, 1, 0);
    let mesh = engine.mesh_for(ground).unwrap();
    assert!(!mesh.surface(Surface::GrassTop).is_empty());
    assert!(!mesh.collision_triangles().is_empty());
    assert!(engine.mesh_for(sky).unwrap().is_empty());
    assert_eq!(engine.installed_meshes().active_len(), 2);

    let target = Point3::new(3, 9, 3);
    assert_eq!(cell::get_id(engine.cell_at(target)), GRASS);
    let revision = mesh.revision;

    let report = engine.damage(target, 40.0);
    assert_eq!(report.destroyed.len(), 1);
    assert_eq!(listener.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cell_at(target), AIR);

    assert!(engine.flush_tasks(Duration::from_secs(30)));
    assert!(engine.mesh_for(ground).unwrap().revision > revision);

    // a second hit on the hole does nothing
    let report = engine.damage(target, 40.0);
    assert!(report.is_empty());
    assert_eq!(listener.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn moving_the_focus_unloads_old_chunks_but_keeps_edits() {
    let mut engine = flat_engine();
    engine.update_focus(Point3::new(0, 0, 0));
    assert!(engine.flush_tasks(Duration::from_secs(30)));

    let target = Point3::new(10, 8, 10);
    engine.set_block(target, 0);
    assert!(engine.flush_tasks(Duration::from_secs(30)));

    engine.update_focus(Point3::new(300, 0, 0));
    assert!(engine.mesh_for(Point3::new(0, 0, 0)).is_none());
    assert!(engine.flush_tasks(Duration::from_secs(30)));
    assert!(engine.mesh_for(Point3::new(10, 0, 0)).is_some());

    engine.update_focus(Point3::new(0, 0, 0));
    assert!(engine.flush_tasks(Duration::from_secs(30)));
    assert!(engine.mesh_for(Point3::new(0, 0, 0)).is_some());
    assert_eq!(engine.cell_at(target), AIR);
}

#[test]
fn results_for_unloaded_chunks_are_dropped() {
    let mut engine = flat_engine();
    let chunk = Point3::new(2, 0, 2);
    assert!(engine.request_chunk(chunk));
    assert!(!engine.request_chunk(chunk));
    engine.unload_chunk(chunk);

    assert!(engine.flush_tasks(Duration::from_secs(30)));
    assert!(engine.mesh_for(chunk).is_none());
    assert!(engine.generated_chunks().contains(&chunk));
}

#[test]
fn restored_chunks_replace_generated_terrain() {
    let mut engine = flat_engine();
    let chunk = Point3::new(0, 0, 0);
    engine.update_focus(Point3::new(0, 0, 0));
    assert!(engine.flush_tasks(Duration::from_secs(30)));

    let bytes = engine.serialize_chunk(chunk).unwrap();
    assert_eq!(bytes.len(), 27_000 * 4);

    let empty = vec![0u8; bytes.len()];
    engine.restore_chunk(chunk, &empty).unwrap();
    assert!(engine.flush_tasks(Duration::from_secs(30)));
    assert_eq!(engine.cell_at(Point3::new(3, 3, 3)), AIR);
    assert!(engine.mesh_for(chunk).unwrap().is_empty());

    assert!(engine.restore_chunk(chunk, &bytes[..16]).is_err());
}

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! A chunked voxel world core: packed block cells, deterministic terrain and
//! structure generation, slope post-processing, binary greedy meshing and
//! block damage.
//!
//! The crate produces data for external collaborators and does not render
//! anything itself. Renderers and physics engines read [`ChunkMesh`] values
//! (render surfaces plus a collision triangle soup) from the engine once per
//! tick; persistence reads and writes raw chunk cell arrays.
//!
//! ## Key Modules
//!
//! * `core` - Concurrency primitives used throughout the engine
//! * `engine_state` - The engine coordinator, voxel data and algorithms,
//!   meshing and task management
//!
//! ## Usage
//!
//! ```no_run
//! use voxel_world::engine_state::{EngineConfig, EngineState};
//! use cgmath::Point3;
//! use std::time::Duration;
//!
//! voxel_world::init_logging();
//! let mut engine = EngineState::new(EngineConfig::default()).unwrap();
//! engine.update_focus(Point3::new(0, 0, 0));
//! engine.flush_tasks(Duration::from_secs(30));
//!
//! let report = engine.damage(Point3::new(3, 10, 3), 12.0);
//! println!("{} blocks destroyed", report.destroyed.len());
//! ```
//!
//! [`ChunkMesh`]: engine_state::ChunkMesh

use std::sync::Arc;
use std::time::Duration;

use cgmath::Point3;
use log::info;

use engine_state::voxels::block::cell;
use engine_state::voxels::chunk::CHUNK_SIZE;
use engine_state::voxels::damage::{DestroyedBlock, DestructionListener};
use engine_state::{EngineConfig, EngineError, EngineState, Surface};

pub mod core;
pub mod engine_state;

/// Installs `env_logger` on stdout, filtered by `RUST_LOG`. Calling it again
/// is harmless.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let _ = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();
}

struct LoggingListener;

impl DestructionListener for LoggingListener {
    fn on_destroyed(&self, destroyed: &[DestroyedBlock]) {
        for block in destroyed {
            info!(
                "Block {} destroyed at {:?}",
                cell::get_id(block.previous_cell),
                block.position
            );
        }
    }
}

/// Demo: loads the area around the origin, reports what was meshed, then
/// breaks the surface block above the origin.
pub fn run() -> Result<(), EngineError> {
    init_logging();
    info!("Logger initialized");

    let mut engine = EngineState::new(EngineConfig::default())?;
    engine.set_destruction_listener(Arc::new(LoggingListener));
    engine.update_focus(Point3::new(0, 0, 0));
    if !engine.flush_tasks(Duration::from_secs(120)) {
        log::warn!("World did not finish loading in time");
    }

    for surface in Surface::all() {
        let triangles: usize = engine
            .installed_meshes()
            .meshes()
            .map(|mesh| mesh.surface(surface).triangle_count())
            .sum();
        info!("{:?}: {} triangles", surface, triangles);
    }

    let levels = engine.config().vertical_levels();
    let top = (levels.start() * CHUNK_SIZE..(levels.end() + 1) * CHUNK_SIZE)
        .rev()
        .map(|y| Point3::new(0, y, 0))
        .find(|p| !cell::is_empty(engine.cell_at(*p)));
    if let Some(top) = top {
        let report = engine.damage(top, 100.0);
        info!(
            "Hit {:?}: {} destroyed, {} chunks to re-mesh",
            top,
            report.destroyed.len(),
            report.remesh_chunks.len()
        );
        engine.flush_tasks(Duration::from_secs(10));
    }

    Ok(())
}

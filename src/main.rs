//! # Voxel World Demo Entry Point
//!
//! Calls into the library's `run()` to generate, mesh and edit a small world.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    if let Err(err) = voxel_world::run() {
        log::error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

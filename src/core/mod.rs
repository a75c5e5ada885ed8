//! # Core Module
//!
//! Concurrency primitives shared by the rest of the engine.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking.
//!   The chunk store is held in one, which makes it the store-wide critical
//!   section for generation, slope resolution and damage.
//!
//! ## Usage
//! ```rust
//! use voxel_world::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod mt_resource;

pub use mt_resource::MtResource;

//! # Voxel Task System
//!
//! Tasks related to voxel world generation. They run on the task manager's
//! workers so generation never stalls the main thread.

pub mod chunk_generation_task;

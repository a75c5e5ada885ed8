//! # Task System Core Traits
//!
//! This module defines the building blocks of the task system.
//!
//! ## Core Components
//! - `Task`: a unit of work that runs on a worker thread
//! - `TaskResult`: the value a task hands back to the main thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread (or inline
//!    when the manager has no workers)
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the main thread, where it
//!    installs what it produced and may schedule follow-up tasks
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back to the main thread
//! - Shared world state is reached through [`WorldServices`], whose chunk
//!   store sits behind the store-wide lock

use crate::engine_state::rendering::InstalledMeshes;
use crate::engine_state::services::WorldServices;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own everything they need, typically a clone of [`WorldServices`]
/// and the chunk coordinate they work on.
pub trait Task: Send {
    /// Runs the task. Must not touch main-thread state.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a [`Task`].
///
/// Results are the only way background work reaches main-thread state: a
/// result is installed whole or not at all.
pub trait TaskResult: Send {
    /// Applies the result on the main thread.
    ///
    /// # Arguments
    /// * `services` - Thread-safe world services, for building follow-up tasks
    /// * `meshes` - The main thread's installed meshes
    ///
    /// # Returns
    /// Follow-up tasks to schedule (can be empty).
    fn handle_result(
        self: Box<Self>,
        services: &WorldServices,
        meshes: &mut InstalledMeshes,
    ) -> Vec<Box<dyn Task + Send>>;
}

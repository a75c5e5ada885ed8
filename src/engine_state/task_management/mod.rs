//! # Task Management System
//!
//! This module runs chunk generation and meshing off the main thread.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: owns a pool of worker threads and distributes tasks to them
//! - `Task`: a unit of work that can be executed on a worker
//! - `TaskResult`: the result of a completed task, applied on the main thread,
//!   which can spawn additional tasks
//! - `TaskChannel`: the pair of channels connecting the manager to one worker
//!
//! Workers are plain `std::thread`s, each fed through its own `mpsc` channel.
//! A manager created with zero workers runs every task inline on the thread
//! that calls [`TaskManager::process_queued_tasks`], which keeps tests and
//! single-threaded hosts deterministic.
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results
//! 4. Results are applied on the main thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks, which go through the same cycle
//!
//! ## Example Usage
//! ```rust,ignore
//! let mut task_manager = TaskManager::new(4, services);
//!
//! task_manager.publish_task(Box::new(ChunkMeshGenerationTask::new(services.clone(), coord, revision)));
//!
//! // In the main loop:
//! task_manager.process_completed_tasks(&mut installed_meshes);
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use log::info;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use task::{Task, TaskResult};

use super::rendering::InstalledMeshes;
use super::services::WorldServices;

/// A communication channel between the main thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from main thread to worker
/// - `result_receiver`: Receives task results from worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `_worker`: Handle to the worker thread
///
/// Dropping the channel drops the sender, which ends the worker's receive
/// loop.
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Tasks waiting for an available worker
/// - `inline_results`: Results of tasks run inline (zero-worker mode)
/// - `current_channel`: Index for round-robin scheduling
/// - `services`: World services handed to every result handler
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    inline_results: VecDeque<Box<dyn TaskResult + Send>>,
    current_channel: usize,
    services: WorldServices,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Kept at 1 so a busy worker never holds back a queue of tasks another
/// worker could take.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. Zero runs tasks
    ///   inline.
    /// * `services` - World services passed to result handlers
    ///
    /// A worker that fails to spawn is logged and skipped; if none spawn the
    /// manager falls back to inline execution.
    pub fn new(num_workers: usize, services: WorldServices) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        if num_workers > 0 {
            info!("Available parallelism: {:?}", thread::available_parallelism());
        }

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let result = task.process();
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            };

            match thread::Builder::new()
                .name(format!("voxel-worker-{}", index))
                .spawn(task_closure)
            {
                Ok(worker) => channels.push(TaskChannel {
                    task_sender: task_tx,
                    result_receiver: result_rx,
                    num_tasks_in_flight: 0,
                    _worker: worker,
                }),
                Err(err) => log::error!("Failed to spawn worker {}: {}", index, err),
            }
        }

        info!("Task manager started with {} workers", channels.len());

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            inline_results: VecDeque::new(),
            current_channel: 0,
            services,
        }
    }

    /// Number of worker threads. Zero means tasks run inline.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was sent
    /// - `Err(task)` if the worker has disconnected, handing the task back
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel, round-robin from the last used one.
    ///
    /// # Returns
    /// - `Some(usize)` index of a channel below `MAX_TASKS_IN_FLIGHT`
    /// - `None` if all channels are busy or there are no channels
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel % self.channels.len();
        let mut current = start_channel;

        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued (all workers busy, or inline mode)
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to workers as they become free.
    ///
    /// In inline mode every queued task is processed right here and its
    /// result is kept for the next [`TaskManager::process_completed_tasks`].
    pub fn process_queued_tasks(&mut self) {
        if self.queued_tasks.is_empty() {
            return;
        }

        if self.channels.is_empty() {
            while let Some(task) = self.queued_tasks.pop_front() {
                self.inline_results.push_back(task.process());
            }
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Worker disconnected, keep the task for later
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Applies every completed task result on the calling (main) thread.
    ///
    /// Follow-up tasks spawned by results are published after all results
    /// of this round have been applied.
    pub fn process_completed_tasks(&mut self, meshes: &mut InstalledMeshes) {
        let mut tasks_to_queue = Vec::new();

        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                tasks_to_queue.extend(result.handle_result(&self.services, meshes));
            }
        }

        let inline_results: Vec<_> = self.inline_results.drain(..).collect();
        for result in inline_results {
            tasks_to_queue.extend(result.handle_result(&self.services, meshes));
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
    }

    /// Whether no task is queued, running or waiting to be applied.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty()
            && self.inline_results.is_empty()
            && self.channels.iter().all(|c| c.num_tasks_in_flight == 0)
    }
}

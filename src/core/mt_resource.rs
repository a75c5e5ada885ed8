use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` is the engine's coarse-grained critical section: the chunk store
/// lives inside one, so every mutation of the coordinate map, the generated set
/// or a chunk's cells happens while holding its write guard. Cloning the
/// resource clones the handle, not the data.
///
/// # Type Parameters
/// - `T`: The type of the contained resource, must be `Send + Sync`
///
/// # Examples
///
/// ```
/// use voxel_world::core::MtResource;
///
/// let counter = MtResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
/// ```
///
/// # Poisoning
/// A worker that panics while holding the write guard poisons the lock. The
/// cell arrays are plain integers with no cross-field invariants that a
/// half-finished write could break beyond a single cell, so the guard is
/// recovered and a warning is logged instead of cascading the panic.
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("Recovering poisoned read lock");
            poisoned.into_inner()
        })
    }

    /// Returns a mutable guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("Recovering poisoned write lock");
            poisoned.into_inner()
        })
    }

    /// Runs `f` with exclusive access and returns its result.
    ///
    /// Keeps the critical section lexically scoped, which is how the
    /// generation and damage paths batch their writes.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.get_mut();
        f(&mut guard)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_the_same_value() {
        let counter = MtResource::new(0u32);
        let counter_clone = counter.clone();

        let handle = thread::spawn(move || {
            *counter_clone.get_mut() += 1;
        });
        handle.join().unwrap();

        assert_eq!(*counter.get(), 1);
    }

    #[test]
    fn recovers_from_a_poisoned_lock() {
        let value = MtResource::new(vec![1u32]);
        let poisoner = value.clone();

        let _ = thread::spawn(move || {
            let _guard = poisoner.get_mut();
            panic!("poison the lock");
        })
        .join();

        value.with_mut(|v| v.push(2));
        assert_eq!(*value.get(), vec![1, 2]);
    }
}

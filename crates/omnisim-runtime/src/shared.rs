//! [`SharedWorld`] – the world behind a reader–writer lock.
//!
//! Queries take the read lock and run concurrently.  Event batches take the
//! write lock once for the whole batch, so a reader never observes a
//! half-propagated pose tree.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use omnisim_spatial::World;
use omnisim_types::{SimError, WorldEvent};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SharedWorld {
    inner: Arc<RwLock<World>>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    /// Read access.  A poisoned lock is recovered: writers only ever leave
    /// fully propagated state behind.
    pub fn read(&self) -> RwLockReadGuard<'_, World> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `events` in order under a single write lock.  Returns the errors
    /// of the events that could not be applied.
    pub fn apply_batch(&self, events: &[WorldEvent]) -> Vec<SimError> {
        if events.is_empty() {
            return Vec::new();
        }
        let mut world = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        events
            .iter()
            .filter_map(|event| match world.apply(event) {
                Ok(()) => None,
                Err(e) => {
                    warn!(error = %e, "world event rejected");
                    Some(e)
                }
            })
            .collect()
    }
}

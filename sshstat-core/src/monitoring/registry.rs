//! Target registry with per-target carried CPU state
//!
//! Every target owns one slot. A slot's state is behind an async mutex that
//! a poll holds for its whole duration via [`PollGuard`], so a target never
//! has two polls in flight and readers only observe committed counters.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::PollError;
use crate::models::{RawCpuCounters, Target, TargetId};

/// State carried between polls of one target
#[derive(Debug, Default)]
struct SlotState {
    /// Counters from the last successful poll
    last_cpu: Option<RawCpuCounters>,
}

/// One registered target and its carried state
#[derive(Debug, Clone)]
pub struct SlotHandle {
    id: TargetId,
    target: Target,
    state: Arc<Mutex<SlotState>>,
}

impl SlotHandle {
    /// Slot index
    #[must_use]
    pub const fn id(&self) -> TargetId {
        self.id
    }

    /// The target this slot polls
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Claims the slot for one poll
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Busy`] if a poll of this target is in flight.
    pub fn try_begin_poll(&self) -> Result<PollGuard, PollError> {
        let guard = Arc::clone(&self.state)
            .try_lock_owned()
            .map_err(|_| PollError::Busy)?;
        Ok(PollGuard { id: self.id, guard })
    }
}

/// Exclusive claim on a slot for the duration of one poll
///
/// Dropping the guard without calling [`PollGuard::commit`] leaves the
/// carried state unchanged.
#[derive(Debug)]
pub struct PollGuard {
    id: TargetId,
    guard: OwnedMutexGuard<SlotState>,
}

impl PollGuard {
    /// Slot being polled
    #[must_use]
    pub const fn id(&self) -> TargetId {
        self.id
    }

    /// Counters from the last successful poll, `None` before the first
    #[must_use]
    pub fn previous(&self) -> Option<&RawCpuCounters> {
        self.guard.last_cpu.as_ref()
    }

    /// Stores the counters of a successful poll and releases the slot
    pub fn commit(mut self, current: RawCpuCounters) {
        self.guard.last_cpu = Some(current);
    }
}

/// The set of monitored targets
#[derive(Debug, Default)]
pub struct TargetRegistry {
    slots: Vec<SlotHandle>,
}

impl TargetRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target and returns its slot id
    pub fn register(&mut self, target: Target) -> TargetId {
        let id = TargetId(self.slots.len());
        tracing::debug!(id = %id, target_name = %target, "Registered target");
        self.slots.push(SlotHandle {
            id,
            target,
            state: Arc::new(Mutex::new(SlotState::default())),
        });
        id
    }

    /// Number of registered targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no target is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot for `id`
    #[must_use]
    pub fn slot(&self, id: TargetId) -> Option<&SlotHandle> {
        self.slots.get(id.0)
    }

    /// Target registered under `id`
    #[must_use]
    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.slot(id).map(SlotHandle::target)
    }

    /// All slots in registration order
    pub fn slots(&self) -> impl Iterator<Item = &SlotHandle> {
        self.slots.iter()
    }

    /// Committed counters for `id`, waiting for an in-flight poll to finish
    pub async fn last_cpu(&self, id: TargetId) -> Option<RawCpuCounters> {
        let slot = self.slot(id)?;
        slot.state.lock().await.last_cpu
    }
}

impl FromIterator<Target> for TargetRegistry {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        let mut registry = Self::new();
        for target in iter {
            registry.register(target);
        }
        registry
    }
}

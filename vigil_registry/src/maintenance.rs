//! Cooperative background maintenance.
//!
//! Long-running cleanup work is sliced into small resumable steps driven
//! from the main loop, so a sweep over every sanction giver never stalls
//! the world. A task reports `Pending` until its cursor reaches the end.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info};

use vigil_core::error::Result;
use vigil_core::names;
use vigil_sanction::SanctionStore;

use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// More steps remain.
    Pending,
    /// The task is finished and leaves the queue.
    Done,
}

/// A unit of background work that can be advanced one bounded step at a
/// time and survives being interleaved with other work.
pub trait ResumableTask: Send {
    fn name(&self) -> &str;

    /// Perform one bounded slice of work.
    fn step(&mut self) -> Result<TaskStatus>;
}

/// A FIFO of resumable tasks, ticked from the main loop.
#[derive(Default)]
pub struct Scheduler {
    queue: VecDeque<Box<dyn ResumableTask>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, task: Box<dyn ResumableTask>) {
        debug!(task = task.name(), "task enqueued");
        self.queue.push_back(task);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advance the front task by one step. A pending task goes back to
    /// the end of the queue so tasks interleave fairly.
    pub fn tick(&mut self) -> Result<()> {
        let Some(mut task) = self.queue.pop_front() else {
            return Ok(());
        };
        match task.step()? {
            TaskStatus::Pending => self.queue.push_back(task),
            TaskStatus::Done => info!(task = task.name(), "task finished"),
        }
        Ok(())
    }
}

/// Sweeps the sanction store for grants whose giver no longer exists,
/// revoking everything such givers ever gave. Runs in batches of givers,
/// resuming after the last giver seen.
pub struct SanctionSweep {
    sanctions: Arc<SanctionStore>,
    registry: Arc<Registry>,
    cursor: Option<String>,
    batch_size: usize,
}

impl SanctionSweep {
    pub fn new(sanctions: Arc<SanctionStore>, registry: Arc<Registry>) -> Self {
        Self {
            sanctions,
            registry,
            cursor: None,
            batch_size: 16,
        }
    }

    fn giver_is_live(&self, giver: &str) -> bool {
        giver == names::ROOT_NAME
            || self.registry.lookup_principal(giver).is_some()
            || self.registry.lookup_domain(giver).is_some()
    }
}

impl ResumableTask for SanctionSweep {
    fn name(&self) -> &str {
        "sanction-sweep"
    }

    fn step(&mut self) -> Result<TaskStatus> {
        let givers = self.sanctions.givers();
        let batch: Vec<String> = givers
            .into_iter()
            .filter(|g| match &self.cursor {
                Some(cursor) => g > cursor,
                None => true,
            })
            .take(self.batch_size)
            .collect();

        let Some(last) = batch.last().cloned() else {
            return Ok(TaskStatus::Done);
        };

        for giver in batch {
            if !self.giver_is_live(&giver) {
                self.sanctions.revoke_all(&giver)?;
                info!(giver = %giver, "swept sanctions of vanished giver");
            }
        }
        self.cursor = Some(last);
        Ok(TaskStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::storage::Storage;
    use vigil_core::{MemoryStorage, SanctionKind, VPath};

    fn world() -> (Arc<Registry>, Arc<SanctionStore>) {
        let storage = Arc::new(MemoryStorage::new()) as Arc<dyn Storage>;
        let registry = Arc::new(Registry::open(storage.clone()).unwrap());
        let sanctions = Arc::new(SanctionStore::open(storage).unwrap());
        (registry, sanctions)
    }

    #[test]
    fn test_sweep_removes_vanished_givers() {
        let (registry, sanctions) = world();
        registry.create_principal("alice").unwrap();
        sanctions
            .grant("alice", "bob", SanctionKind::Read, &VPath::root())
            .unwrap();
        sanctions
            .grant("ghost", "bob", SanctionKind::Read, &VPath::root())
            .unwrap();

        let mut scheduler = Scheduler::new();
        scheduler.enqueue(Box::new(SanctionSweep::new(
            sanctions.clone(),
            registry.clone(),
        )));
        while !scheduler.is_idle() {
            scheduler.tick().unwrap();
        }

        assert!(sanctions.exists("alice", "bob", SanctionKind::Read, &VPath::root()));
        assert!(!sanctions.exists("ghost", "bob", SanctionKind::Read, &VPath::root()));
    }

    #[test]
    fn test_sweep_resumes_across_steps() {
        let (registry, sanctions) = world();
        for i in 0..40 {
            let giver = format!("ghost{:02}", i);
            sanctions
                .grant(&giver, "bob", SanctionKind::Read, &VPath::root())
                .unwrap();
        }

        let mut sweep = SanctionSweep::new(sanctions.clone(), registry);
        assert_eq!(sweep.step().unwrap(), TaskStatus::Pending);
        // Not everything is gone after one slice.
        assert!(!sanctions.givers().is_empty());
        while sweep.step().unwrap() == TaskStatus::Pending {}
        assert!(sanctions.givers().is_empty());
    }

    #[test]
    fn test_idle_scheduler_tick_is_noop() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.is_idle());
        scheduler.tick().unwrap();
    }
}

//! Deferred work for the tour controller.
//!
//! Everything runs on one thread: instead of timers firing callbacks, the
//! controller queues [`ScheduledTask`]s against a [`VirtualClock`] and the
//! host drains whatever is due. Each task records the controller generation
//! it was scheduled under so superseded work can be recognized and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Monotonic millisecond clock shared between the scheduler and anything
/// that needs "time since page load" (late-rendering page content).
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    millis: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }

    /// Move the clock forward to `instant`; never moves backwards
    pub fn set(&self, instant: Duration) {
        self.millis
            .fetch_max(instant.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// What a deferred task does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Load-time resume of an active tour
    Resume,
    /// Another attempt at resolving the target of `step`
    RetryShow { step: usize, attempt: u32 },
    /// Position the popover now that its size is known
    PositionPopover,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub due: Duration,
    pub generation: u64,
    pub kind: TaskKind,
}

/// Pending tasks ordered by due time, then by scheduling order
#[derive(Debug)]
pub struct TaskQueue {
    clock: VirtualClock,
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

impl TaskQueue {
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            next_id: 0,
            tasks: Vec::new(),
        }
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn schedule(&mut self, delay: Duration, generation: u64, kind: TaskKind) {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let task = ScheduledTask {
            id,
            due: self.clock.now() + delay,
            generation,
            kind,
        };
        let index = self
            .tasks
            .partition_point(|t| (t.due, t.id) <= (task.due, task.id));
        self.tasks.insert(index, task);
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }

    /// Earliest task whose due time has passed
    pub fn pop_due(&mut self) -> Option<ScheduledTask> {
        let now = self.clock.now();
        if self.tasks.first().is_some_and(|t| t.due <= now) {
            Some(self.tasks.remove(0))
        } else {
            None
        }
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.tasks.first().map(|t| t.due)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_never_moves_backwards() {
        let clock = VirtualClock::new();
        clock.set(Duration::from_millis(200));
        clock.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(200));
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(205));
    }

    #[test]
    fn test_clock_clones_share_time() {
        let clock = VirtualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(42));
        assert_eq!(other.now(), Duration::from_millis(42));
    }

    #[test]
    fn test_tasks_fire_in_due_order() {
        let clock = VirtualClock::new();
        let mut queue = TaskQueue::new(clock.clone());
        queue.schedule(Duration::from_millis(80), 1, TaskKind::PositionPopover);
        queue.schedule(Duration::from_millis(50), 1, TaskKind::Resume);
        queue.schedule(
            Duration::from_millis(50),
            1,
            TaskKind::RetryShow {
                step: 0,
                attempt: 1,
            },
        );

        assert!(queue.pop_due().is_none());
        assert_eq!(queue.next_due(), Some(Duration::from_millis(50)));

        clock.set(Duration::from_millis(50));
        assert_eq!(queue.pop_due().unwrap().kind, TaskKind::Resume);
        assert!(matches!(
            queue.pop_due().unwrap().kind,
            TaskKind::RetryShow { .. }
        ));
        assert!(queue.pop_due().is_none());

        clock.set(Duration::from_millis(80));
        assert_eq!(queue.pop_due().unwrap().kind, TaskKind::PositionPopover);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut queue = TaskQueue::new(VirtualClock::new());
        queue.schedule(Duration::ZERO, 0, TaskKind::Resume);
        queue.schedule(Duration::ZERO, 0, TaskKind::PositionPopover);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.cancel_all(), 2);
        assert!(queue.is_empty());
        assert!(queue.pop_due().is_none());
    }

    #[test]
    fn test_task_records_generation() {
        let mut queue = TaskQueue::new(VirtualClock::new());
        queue.schedule(Duration::ZERO, 7, TaskKind::Resume);
        assert_eq!(queue.pop_due().unwrap().generation, 7);
    }
}

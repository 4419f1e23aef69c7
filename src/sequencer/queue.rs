use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use super::step::Step;

/// A step scheduled on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub due: Duration,
    /// Insertion sequence, breaks ties between equal due times.
    pub seq: u64,
    /// Epoch the task was scheduled under.
    pub epoch: u64,
    pub step: Step,
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-queue of scheduled steps ordered by `(due, seq)`.
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<ScheduledTask>>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a step at an absolute virtual time.
    pub fn schedule(&mut self, due: Duration, epoch: u64, step: Step) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledTask {
            due,
            seq,
            epoch,
            step,
        }));
    }

    /// Due time of the earliest task, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.heap.peek().map(|Reverse(task)| task.due)
    }

    /// Pop the earliest task if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<ScheduledTask> {
        match self.heap.peek() {
            Some(Reverse(task)) if task.due <= now => self.heap.pop().map(|Reverse(task)| task),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_pops_in_due_order() {
        let mut queue = TaskQueue::new();
        queue.schedule(ms(300), 1, Step::Correlate);
        queue.schedule(ms(100), 1, Step::Intro(0));
        queue.schedule(ms(200), 1, Step::BeginSources);

        assert_eq!(queue.next_due(), Some(ms(100)));
        assert_eq!(queue.pop_due(ms(1000)).map(|t| t.step), Some(Step::Intro(0)));
        assert_eq!(queue.pop_due(ms(1000)).map(|t| t.step), Some(Step::BeginSources));
        assert_eq!(queue.pop_due(ms(1000)).map(|t| t.step), Some(Step::Correlate));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ties_break_by_insertion() {
        let mut queue = TaskQueue::new();
        queue.schedule(ms(100), 1, Step::Check(0));
        queue.schedule(ms(100), 2, Step::Intro(0));

        let first = queue.pop_due(ms(100)).unwrap();
        assert_eq!(first.step, Step::Check(0));
        assert_eq!(first.epoch, 1);
        assert_eq!(queue.pop_due(ms(100)).unwrap().epoch, 2);
    }

    #[test]
    fn test_future_tasks_stay_queued() {
        let mut queue = TaskQueue::new();
        queue.schedule(ms(500), 1, Step::Reveal);

        assert!(queue.pop_due(ms(499)).is_none());
        assert_eq!(queue.len(), 1);
        assert!(queue.pop_due(ms(500)).is_some());
    }
}

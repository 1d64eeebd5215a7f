// tank_brain_core/brain/src/systems/scheduler.rs
// One-shot continuations keyed on the simulation tick. Replaces wall-clock timeouts so that
// spawn stabilisation, reload locks, wall expiry and ambush/bait timeouts stay deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<T> {
    due_tick: u64,
    sequence: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_tick == other.due_tick && self.sequence == other.sequence
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_tick
            .cmp(&other.due_tick)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[derive(Debug)]
pub struct Scheduler<T> {
    queue: BinaryHeap<Reverse<Entry<T>>>,
    next_sequence: u64,
    now_tick: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Scheduler { queue: BinaryHeap::new(), next_sequence: 0, now_tick: 0 }
    }

    pub fn schedule_at(&mut self, due_tick: u64, task: T) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.queue.push(Reverse(Entry { due_tick, sequence, task }));
    }

    /// Schedules relative to the last tick seen by `drain_due`.
    pub fn schedule_in(&mut self, ticks: u64, task: T) {
        self.schedule_at(self.now_tick + ticks, task);
    }

    /// Removes and returns every task due at or before `now_tick`, earliest first. Tasks
    /// sharing a due tick come out in the order they were scheduled.
    pub fn drain_due(&mut self, now_tick: u64) -> Vec<T> {
        self.now_tick = self.now_tick.max(now_tick);
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.due_tick > now_tick {
                break;
            }
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    pub fn cancel_where<F: FnMut(&T) -> bool>(&mut self, mut predicate: F) -> usize {
        let before = self.queue.len();
        self.queue.retain(|Reverse(entry)| !predicate(&entry.task));
        before - self.queue.len()
    }

    pub fn next_due_tick(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(entry)| entry.due_tick)
    }

    pub fn now_tick(&self) -> u64 {
        self.now_tick
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

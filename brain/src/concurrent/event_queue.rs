// tank_brain_core/brain/src/concurrent/event_queue.rs
use crate::core::events::{BrainEvent, EventPriority};
use crossbeam_queue::SegQueue;

/// Lock-free three-level event queue. Combatants push through `&self` during their tick; the
/// host drains between ticks, highest priority first.
pub struct PriorityEventQueue {
    high_priority: SegQueue<BrainEvent>,
    normal_priority: SegQueue<BrainEvent>,
    low_priority: SegQueue<BrainEvent>,
}

impl PriorityEventQueue {
    pub fn new() -> Self {
        PriorityEventQueue {
            high_priority: SegQueue::new(),
            normal_priority: SegQueue::new(),
            low_priority: SegQueue::new(),
        }
    }

    pub fn push(&self, event: BrainEvent, priority: EventPriority) {
        match priority {
            EventPriority::High => self.high_priority.push(event),
            EventPriority::Normal => self.normal_priority.push(event),
            EventPriority::Low => self.low_priority.push(event),
        }
    }

    /// Pushes with the event's own priority.
    pub fn emit(&self, event: BrainEvent) {
        let priority = event.priority();
        self.push(event, priority);
    }

    pub fn pop(&self) -> Option<BrainEvent> {
        if let Some(event) = self.high_priority.pop() {
            return Some(event);
        }
        if let Some(event) = self.normal_priority.pop() {
            return Some(event);
        }
        self.low_priority.pop()
    }

    pub fn pop_batch(&self, max_count: usize) -> Vec<BrainEvent> {
        let mut batch = Vec::with_capacity(max_count.min(self.len()));
        for queue in [&self.high_priority, &self.normal_priority, &self.low_priority] {
            while batch.len() < max_count {
                match queue.pop() {
                    Some(event) => batch.push(event),
                    None => break,
                }
            }
        }
        batch
    }

    pub fn drain(&self) -> Vec<BrainEvent> {
        self.pop_batch(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.high_priority.is_empty()
            && self.normal_priority.is_empty()
            && self.low_priority.is_empty()
    }

    pub fn len(&self) -> usize {
        self.high_priority.len() + self.normal_priority.len() + self.low_priority.len()
    }
}

impl Default for PriorityEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

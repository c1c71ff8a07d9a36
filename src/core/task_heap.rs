//! Min-heap of scheduled tasks ordered by fire time.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::task::{ScheduledTask, TaskKey};

/// Heap slot. Ordered so the earliest fire time sits on top of the max-heap,
/// FIFO by registration sequence for equal times.
struct HeapEntry {
    execute_at_ms: u128,
    seq: u64,
    key: TaskKey,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behaviour on top of std's max-heap.
        match other.execute_at_ms.cmp(&self.execute_at_ms) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

/// Binary min-heap of [`ScheduledTask`]s with replace-by-key and remove-by-key.
///
/// Removal and replacement are lazy: the live task for each key is tracked in
/// a side table together with the sequence number of its heap slot, and slots
/// whose sequence no longer matches are discarded when they surface. The heap
/// is compacted once stale slots outnumber live ones.
pub struct TaskHeap {
    heap: BinaryHeap<HeapEntry>,
    live: HashMap<TaskKey, (u64, ScheduledTask)>,
    next_seq: u64,
}

impl Default for TaskHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskHeap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Insert a task, replacing any pending task with the same key.
    /// Returns the replaced task.
    pub fn push(&mut self, task: ScheduledTask) -> Option<ScheduledTask> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry {
            execute_at_ms: task.execute_at_ms,
            seq,
            key: task.key,
        });
        let replaced = self.live.insert(task.key, (seq, task)).map(|(_, t)| t);
        self.maybe_compact();
        replaced
    }

    /// Remove the pending task with `key`, if any.
    pub fn remove(&mut self, key: &TaskKey) -> Option<ScheduledTask> {
        let removed = self.live.remove(key).map(|(_, t)| t);
        self.maybe_compact();
        removed
    }

    /// Pending task for `key`.
    pub fn get(&self, key: &TaskKey) -> Option<&ScheduledTask> {
        self.live.get(key).map(|(_, t)| t)
    }

    /// Whether a task with `key` is pending.
    pub fn contains(&self, key: &TaskKey) -> bool {
        self.live.contains_key(key)
    }

    /// Fire time of the earliest pending task.
    pub fn next_fire_at(&mut self) -> Option<u128> {
        self.discard_stale_top();
        self.heap.peek().map(|e| e.execute_at_ms)
    }

    /// Remove and return the earliest pending task.
    pub fn pop(&mut self) -> Option<ScheduledTask> {
        self.discard_stale_top();
        let entry = self.heap.pop()?;
        self.live.remove(&entry.key).map(|(_, t)| t)
    }

    /// Remove and return every task due at or before `now_ms`, earliest first.
    pub fn pop_due(&mut self, now_ms: u128) -> Vec<ScheduledTask> {
        let mut due = Vec::new();
        while let Some(at) = self.next_fire_at() {
            if at > now_ms {
                break;
            }
            if let Some(task) = self.pop() {
                due.push(task);
            }
        }
        due
    }

    /// Snapshot of pending tasks, earliest first.
    pub fn pending(&self) -> Vec<ScheduledTask> {
        let mut tasks: Vec<(u64, ScheduledTask)> = self.live.values().cloned().collect();
        tasks.sort_by(|(sa, a), (sb, b)| {
            a.execute_at_ms
                .cmp(&b.execute_at_ms)
                .then_with(|| sa.cmp(sb))
        });
        tasks.into_iter().map(|(_, t)| t).collect()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no task is pending.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn is_stale(&self, entry: &HeapEntry) -> bool {
        self.live
            .get(&entry.key)
            .map_or(true, |(seq, _)| *seq != entry.seq)
    }

    fn discard_stale_top(&mut self) {
        while let Some(top) = self.heap.peek() {
            if !self.is_stale(top) {
                break;
            }
            self.heap.pop();
        }
    }

    fn maybe_compact(&mut self) {
        if self.heap.len() <= 2 * self.live.len() + 16 {
            return;
        }
        let live = &self.live;
        self.heap
            .retain(|e| live.get(&e.key).is_some_and(|(seq, _)| *seq == e.seq));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::TaskPayload;

    fn window_end(league_id: i64, at: u128) -> ScheduledTask {
        ScheduledTask::new(at, TaskPayload::TransferWindowEnd { league_id })
    }

    fn timeout(league_id: i64, at: u128, pick_number: u32) -> ScheduledTask {
        ScheduledTask::new(
            at,
            TaskPayload::DraftTurnTimeout {
                league_id,
                player_id: 1,
                pick_number,
            },
        )
    }

    #[test]
    fn test_pops_in_fire_time_order() {
        let mut heap = TaskHeap::new();
        heap.push(window_end(1, 5_000));
        heap.push(window_end(2, 1_000));
        heap.push(window_end(3, 10_000));

        assert_eq!(heap.pop().unwrap().key.owner, 2);
        assert_eq!(heap.pop().unwrap().key.owner, 1);
        assert_eq!(heap.pop().unwrap().key.owner, 3);
        assert!(heap.pop().is_none());
    }

    #[test]
    fn test_fifo_for_equal_fire_times() {
        let mut heap = TaskHeap::new();
        heap.push(window_end(9, 100));
        heap.push(window_end(4, 100));
        heap.push(window_end(6, 100));

        let order: Vec<i64> = std::iter::from_fn(|| heap.pop()).map(|t| t.key.owner).collect();
        assert_eq!(order, vec![9, 4, 6]);
    }

    #[test]
    fn test_same_key_replaces() {
        let mut heap = TaskHeap::new();
        assert!(heap.push(timeout(1, 1_000, 1)).is_none());
        let replaced = heap.push(timeout(1, 9_000, 2)).unwrap();
        assert_eq!(replaced.execute_at_ms, 1_000);
        assert_eq!(heap.len(), 1);

        // Stale slot at 1_000 must not surface.
        assert_eq!(heap.next_fire_at(), Some(9_000));
        let task = heap.pop().unwrap();
        assert_eq!(
            task.payload,
            TaskPayload::DraftTurnTimeout {
                league_id: 1,
                player_id: 1,
                pick_number: 2
            }
        );
        assert!(heap.is_empty());
    }

    #[test]
    fn test_remove_by_key() {
        let mut heap = TaskHeap::new();
        heap.push(window_end(1, 100));
        heap.push(window_end(2, 200));

        let removed = heap.remove(&TaskKey::new(
            crate::core::task::TaskType::TransferWindowEnd,
            1,
        ));
        assert_eq!(removed.unwrap().execute_at_ms, 100);
        assert_eq!(heap.next_fire_at(), Some(200));
        assert_eq!(heap.len(), 1);
        assert!(heap.remove(&TaskKey::turn_timeout(1)).is_none());
    }

    #[test]
    fn test_pop_due_stops_at_now() {
        let mut heap = TaskHeap::new();
        heap.push(window_end(1, 100));
        heap.push(window_end(2, 200));
        heap.push(window_end(3, 300));

        let due = heap.pop_due(200);
        assert_eq!(due.iter().map(|t| t.key.owner).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(heap.len(), 1);
        assert!(heap.pop_due(250).is_empty());
    }

    #[test]
    fn test_compaction_keeps_live_tasks() {
        let mut heap = TaskHeap::new();
        for pick in 0..200 {
            heap.push(timeout(1, 1_000 + u128::from(pick), pick));
        }
        heap.push(window_end(2, 50));

        assert_eq!(heap.len(), 2);
        assert!(heap.heap.len() <= 2 * heap.len() + 16 + 1);
        assert_eq!(heap.pop().unwrap().key.owner, 2);
        assert_eq!(heap.pop().unwrap().execute_at_ms, 1_199);
    }

    #[test]
    fn test_pending_snapshot_is_sorted() {
        let mut heap = TaskHeap::new();
        heap.push(window_end(1, 300));
        heap.push(window_end(2, 100));
        let pending = heap.pending();
        assert_eq!(pending[0].key.owner, 2);
        assert_eq!(pending[1].key.owner, 1);
    }
}

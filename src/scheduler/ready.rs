use super::graph::TaskId;
use super::{SortingPolicy, TileTask};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// Tasks whose predecessors have all finished.
#[derive(Debug)]
pub(crate) enum ReadyQueue {
    Fifo(VecDeque<TaskId>),
    // min-heap on (level, rank, submission order)
    CriticalPath(BinaryHeap<Reverse<(usize, u8, TaskId)>>),
}

impl ReadyQueue {
    pub fn new(policy: SortingPolicy) -> Self {
        match policy {
            SortingPolicy::Fifo => ReadyQueue::Fifo(VecDeque::new()),
            SortingPolicy::CriticalPath => ReadyQueue::CriticalPath(BinaryHeap::new()),
        }
    }

    pub fn push<T>(&mut self, id: TaskId, task: &TileTask<T>) {
        match self {
            ReadyQueue::Fifo(q) => q.push_back(id),
            ReadyQueue::CriticalPath(q) => q.push(Reverse((task.level, task.kind().rank(), id))),
        }
    }

    pub fn pop(&mut self) -> Option<TaskId> {
        match self {
            ReadyQueue::Fifo(q) => q.pop_front(),
            ReadyQueue::CriticalPath(q) => q.pop().map(|Reverse((_, _, id))| id),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadyQueue::Fifo(q) => q.len(),
            ReadyQueue::CriticalPath(q) => q.len(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            ReadyQueue::Fifo(q) => q.clear(),
            ReadyQueue::CriticalPath(q) => q.clear(),
        }
    }
}

use super::{TileCoord, TileTask};
use std::collections::HashMap;

pub(crate) type TaskId = usize;

// last writer and pending readers of a tile
#[derive(Debug, Default)]
struct TileAccess {
    last_writer: Option<TaskId>,
    readers: Vec<TaskId>,
}

#[derive(Debug)]
pub(crate) struct TaskNode<T> {
    pub task: TileTask<T>,
    // number of unfinished predecessors
    pub waiting_on: usize,
    pub dependents: Vec<TaskId>,
}

/// Dependency graph of submitted tile tasks.
///
/// A task that reads a tile depends on the last task that wrote it.  A task
/// that writes a tile depends on the last writer and on every reader
/// submitted since.  Dependencies therefore always point at earlier
/// submissions and the graph is acyclic.
#[derive(Debug)]
pub(crate) struct TaskGraph<T> {
    nodes: Vec<TaskNode<T>>,
    access: HashMap<TileCoord, TileAccess>,
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            access: HashMap::new(),
        }
    }
}

impl<T> TaskGraph<T> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, task: TileTask<T>) -> TaskId {
        let id = self.nodes.len();
        let reads = task.op.reads();
        let writes = task.op.writes();

        let mut deps = Vec::new();
        for r in &reads {
            if let Some(acc) = self.access.get(r) {
                deps.extend(acc.last_writer);
            }
        }
        for w in &writes {
            if let Some(acc) = self.access.get(w) {
                deps.extend(acc.last_writer);
                deps.extend(acc.readers.iter().copied());
            }
        }
        deps.sort_unstable();
        deps.dedup();

        for &d in &deps {
            self.nodes[d].dependents.push(id);
        }
        self.nodes.push(TaskNode {
            task,
            waiting_on: deps.len(),
            dependents: Vec::new(),
        });

        for r in reads {
            self.access.entry(r).or_default().readers.push(id);
        }
        for w in writes {
            let acc = self.access.entry(w).or_default();
            acc.last_writer = Some(id);
            acc.readers.clear();
        }
        id
    }

    pub fn node(&self, id: TaskId) -> &TaskNode<T> {
        &self.nodes[id]
    }

    /// tasks with no predecessors, in submission order
    pub fn roots(&self) -> Vec<TaskId> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].waiting_on == 0)
            .collect()
    }

    /// Mark a task finished.  Returns the dependents that became ready.
    pub fn complete(&mut self, id: TaskId) -> Vec<TaskId> {
        self.retire(id);
        let dependents = std::mem::take(&mut self.nodes[id].dependents);
        let mut ready = Vec::new();
        for d in dependents {
            let node = &mut self.nodes[d];
            node.waiting_on -= 1;
            if node.waiting_on == 0 {
                ready.push(d);
            }
        }
        ready
    }

    // drop a finished task from the per-tile access records
    fn retire(&mut self, id: TaskId) {
        let task = &self.nodes[id].task;
        for r in task.op.reads() {
            if let Some(acc) = self.access.get_mut(&r) {
                acc.readers.retain(|&x| x != id);
            }
        }
        for w in task.op.writes() {
            if let Some(acc) = self.access.get_mut(&w) {
                if acc.last_writer == Some(id) {
                    acc.last_writer = None;
                }
            }
        }
    }

    /// predecessors of every task, for inspection
    #[cfg(test)]
    pub fn predecessors(&self) -> Vec<Vec<TaskId>> {
        let mut preds = vec![Vec::new(); self.nodes.len()];
        for (i, n) in self.nodes.iter().enumerate() {
            for &d in &n.dependents {
                preds[d].push(i);
            }
        }
        preds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{MatrixHandle, TileOp};

    fn t(i: usize, j: usize) -> TileCoord {
        TileCoord::new(MatrixHandle(0), i, j)
    }

    #[test]
    fn test_dependencies() {
        let mut g = TaskGraph::<f64>::default();
        // 0: write (0,0)
        g.add(TileTask::new(TileOp::Potrf { a: t(0, 0) }, 0));
        // 1, 2: read (0,0)
        g.add(TileTask::new(TileOp::Trsm { l: t(0, 0), b: t(1, 0) }, 0));
        g.add(TileTask::new(TileOp::Trsm { l: t(0, 0), b: t(2, 0) }, 0));
        // 3: write (0,0) again, waits for writer and both readers
        g.add(TileTask::new(TileOp::Potrf { a: t(0, 0) }, 1));
        // 4: independent
        g.add(TileTask::new(TileOp::Potrf { a: t(3, 3) }, 0));

        let preds = g.predecessors();
        assert_eq!(preds[0], Vec::<usize>::new());
        assert_eq!(preds[1], vec![0]);
        assert_eq!(preds[2], vec![0]);
        assert_eq!(preds[3], vec![0, 1, 2]);
        assert!(preds[4].is_empty());
        assert_eq!(g.roots(), vec![0, 4]);

        // dependencies only ever point backwards
        for (i, p) in preds.iter().enumerate() {
            assert!(p.iter().all(|&d| d < i));
        }

        assert_eq!(g.complete(0), vec![1, 2]);
        assert!(g.complete(1).is_empty());
        assert_eq!(g.complete(2), vec![3]);
    }
}

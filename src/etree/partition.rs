use super::MeshGraph;
use std::collections::VecDeque;
use thiserror::Error;

/// Error type returned by a [`GraphPartitioner`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Cannot partition into {0} parts")]
    InvalidPartCount(usize),
    #[error("Partitioner failed: {0}")]
    Failed(String),
}

/// Splits a graph into a given number of parts.
///
/// `partition` returns one part id per vertex.  Vertices given an id
/// outside of `0..parts` are treated as unplaced and are attached to the
/// tree after construction.
pub trait GraphPartitioner: Send + Sync {
    fn partition(&self, graph: &MeshGraph, parts: usize) -> Result<Vec<usize>, PartitionError>;
}

/// Greedy graph growing partitioner.
///
/// Parts are grown one at a time in breadth first order from an unassigned
/// vertex of least degree until each holds its share of the remaining
/// vertices.  With two parts this is a greedy bisection.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPartitioner;

impl GraphPartitioner for GreedyPartitioner {
    fn partition(&self, graph: &MeshGraph, parts: usize) -> Result<Vec<usize>, PartitionError> {
        if parts == 0 {
            return Err(PartitionError::InvalidPartCount(parts));
        }
        let n = graph.len();
        let mut part = vec![usize::MAX; n];
        let mut remaining = n;
        let mut queue = VecDeque::new();

        for p in 0..parts - 1 {
            let left = parts - p;
            let target = (remaining + left - 1) / left;
            let mut size = 0;
            queue.clear();

            while size < target {
                let v = match queue.pop_front() {
                    Some(v) => v,
                    None => match least_degree_unassigned(graph, &part) {
                        Some(v) => v,
                        None => break,
                    },
                };
                if part[v] != usize::MAX {
                    continue;
                }
                part[v] = p;
                size += 1;
                queue.extend(graph.neighbors(v).map(|(u, _)| u).filter(|&u| part[u] == usize::MAX));
            }
            remaining -= size;
        }

        for p in part.iter_mut().filter(|p| **p == usize::MAX) {
            *p = parts - 1;
        }
        Ok(part)
    }
}

fn least_degree_unassigned(graph: &MeshGraph, part: &[usize]) -> Option<usize> {
    (0..graph.len())
        .filter(|&v| part[v] == usize::MAX)
        .min_by_key(|&v| graph.degree(v))
}

// disjoint set union type for splitting a graph into connected components
// See: https://www.cs.princeton.edu/~wayne/kleinberg-tardos/pdf/UnionFind-2x2.pdf

use super::MeshGraph;

#[derive(Debug)]
pub(crate) struct DisjointSetUnion {
    parents: Vec<usize>,
    ranks: Vec<usize>,
}

impl DisjointSetUnion {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parents: (0..n).collect(),
            ranks: vec![0; n],
        }
    }

    pub(crate) fn union(&mut self, x: usize, y: usize) {
        let r = self.root(x);
        let s = self.root(y);

        if r == s {
            return;
        }

        match self.ranks[r].cmp(&self.ranks[s]) {
            std::cmp::Ordering::Greater => {
                self.parents[s] = r;
            }
            std::cmp::Ordering::Less => {
                self.parents[r] = s;
            }
            std::cmp::Ordering::Equal => {
                self.parents[r] = s;
                self.ranks[s] += 1;
            }
        }
    }

    pub(crate) fn in_same_set(&mut self, x: usize, y: usize) -> bool {
        self.root(x) == self.root(y)
    }

    fn root(&mut self, mut x: usize) -> usize {
        while x != self.parents[x] {
            self.parents[x] = self.parents[self.parents[x]]; //path halving
            x = self.parents[x];
        }
        x
    }

    // groups of set members, each group sorted and the groups ordered
    // by their smallest member
    pub(crate) fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.parents.len();
        let mut slot = vec![usize::MAX; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for x in 0..n {
            let r = self.root(x);
            if slot[r] == usize::MAX {
                slot[r] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot[r]].push(x);
        }
        groups
    }
}

/// Connected components of `g`, as sorted lists of vertices.
pub(crate) fn components(g: &MeshGraph) -> Vec<Vec<usize>> {
    let mut dsu = DisjointSetUnion::new(g.len());
    for u in 0..g.len() {
        for (v, _) in g.neighbors(u) {
            if u < v {
                dsu.union(u, v);
            }
        }
    }
    dsu.groups()
}

#[test]
fn test_union() {
    let mut dsu = DisjointSetUnion::new(5);
    dsu.union(0, 1);
    dsu.union(2, 3);
    dsu.union(1, 2);
    assert!(dsu.in_same_set(0, 2));
    assert!(dsu.in_same_set(1, 3));
    assert!(dsu.in_same_set(0, 3));
    assert!(!dsu.in_same_set(4, 2));

    // long chains
    let mut dsu = DisjointSetUnion::new(10);
    for k in 0..9 {
        dsu.union(k, k + 1);
    }
    assert!(dsu.in_same_set(0, 9));
    assert_eq!(dsu.root(0), dsu.root(9));
}

#[test]
fn test_groups() {
    let mut dsu = DisjointSetUnion::new(6);
    dsu.union(4, 1);
    dsu.union(5, 3);
    dsu.union(3, 0);
    assert_eq!(dsu.groups(), vec![vec![0, 3, 5], vec![1, 4], vec![2]]);
}

#[test]
fn test_components() {
    let g = MeshGraph::from_edges(5, &[(0, 2, 1.0), (3, 4, 1.0)]).unwrap();
    assert_eq!(components(&g), vec![vec![0, 2], vec![1], vec![3, 4]]);
}

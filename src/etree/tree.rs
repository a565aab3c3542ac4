use super::TreeError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// this value used to mark the root node, i.e. the one with no parent
pub(crate) const NO_PARENT: usize = usize::MAX;

// marks an element not yet owned by any node
const UNASSIGNED: usize = usize::MAX;

// a single node of an elimination tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct TreeNode {
    // mesh elements owned by this node, sorted
    elements: Vec<usize>,
    parent: usize,
    children: Vec<usize>,
}

/// Rooted tree over groups of mesh elements.
///
/// Every element of the mesh belongs to exactly one node.  Eliminating the
/// nodes in [`post_order`](EliminationTree::post_order) visits every child
/// before its parent, and disjoint subtrees can be eliminated independently.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EliminationTree {
    nodes: Vec<TreeNode>,
    root: usize,
    // post ordering of the nodes, children before parents
    post: Vec<usize>,
    // owning node of each element
    owner: Vec<usize>,
}

impl EliminationTree {
    /// Index of the root node
    pub fn root(&self) -> usize {
        self.root
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of mesh elements the tree is built over
    pub fn n_elements(&self) -> usize {
        self.owner.len()
    }

    pub fn parent(&self, node: usize) -> Option<usize> {
        match self.nodes[node].parent {
            NO_PARENT => None,
            p => Some(p),
        }
    }

    pub fn children(&self, node: usize) -> &[usize] {
        &self.nodes[node].children
    }

    /// Elements owned directly by `node`, in increasing order.
    pub fn elements(&self, node: usize) -> &[usize] {
        &self.nodes[node].elements
    }

    /// Node owning `element`, or `None` if the element is unplaced.
    pub fn owner(&self, element: usize) -> Option<usize> {
        match self.owner.get(element) {
            Some(&UNASSIGNED) | None => None,
            Some(&n) => Some(n),
        }
    }

    /// All nodes with every child listed before its parent.  The root is
    /// last.
    pub fn post_order(&self) -> &[usize] {
        &self.post
    }

    /// Distance from `node` to the root
    pub fn depth(&self, node: usize) -> usize {
        self.ancestors(node).count()
    }

    /// Strict ancestors of `node`, nearest first.
    pub fn ancestors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent(node), move |&p| self.parent(p))
    }

    /// Lowest common ancestor of `a` and `b`.  A node is its own ancestor
    /// here, so `lca(a, a) == a`.
    pub fn lca(&self, a: usize, b: usize) -> usize {
        let (mut a, mut b) = (a, b);
        let (mut da, mut db) = (self.depth(a), self.depth(b));
        while da > db {
            a = self.nodes[a].parent;
            da -= 1;
        }
        while db > da {
            b = self.nodes[b].parent;
            db -= 1;
        }
        while a != b {
            a = self.nodes[a].parent;
            b = self.nodes[b].parent;
        }
        a
    }

    /// Elements owned by `node` and all of its descendants, sorted.
    pub fn subtree_elements(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(v) = stack.pop() {
            out.extend_from_slice(&self.nodes[v].elements);
            stack.extend_from_slice(&self.nodes[v].children);
        }
        out.sort_unstable();
        out
    }

    /// Checks that every element is owned by exactly one node and that the
    /// node links form a single tree.
    pub fn check_cover(&self) -> Result<(), TreeError> {
        let mut hits = vec![0u8; self.n_elements()];
        for node in self.nodes.iter() {
            for &e in node.elements.iter() {
                match hits.get_mut(e) {
                    Some(h) if *h == 0 => *h = 1,
                    _ => return Err(TreeError::InternalInvariantViolation),
                }
            }
        }
        if hits.iter().any(|&h| h == 0) {
            return Err(TreeError::InternalInvariantViolation);
        }

        // every node reached exactly once from the root
        if self.post.len() != self.nodes.len() || self.post.last() != Some(&self.root) {
            return Err(TreeError::InternalInvariantViolation);
        }
        let mut seen = vec![false; self.nodes.len()];
        for &v in self.post.iter() {
            if std::mem::replace(&mut seen[v], true) {
                return Err(TreeError::InternalInvariantViolation);
            }
            if self.nodes[v].children.iter().any(|&c| !seen[c]) {
                return Err(TreeError::InternalInvariantViolation);
            }
        }
        Ok(())
    }

    // places an unowned element in `node`
    pub(crate) fn attach(&mut self, node: usize, element: usize) -> Result<(), TreeError> {
        match self.owner.get(element) {
            Some(&UNASSIGNED) => {}
            _ => return Err(TreeError::InternalInvariantViolation),
        }
        self.owner[element] = node;
        let elems = &mut self.nodes[node].elements;
        let at = elems.partition_point(|&x| x < element);
        elems.insert(at, element);
        Ok(())
    }
}

/// Growable collection of nodes used by the tree building strategies.
#[derive(Debug, Default)]
pub(crate) struct TreeArena {
    elements: Vec<Vec<usize>>,
    parent: Vec<usize>,
}

impl TreeArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, elements: Vec<usize>) -> usize {
        self.elements.push(elements);
        self.parent.push(NO_PARENT);
        self.parent.len() - 1
    }

    pub(crate) fn set_parent(&mut self, child: usize, parent: usize) {
        self.parent[child] = parent;
    }

    pub(crate) fn len(&self) -> usize {
        self.parent.len()
    }

    // maps every element `e` to `map[e]`
    pub(crate) fn relabel(&mut self, map: &[usize]) {
        for e in self.elements.iter_mut().flatten() {
            *e = map[*e];
        }
    }

    /// Completes the tree over `n_elements` elements.  Parentless nodes are
    /// collected under a new element-less root unless there is exactly one.
    pub(crate) fn into_tree(mut self, n_elements: usize) -> Result<EliminationTree, TreeError> {
        let tops: Vec<usize> = (0..self.len())
            .filter(|&v| self.parent[v] == NO_PARENT)
            .collect();

        let root = match tops.as_slice() {
            [r] => *r,
            _ => {
                let r = self.add_node(Vec::new());
                for v in tops {
                    self.set_parent(v, r);
                }
                r
            }
        };

        let mut children = children_from_parent(&self.parent);
        let post = post_order(root, &mut children);

        let mut owner = vec![UNASSIGNED; n_elements];
        let mut nodes = Vec::with_capacity(self.len());
        for (v, (mut elements, parent)) in self
            .elements
            .into_iter()
            .zip(self.parent)
            .enumerate()
        {
            elements.sort_unstable();
            for &e in elements.iter() {
                match owner.get_mut(e) {
                    Some(o) if *o == UNASSIGNED => *o = v,
                    _ => return Err(TreeError::InternalInvariantViolation),
                }
            }
            nodes.push(TreeNode {
                elements,
                parent,
                children: Vec::new(),
            });
        }
        for (node, ch) in nodes.iter_mut().zip(children) {
            node.children = ch;
        }

        Ok(EliminationTree {
            nodes,
            root,
            post,
            owner,
        })
    }
}

fn children_from_parent(parent: &[usize]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); parent.len()];
    for (i, &pi) in parent.iter().enumerate() {
        if pi != NO_PARENT {
            children[pi].push(i);
        }
    }
    children
}

// nodes unreachable from the root are left out
fn post_order(root: usize, children: &mut [Vec<usize>]) -> Vec<usize> {
    let n = children.len();
    let mut order = vec![n; n];

    let mut stack = Vec::with_capacity(n);
    stack.push(root);

    let mut post = Vec::with_capacity(n);
    let mut i = n;

    while let Some(v) = stack.pop() {
        i -= 1;
        order[v] = i;
        post.push(v);

        children[v].sort();
        stack.extend(children[v].iter());
    }

    post.sort_by(|&x, &y| order[x].cmp(&order[y]));
    post
}

/// Implements a Union-Find structure for merging buses joined by closed switches.
#[derive(Default, Debug, Clone)]
pub struct NodeMerge {
    parent: Vec<usize>, // Parent of each bus in the union-find forest.
    rank: Vec<u32>,     // Rank used for efficient union operations.
}

impl NodeMerge {
    /// Initializes the structure for `n` buses, each its own root.
    pub fn new(n: usize) -> Self {
        NodeMerge {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Finds the root of a bus, compressing the path on the way.
    pub fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = node;
        while self.parent[current] != root {
            let parent = self.parent[current];
            self.parent[current] = root;
            current = parent;
        }
        root
    }

    /// Merges the sets of two buses by rank.
    pub fn union(&mut self, a: usize, b: usize) {
        let root1 = self.find(a);
        let root2 = self.find(b);
        if root1 == root2 {
            return;
        }
        let (rank1, rank2) = (self.rank[root1], self.rank[root2]);
        if rank1 < rank2 {
            self.parent[root1] = root2;
        } else {
            self.parent[root2] = root1;
            if rank1 == rank2 {
                self.rank[root1] += 1;
            }
        }
    }

    /// Maps each bus to a dense node id, numbered in order of first appearance.
    ///
    /// Buses for which `keep` is false are left unmapped.
    pub fn node_mapping(&mut self, keep: impl Fn(usize) -> bool) -> (Vec<Option<usize>>, usize) {
        let n = self.parent.len();
        let mut root_to_node: Vec<Option<usize>> = vec![None; n];
        let mut mapping = vec![None; n];
        let mut next = 0;
        for bus in 0..n {
            if !keep(bus) {
                continue;
            }
            let root = self.find(bus);
            let node = *root_to_node[root].get_or_insert_with(|| {
                next += 1;
                next - 1
            });
            mapping[bus] = Some(node);
        }
        (mapping, next)
    }
}

//! Dependency graph for managing task dependencies.
//!
//! Design:
//! - Forward edges: task -> tasks it depends on (waits for)
//! - Reverse edges: task -> tasks that depend on it (waiting tasks)
//! - Invariant: edges and reverse_edges must be kept in sync

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::domain::TaskId;

/// Dependency graph for tracking task dependencies.
///
/// This graph maintains both forward and reverse edges for efficient lookups:
/// - `edges`: TaskId -> Set of TaskIds it depends on
/// - `reverse_edges`: TaskId -> Set of TaskIds waiting for it
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Forward edges: task -> tasks it depends on (waits for)
    edges: HashMap<TaskId, BTreeSet<TaskId>>,

    /// Reverse edges: task -> tasks that depend on it (waiting tasks)
    /// Enables O(1) lookup: "who is waiting for this task?"
    reverse_edges: HashMap<TaskId, BTreeSet<TaskId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: `task` depends on `depends_on`.
    ///
    /// Example: add_dependency(task_b, task_a) means "B waits for A"
    pub fn add_dependency(&mut self, task: TaskId, depends_on: TaskId) {
        self.edges.entry(task).or_default().insert(depends_on);
        self.reverse_edges.entry(depends_on).or_default().insert(task);
    }

    /// Tasks that directly depend on `task`, in id order.
    pub fn get_waiting_tasks(&self, task: TaskId) -> Vec<TaskId> {
        self.reverse_edges
            .get(&task)
            .map(|waiting| waiting.iter().copied().collect())
            .unwrap_or_default()
    }

    fn nodes(&self) -> BTreeSet<TaskId> {
        self.edges
            .keys()
            .chain(self.reverse_edges.keys())
            .copied()
            .collect()
    }

    /// Topological order (dependencies first) via Kahn's algorithm.
    ///
    /// `Err` carries one concrete cycle when the graph is not a DAG.
    /// O(V + E).
    pub fn topological_order(&self) -> Result<Vec<TaskId>, Vec<TaskId>> {
        let nodes = self.nodes();
        let mut unresolved: HashMap<TaskId, usize> = nodes
            .iter()
            .map(|n| (*n, self.edges.get(n).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: VecDeque<TaskId> = nodes
            .iter()
            .filter(|n| unresolved[*n] == 0)
            .copied()
            .collect();
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(node) = ready.pop_front() {
            order.push(node);
            for waiting in self.get_waiting_tasks(node) {
                if let Some(count) = unresolved.get_mut(&waiting) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(waiting);
                    }
                }
            }
        }

        if order.len() == nodes.len() {
            return Ok(order);
        }

        let resolved: HashSet<TaskId> = order.into_iter().collect();
        let stuck: BTreeSet<TaskId> = nodes.into_iter().filter(|n| !resolved.contains(n)).collect();
        Err(self.extract_cycle(&stuck))
    }

    /// Every stuck node waits on at least one other stuck node, so following
    /// stuck dependencies from any of them must revisit a node.
    fn extract_cycle(&self, stuck: &BTreeSet<TaskId>) -> Vec<TaskId> {
        let Some(&start) = stuck.iter().next() else {
            return Vec::new();
        };
        let mut path: Vec<TaskId> = Vec::new();
        let mut position: HashMap<TaskId, usize> = HashMap::new();
        let mut current = start;

        loop {
            if let Some(&at) = position.get(&current) {
                let mut cycle = path.split_off(at);
                cycle.push(current);
                return cycle;
            }
            position.insert(current, path.len());
            path.push(current);

            let next = self
                .edges
                .get(&current)
                .and_then(|deps| deps.iter().find(|d| stuck.contains(d)).copied());
            match next {
                Some(dep) => current = dep,
                None => return path,
            }
        }
    }

    /// Returns the first cycle found, or None if the graph is acyclic (DAG).
    pub fn detect_cycle(&self) -> Option<Vec<TaskId>> {
        self.topological_order().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn ids<const N: usize>() -> [TaskId; N] {
        std::array::from_fn(|i| TaskId::from_ulid(Ulid::from_parts(1, i as u128 + 1)))
    }

    #[test]
    fn new_graph_is_empty() {
        let [a] = ids();
        let graph = DependencyGraph::new();
        assert!(graph.get_waiting_tasks(a).is_empty());
        assert_eq!(graph.topological_order(), Ok(vec![]));
    }

    #[test]
    fn add_dependency_creates_both_edges() {
        let [a, b] = ids();
        let mut graph = DependencyGraph::new();

        graph.add_dependency(b, a); // B depends on A

        assert_eq!(graph.get_waiting_tasks(a), vec![b]);
        assert!(graph.get_waiting_tasks(b).is_empty());
        assert_eq!(graph.topological_order(), Ok(vec![a, b]));
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let [a, b, c] = ids();
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c, b);
        graph.add_dependency(b, a);

        assert_eq!(graph.topological_order(), Ok(vec![a, b, c]));
    }

    #[test]
    fn detect_simple_cycle() {
        let [a, b] = ids();
        let mut graph = DependencyGraph::new();

        // A -> B -> A
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let cycle = graph.detect_cycle().unwrap();
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn detect_self_dependency() {
        let [a] = ids();
        let mut graph = DependencyGraph::new();
        graph.add_dependency(a, a);

        assert_eq!(graph.detect_cycle(), Some(vec![a, a]));
    }

    #[test]
    fn detect_longer_cycle_reports_only_the_loop() {
        let [a, b, c, d] = ids();
        let mut graph = DependencyGraph::new();

        // B -> C -> D -> B, with A hanging off B
        graph.add_dependency(b, a);
        graph.add_dependency(c, b);
        graph.add_dependency(d, c);
        graph.add_dependency(b, d);

        let cycle = graph.detect_cycle().unwrap();
        assert!(!cycle.contains(&a));
        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn dag_with_diamond_should_not_detect_cycle() {
        let [a, b, c] = ids();
        let mut graph = DependencyGraph::new();

        graph.add_dependency(b, a);
        graph.add_dependency(c, b);
        graph.add_dependency(c, a); // Shortcut edge

        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn complex_dag_with_cross_edges() {
        let [a, b, c, d, e] = ids();
        let mut graph = DependencyGraph::new();

        //     A
        //    / \
        //   B   C
        //   |\ /|
        //   | X |
        //   |/ \|
        //   D   E
        graph.add_dependency(b, a);
        graph.add_dependency(c, a);
        graph.add_dependency(d, b);
        graph.add_dependency(e, b);
        graph.add_dependency(d, c);
        graph.add_dependency(e, c);

        let order = graph.topological_order().unwrap();
        let pos = |t: TaskId| order.iter().position(|x| *x == t).unwrap();
        assert!(pos(a) < pos(b) && pos(a) < pos(c));
        assert!(pos(b) < pos(d) && pos(c) < pos(e));
    }
}

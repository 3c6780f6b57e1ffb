use crate::types::StrIndexSet;
use crate::parser::MakefileModel;

use std::fmt;
use std::collections::VecDeque;

#[cfg(feature = "dbg")]
use tramer::tramer;

/// Edges run dependency -> dependent. Node names borrow from the model and are
/// addressed by their insertion index everywhere else.
#[derive(Debug, Default)]
pub struct DependencyGraph<'a> {
    nodes: StrIndexSet<'a>,
    dependents: Vec::<Vec::<usize>>,
    in_degree: Vec::<usize>,
}

impl<'a> DependencyGraph<'a> {
    #[cfg_attr(feature = "dbg", tramer("nanos"))]
    pub fn build(model: &MakefileModel<'a>) -> Self {
        let mut graph = Self::default();

        // Targets first, then dependencies: this order breaks ties in the scheduler.
        for rule in model.rules.iter() {
            graph.add_node(rule.target);
        }
        for rule in model.rules.iter() {
            for &dep in rule.deps.iter() {
                graph.add_node(dep);
            }
        }

        for rule in model.rules.iter() {
            let Some(target) = graph.index_of(rule.target) else { continue };
            for dep in rule.deps.iter() {
                let Some(dep) = graph.index_of(dep) else { continue };
                graph.add_edge(dep, target)
            }
        }

        graph
    }

    #[inline]
    fn add_node(&mut self, name: &'a str) -> usize {
        let (i, inserted) = self.nodes.insert_full(name);
        if inserted {
            self.dependents.push(Vec::new());
            self.in_degree.push(0);
        } i
    }

    #[inline]
    fn add_edge(&mut self, from: usize, to: usize) {
        let dependents = &mut self.dependents[from];
        if dependents.contains(&to) { return }
        dependents.push(to);
        self.in_degree[to] += 1
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline(always)]
    pub fn edge_count(&self) -> usize {
        self.dependents.iter().map(Vec::len).sum()
    }

    #[inline(always)]
    pub fn index_of(&self, name: &str) -> Option::<usize> {
        self.nodes.get_index_of(name)
    }

    #[inline(always)]
    pub fn node(&self, i: usize) -> &'a str {
        self.nodes[i]
    }

    #[inline(always)]
    pub fn nodes(&self) -> impl Iterator::<Item = &'a str> + '_ {
        self.nodes.iter().copied()
    }

    #[inline(always)]
    pub fn dependents(&self, i: usize) -> &[usize] {
        &self.dependents[i]
    }

    #[inline(always)]
    pub fn in_degree(&self, i: usize) -> usize {
        self.in_degree[i]
    }

    #[inline]
    pub fn names(&self, indexes: &[usize]) -> Vec::<&'a str> {
        indexes.iter().map(|&i| self.node(i)).collect()
    }
}

impl fmt::Display for DependencyGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            write!(f, "{node} (in-degree {d}):", d = self.in_degree[i])?;
            for &dependent in self.dependents[i].iter() {
                write!(f, " {}", self.nodes[dependent])?
            }
            writeln!(f)?
        }
        Ok(())
    }
}

/// Result of a topological sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Node indexes, every dependency before its dependents.
    pub order: Vec::<usize>,
    /// Nodes that never reached in-degree zero, in insertion order. Non-empty
    /// exactly when the graph has a cycle.
    pub stalled: Vec::<usize>,
}

impl Schedule {
    #[inline(always)]
    pub fn emitted(&self) -> usize {
        self.order.len()
    }

    #[inline(always)]
    pub fn is_complete(&self) -> bool {
        self.stalled.is_empty()
    }
}

/// Kahn's algorithm with a strict FIFO queue seeded in node insertion order.
#[cfg_attr(feature = "dbg", tramer("nanos"))]
pub fn topological_sort(graph: &DependencyGraph) -> Schedule {
    let n = graph.len();
    let mut in_degree = graph.in_degree.clone();
    let mut order = Vec::with_capacity(n);

    let mut queue = (0..n)
        .filter(|&i| in_degree[i] == 0)
        .collect::<VecDeque::<_>>();

    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &dependent in graph.dependents(node) {
            let d = &mut in_degree[dependent];
            *d -= 1;
            if *d == 0 {
                queue.push_back(dependent)
            }
        }
    }

    let stalled = (0..n).filter(|&i| in_degree[i] > 0).collect();
    Schedule { order, stalled }
}

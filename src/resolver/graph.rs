//! The module dependency graph.
//!
//! Built from a `DeclarationStore`; an edge `A -> B` means "A requires B".
//! A `DependencyGraph` only exists once referential integrity has been
//! checked and the relation is known to be acyclic. Nodes refer back into
//! the store by declaration index, the graph never owns modules itself.

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;

use crate::core::{DeclarationStore, Module};
use crate::resolver::errors::GraphError;

/// DFS marking for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// A validated, acyclic module dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'s> {
    store: &'s DeclarationStore,

    /// Node weight is the module's declaration index; node `i` is module `i`.
    graph: DiGraph<usize, ()>,

    /// Resolved dependencies per module, in declared order.
    deps: Vec<Vec<usize>>,
}

impl<'s> DependencyGraph<'s> {
    /// Build and validate the graph for every module in the store.
    ///
    /// All problems are collected: unresolved names, self-dependencies and
    /// every cycle found by the traversal.
    pub fn build(store: &'s DeclarationStore) -> Result<Self, Vec<GraphError>> {
        let modules = store.modules();
        let mut errors = Vec::new();

        let mut graph = DiGraph::with_capacity(modules.len(), modules.len());
        for index in 0..modules.len() {
            graph.add_node(index);
        }

        let mut deps = vec![Vec::new(); modules.len()];
        for (index, module) in modules.iter().enumerate() {
            for dep in module.dependencies() {
                if dep == module.name() {
                    errors.push(GraphError::SelfDependency {
                        module: module.name().to_string(),
                    });
                    continue;
                }

                match store.module_position(dep) {
                    Some(dep_index) => {
                        deps[index].push(dep_index);
                        graph.add_edge(NodeIndex::new(index), NodeIndex::new(dep_index), ());
                    }
                    None => errors.push(GraphError::UnresolvedDependency {
                        module: module.name().to_string(),
                        missing: dep.clone(),
                    }),
                }
            }
        }

        for cycle in find_cycles(&deps) {
            errors.push(GraphError::CyclicDependency {
                cycle: cycle
                    .into_iter()
                    .map(|i| modules[i].name().to_string())
                    .collect(),
            });
        }

        if !errors.is_empty() {
            tracing::debug!("dependency graph rejected with {} error(s)", errors.len());
            return Err(errors);
        }

        tracing::debug!(
            "dependency graph: {} modules, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(DependencyGraph { store, graph, deps })
    }

    /// The store this graph was built from.
    pub fn store(&self) -> &'s DeclarationStore {
        self.store
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Declaration index of a module.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.store.module_position(name)
    }

    /// The module at a declaration index.
    pub fn module(&self, index: usize) -> &'s Module {
        self.store.module_at(index)
    }

    /// Direct dependencies, in declared order.
    pub fn dependencies(&self, index: usize) -> &[usize] {
        &self.deps[index]
    }

    /// Modules that directly require `index`, in declaration order.
    pub fn dependents(&self, index: usize) -> Vec<usize> {
        let mut dependents: Vec<usize> = self
            .graph
            .neighbors_directed(NodeIndex::new(index), Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        dependents.sort_unstable();
        dependents.dedup();
        dependents
    }

    /// Every module `index` transitively requires, excluding itself.
    pub fn requirements(&self, index: usize) -> BTreeSet<usize> {
        let mut requirements: BTreeSet<usize> = self.closure_order(index).into_iter().collect();
        requirements.remove(&index);
        requirements
    }

    /// Every module reachable from `roots`, roots included.
    pub fn reachable_from<I>(&self, roots: I) -> BTreeSet<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut reachable = BTreeSet::new();
        for root in roots {
            if reachable.contains(&root) {
                continue;
            }
            let mut dfs = Dfs::new(&self.graph, NodeIndex::new(root));
            while let Some(node) = dfs.next(&self.graph) {
                reachable.insert(self.graph[node]);
            }
        }
        reachable
    }

    /// The transitive closure of `index` in merge order.
    ///
    /// Dependencies are visited in declared order, recursively, each module
    /// exactly once; a module follows all of its dependencies and `index`
    /// itself comes last.
    pub fn closure_order(&self, index: usize) -> Vec<usize> {
        let mut visited = vec![false; self.deps.len()];
        let mut order = Vec::new();
        let mut stack = vec![(index, 0usize)];
        visited[index] = true;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if let Some(&dep) = self.deps[node].get(frame.1) {
                frame.1 += 1;
                if !visited[dep] {
                    visited[dep] = true;
                    stack.push((dep, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }

        order
    }
}

/// Three-color depth-first cycle search.
///
/// Roots are tried in declaration order and edges in declared order. Each
/// back-edge yields one cycle: the active path from the revisited node,
/// closed by the revisited node again. Runs in O(nodes + edges) plus the
/// length of the reported cycles.
fn find_cycles(deps: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; deps.len()];
    // Position of each in-progress node on the stack.
    let mut depth = vec![0usize; deps.len()];
    let mut cycles = Vec::new();

    for root in 0..deps.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }

        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::InProgress;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&dep) = deps[node].get(frame.1) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks[dep] {
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    depth[dep] = stack.len();
                    stack.push((dep, 0));
                }
                Mark::InProgress => {
                    let mut cycle: Vec<usize> =
                        stack[depth[dep]..].iter().map(|&(n, _)| n).collect();
                    cycle.push(dep);
                    cycles.push(cycle);
                }
                Mark::Done => {}
            }
        }
    }

    cycles
}

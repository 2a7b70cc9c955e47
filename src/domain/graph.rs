use crate::domain::edge::{EdgeKind, GraphEdge};
use crate::domain::node::{GraphNode, Role};
use crate::domain::type_registry::{Resolution, ScopeHint, TypeRegistry};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Fully-qualified class name, the stable key of every node.
pub type ClassId = String;

/// Default hop cap for upstream/downstream walks.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Dependency Graph - the core data structure
///
/// Nodes and edges are append-only; the graph is rebuilt from scratch rather than patched.
/// Adjacency comes from petgraph's per-node edge lists, so one-hop lookups never scan the
/// full edge set.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The directed graph of classified classes and typed edges
    pub graph: DiGraph<GraphNode, GraphEdge>,

    /// Mapping from fully-qualified name to node index
    pub class_to_node: HashMap<ClassId, NodeIndex>,

    /// Short-name index and interface map
    pub type_registry: TypeRegistry,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. A second registration of the same fully-qualified name replaces the
    /// payload in place and leaves the indexes untouched.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let full_name = node.full_name();
        if let Some(&idx) = self.class_to_node.get(&full_name) {
            self.graph[idx] = node;
            return idx;
        }
        self.type_registry.register(node.name(), &full_name);
        let idx = self.graph.add_node(node);
        self.class_to_node.insert(full_name, idx);
        idx
    }

    /// Adds an edge between two registered nodes. Self-edges and edges to unknown nodes are
    /// rejected; the return value says whether the edge was stored.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if edge.source == edge.target {
            debug!("Dropping self-edge {} on {}", edge.kind, edge.source);
            return false;
        }
        let (Some(&source), Some(&target)) = (
            self.class_to_node.get(&edge.source),
            self.class_to_node.get(&edge.target),
        ) else {
            debug!("Dropping edge {} -> {}: endpoint not in graph", edge.source, edge.target);
            return false;
        };
        self.graph.add_edge(source, target, edge);
        true
    }

    pub fn register_implementation(&mut self, interface: &str, implementation: &str) {
        self.type_registry
            .register_implementation(interface, implementation);
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: EdgeKind) -> bool {
        self.edges_from(source)
            .any(|e| e.target == target && e.kind == kind)
    }

    pub fn get_node_by_class(&self, full_name: &str) -> Option<NodeIndex> {
        self.class_to_node.get(full_name).copied()
    }

    pub fn node(&self, full_name: &str) -> Option<&GraphNode> {
        self.get_node_by_class(full_name).map(|idx| &self.graph[idx])
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.class_to_node.contains_key(full_name)
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn nodes_with_role(&self, role: Role) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(move |n| n.role == role)
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.graph.edge_weights()
    }

    pub fn edges_from<'a>(&'a self, full_name: &str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.adjacent_edges(full_name, Direction::Outgoing)
    }

    pub fn edges_to<'a>(&'a self, full_name: &str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.adjacent_edges(full_name, Direction::Incoming)
    }

    fn adjacent_edges<'a>(
        &'a self,
        full_name: &str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.get_node_by_class(full_name)
            .into_iter()
            .flat_map(move |idx| self.graph.edges_directed(idx, direction))
            .map(|e| e.weight())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ──────── Resolution ────────

    /// Every fully-qualified name sharing the generic-stripped short name.
    pub fn resolve_name(&self, short_name: &str) -> Resolution {
        self.type_registry.resolve(short_name)
    }

    /// `resolve_name` narrowed by a caller-supplied namespace preference.
    pub fn resolve_name_scoped(&self, short_name: &str, hint: &ScopeHint) -> Resolution {
        self.resolve_name(short_name).scoped(hint)
    }

    /// Implementation nodes of every interface the name resolves to.
    pub fn resolve_interface(&self, interface_name: &str) -> Vec<&GraphNode> {
        self.type_registry
            .implementations_of(interface_name)
            .iter()
            .filter_map(|full| self.node(full))
            .collect()
    }

    // ──────── Traversal ────────

    /// Classes with an edge pointing at `full_name` (one hop, deduplicated).
    pub fn get_dependents(&self, full_name: &str) -> Vec<&GraphNode> {
        self.one_hop(full_name, Direction::Incoming)
    }

    /// Classes `full_name` has an edge to (one hop, deduplicated).
    pub fn get_dependencies(&self, full_name: &str) -> Vec<&GraphNode> {
        self.one_hop(full_name, Direction::Outgoing)
    }

    fn one_hop(&self, full_name: &str, direction: Direction) -> Vec<&GraphNode> {
        let Some(idx) = self.get_node_by_class(full_name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.graph
            .neighbors_directed(idx, direction)
            .filter(|n| seen.insert(*n))
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Everything that transitively depends on `full_name`, up to `max_depth` hops.
    pub fn get_all_upstream(&self, full_name: &str, max_depth: usize) -> BTreeSet<ClassId> {
        self.walk(full_name, max_depth, Direction::Incoming)
    }

    /// Everything `full_name` transitively depends on, up to `max_depth` hops.
    pub fn get_all_downstream(&self, full_name: &str, max_depth: usize) -> BTreeSet<ClassId> {
        self.walk(full_name, max_depth, Direction::Outgoing)
    }

    /// Breadth-first walk over a FIFO of (node, depth). Nodes are marked on enqueue, so each is
    /// reached at its shortest hop distance and cycles terminate. The origin is excluded.
    fn walk(&self, full_name: &str, max_depth: usize, direction: Direction) -> BTreeSet<ClassId> {
        let Some(start) = self.get_node_by_class(full_name) else {
            return BTreeSet::new();
        };

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for neighbor in self.graph.neighbors_directed(current, direction) {
                if visited.insert(neighbor) {
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        visited.remove(&start);
        visited
            .into_iter()
            .map(|idx| self.graph[idx].full_name())
            .collect()
    }

    // ──────── Export ────────

    pub fn stats(&self) -> GraphStats {
        let mut roles = BTreeMap::new();
        let mut layers = BTreeMap::new();
        for node in self.nodes() {
            *roles.entry(node.role.as_str()).or_default() += 1;
            *layers.entry(node.layer.as_str()).or_default() += 1;
        }
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            short_names: self.type_registry.len(),
            roles,
            layers,
        }
    }

    pub fn export(&self) -> GraphExport<'_> {
        GraphExport {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
        }
    }
}

/// Node/edge counts plus role and layer histograms.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub short_names: usize,
    pub roles: BTreeMap<&'static str, usize>,
    pub layers: BTreeMap<&'static str, usize>,
}

/// Read-only view handed to document generators.
#[derive(Debug, Serialize)]
pub struct GraphExport<'a> {
    pub nodes: Vec<&'a GraphNode>,
    pub edges: Vec<&'a GraphEdge>,
}

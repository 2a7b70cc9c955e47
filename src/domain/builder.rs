use crate::domain::classifier::PatternClassifier;
use crate::domain::descriptor::{
    ClassDescriptor, CodebaseSnapshot, ProjectDescriptor, generic_argument, normalize_path,
    paths_match, strip_generic,
};
use crate::domain::edge::{EdgeKind, GraphEdge};
use crate::domain::graph::DependencyGraph;
use crate::domain::node::{GraphNode, Role};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Graph builder - Domain Service for constructing a DependencyGraph
///
/// Construction runs in five ordered passes:
/// 1. classify and register every class as a node
/// 2. build the interface map from declared interfaces
/// 3. structural edges (`injects`, `inherits`, `implements`)
/// 4. `handles` edges, naming convention first, generic argument second
/// 5. `sends` edges from endpoints to commands/queries
///
/// Classification is the only parallel pass; everything that touches the graph runs on the
/// calling thread.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    classifier: PatternClassifier,
    excluded_projects: Vec<glob::Pattern>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects whose name matches one of `patterns` never own a class. Invalid patterns are
    /// ignored.
    pub fn with_excluded_projects(mut self, patterns: &[String]) -> Self {
        self.excluded_projects = patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();
        self
    }

    pub fn build_snapshot(&self, snapshot: &CodebaseSnapshot) -> DependencyGraph {
        self.build(&snapshot.classes(), &snapshot.projects)
    }

    pub fn build(&self, classes: &[ClassDescriptor], projects: &[ProjectDescriptor]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        // Pass 1: classification (parallel) and node registration (sequential)
        let ownership = ProjectOwnership::new(projects, &self.excluded_projects);
        let nodes: Vec<GraphNode> = classes
            .par_iter()
            .map(|cls| {
                let project = ownership.owner_of(cls);
                let (role, layer) = self.classifier.classify(cls, project);
                let project_name = project.map(|p| p.name.as_str()).unwrap_or_default();
                GraphNode::new(cls.clone(), role, project_name, layer)
            })
            .collect();
        for node in nodes {
            graph.add_node(node);
        }

        // Pass 2: interface map
        let mut implementations = Vec::new();
        for node in graph.nodes() {
            for interface in &node.class.interfaces {
                for candidate in graph.resolve_name(interface).into_candidates() {
                    implementations.push((candidate, node.full_name()));
                }
            }
        }
        for (interface, implementation) in implementations {
            graph.register_implementation(&interface, &implementation);
        }

        // Pass 3: structural edges
        let structural = structural_edges(&graph);
        add_all(&mut graph, structural);

        // Pass 4: handles
        let handles = handles_edges(&graph);
        add_all(&mut graph, handles);

        // Pass 5: sends
        let sends = sends_edges(&graph);
        add_all(&mut graph, sends);

        info!(
            "Graph built: {} nodes, {} edges, {} short names",
            graph.node_count(),
            graph.edge_count(),
            graph.type_registry.len()
        );
        graph
    }
}

fn add_all(graph: &mut DependencyGraph, edges: Vec<GraphEdge>) {
    for edge in edges {
        graph.add_edge(edge);
    }
}

/// One edge per resolved candidate of `type_name`; unresolved names are a soft miss.
fn fan_out(
    graph: &DependencyGraph,
    source: &str,
    type_name: &str,
    kind: EdgeKind,
    label: String,
    edges: &mut Vec<GraphEdge>,
) {
    let resolution = graph.resolve_name(type_name);
    if resolution.is_miss() {
        debug!("Unresolved {} reference '{}' from {}", kind, type_name, source);
        return;
    }
    for target in resolution.into_candidates() {
        edges.push(GraphEdge::new(source, target, kind, label.clone()));
    }
}

fn structural_edges(graph: &DependencyGraph) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    for node in graph.nodes() {
        let source = node.full_name();
        let cls = &node.class;

        for param in cls.constructor_parameters() {
            let label = format!("constructor param: {}", param.name);
            fan_out(graph, &source, &param.type_name, EdgeKind::Injects, label, &mut edges);
        }
        for base in &cls.base_types {
            let label = format!("extends {base}");
            fan_out(graph, &source, base, EdgeKind::Inherits, label, &mut edges);
        }
        for interface in &cls.interfaces {
            let label = format!("implements {interface}");
            fan_out(graph, &source, interface, EdgeKind::Implements, label, &mut edges);
        }
    }
    edges
}

/// Fully-qualified names of command/query nodes sharing `short_name`.
fn message_targets(graph: &DependencyGraph, short_name: &str) -> Vec<String> {
    graph
        .resolve_name(short_name)
        .into_candidates()
        .into_iter()
        .filter(|full| graph.node(full).is_some_and(|n| n.role.is_message()))
        .collect()
}

fn handles_edges(graph: &DependencyGraph) -> Vec<GraphEdge> {
    let mut edges = Vec::new();
    for handler in graph.nodes_with_role(Role::Handler) {
        let source = handler.full_name();
        let mut recorded: BTreeSet<String> = BTreeSet::new();

        if let Some(base) = handler.name().strip_suffix("Handler") {
            for suffix in ["Command", "Query"] {
                let message = format!("{base}{suffix}");
                let targets = message_targets(graph, &message);
                if targets.is_empty() {
                    continue;
                }
                for target in targets {
                    recorded.insert(target.clone());
                    edges.push(GraphEdge::new(&source, target, EdgeKind::Handles, format!("handles {message}")));
                }
                break;
            }
        }
        if !recorded.is_empty() {
            continue;
        }

        for interface in &handler.class.interfaces {
            let Some(argument) = generic_argument(interface) else {
                continue;
            };
            for target in message_targets(graph, argument) {
                if recorded.insert(target.clone()) {
                    edges.push(GraphEdge::new(&source, target, EdgeKind::Handles, format!("handles {argument}")));
                }
            }
        }
    }
    edges
}

fn sends_edges(graph: &DependencyGraph) -> Vec<GraphEdge> {
    let messages: Vec<&GraphNode> = graph.nodes().filter(|n| n.role.is_message()).collect();
    let mut edges = Vec::new();

    for endpoint in graph.nodes_with_role(Role::Endpoint) {
        let source = endpoint.full_name();
        // identical endpoint -> message pairs are emitted once across both heuristics
        let mut sent: BTreeSet<String> = BTreeSet::new();

        for param in endpoint.class.constructor_parameters() {
            let stripped = strip_generic(&param.type_name);
            for target in message_targets(graph, stripped) {
                if sent.insert(target.clone()) {
                    edges.push(GraphEdge::new(&source, target, EdgeKind::Sends, format!("dispatches {stripped}")));
                }
            }
        }

        for base in &endpoint.class.base_types {
            let Some(argument) = generic_argument(base) else {
                continue;
            };
            let short = argument.rsplit('.').next().unwrap_or(argument);
            let prefix = short.strip_suffix("Request").unwrap_or(short);
            if prefix.is_empty() {
                continue;
            }
            for message in &messages {
                if !message.name().starts_with(prefix) {
                    continue;
                }
                let target = message.full_name();
                if sent.insert(target.clone()) {
                    let label = format!("dispatches {}", message.name());
                    edges.push(GraphEdge::new(&source, target, EdgeKind::Sends, label));
                }
            }
        }
    }
    edges
}

/// Resolves the owning project of a class: declared file set, then directory containment
/// (deepest directory wins), then namespace containing the project name.
struct ProjectOwnership<'a> {
    entries: Vec<OwnershipEntry<'a>>,
}

struct OwnershipEntry<'a> {
    project: &'a ProjectDescriptor,
    files: Vec<String>,
    directory: Option<String>,
    /// Project name lowercased with dots removed.
    name_key: String,
}

/// `Shop.Core.Tests` and `shopcoretests` compare equal.
fn namespace_key(name: &str) -> String {
    name.replace('.', "").to_lowercase()
}

impl<'a> ProjectOwnership<'a> {
    fn new(projects: &'a [ProjectDescriptor], excluded: &[glob::Pattern]) -> Self {
        let entries = projects
            .iter()
            .filter(|p| !excluded.iter().any(|pattern| pattern.matches(&p.name)))
            .map(|project| OwnershipEntry {
                project,
                files: project.source_files.iter().map(|f| normalize_path(f)).collect(),
                directory: project.directory(),
                name_key: namespace_key(&project.name),
            })
            .collect();
        Self { entries }
    }

    fn owner_of(&self, cls: &ClassDescriptor) -> Option<&'a ProjectDescriptor> {
        let file = normalize_path(&cls.file_path);

        if !file.is_empty() {
            if let Some(entry) = self
                .entries
                .iter()
                .find(|e| e.files.iter().any(|f| paths_match(f, &file)))
            {
                return Some(entry.project);
            }

            let contained = self
                .entries
                .iter()
                .filter_map(|e| e.directory.as_deref().map(|dir| (e, dir)))
                .filter(|(_, dir)| file.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/')))
                .max_by_key(|(_, dir)| dir.len());
            if let Some((entry, _)) = contained {
                return Some(entry.project);
            }
        }

        if cls.namespace.is_empty() {
            return None;
        }
        // the most specific project wins: `Shop.Core.Tests` over `Shop.Core`
        let namespace = namespace_key(&cls.namespace);
        self.entries
            .iter()
            .filter(|e| !e.name_key.is_empty() && namespace.contains(&e.name_key))
            .max_by_key(|e| e.name_key.len())
            .map(|e| e.project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{ConstructorDescriptor, ParameterDescriptor};
    use crate::domain::node::Layer;

    fn class(namespace: &str, name: &str) -> ClassDescriptor {
        ClassDescriptor::new(name, namespace, format!("src/{name}.cs"))
    }

    fn with_ctor(mut cls: ClassDescriptor, params: &[(&str, &str)]) -> ClassDescriptor {
        cls.constructors.push(ConstructorDescriptor::with_parameters(
            params
                .iter()
                .map(|(name, ty)| ParameterDescriptor::new(*name, *ty))
                .collect(),
        ));
        cls
    }

    #[test]
    fn test_structural_edges_fan_out_and_skip_externals() {
        let service = with_ctor(
            class("App", "Checkout"),
            &[("clock", "IClock"), ("logger", "ILogger<Checkout>")],
        );
        let a = class("Billing", "IClock");
        let b = class("Shipping", "IClock");
        let graph = GraphBuilder::new().build(&[service, a, b], &[]);

        let injects: Vec<_> = graph.edges_from("App.Checkout").collect();
        assert_eq!(injects.len(), 2);
        assert!(injects.iter().all(|e| e.kind == EdgeKind::Injects));
        assert!(injects.iter().all(|e| e.label == "constructor param: clock"));
    }

    #[test]
    fn test_interface_map_built_from_declared_interfaces() {
        let mut iface = class("Core", "IOrderRepository");
        iface.kind = crate::domain::descriptor::ClassKind::Interface;
        let mut repo = class("Data", "EfOrderRepository");
        repo.interfaces.push("IOrderRepository".into());
        let graph = GraphBuilder::new().build(&[iface, repo], &[]);

        let impls: Vec<_> = graph
            .resolve_interface("IOrderRepository")
            .iter()
            .map(|n| n.full_name())
            .collect();
        assert_eq!(impls, vec!["Data.EfOrderRepository"]);
        assert!(graph.has_edge("Data.EfOrderRepository", "Core.IOrderRepository", EdgeKind::Implements));
    }

    #[test]
    fn test_handler_convention_prefers_command() {
        let command = class("App", "ShipOrderCommand");
        let query = class("App", "ShipOrderQuery");
        let handler = class("App", "ShipOrderHandler");
        let graph = GraphBuilder::new().build(&[command, query, handler], &[]);

        let handles: Vec<_> = graph
            .edges_from("App.ShipOrderHandler")
            .filter(|e| e.kind == EdgeKind::Handles)
            .collect();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].target, "App.ShipOrderCommand");
    }

    #[test]
    fn test_handler_falls_back_to_generic_argument() {
        let query = class("App", "OrderListQuery");
        let mut handler = class("App", "ListOrdersService");
        handler.interfaces.push("IQueryHandler<OrderListQuery, OrderList>".into());
        let graph = GraphBuilder::new().build(&[query, handler], &[]);

        assert!(graph.has_edge("App.ListOrdersService", "App.OrderListQuery", EdgeKind::Handles));
    }

    #[test]
    fn test_sends_from_request_typed_base() {
        let command = class("App", "CreateOrderCommand");
        let mut endpoint = class("Web", "Create");
        endpoint.base_types.push("Endpoint<CreateOrderRequest, OrderResponse>".into());
        let graph = GraphBuilder::new().build(&[command, endpoint], &[]);

        let sends: Vec<_> = graph
            .edges_from("Web.Create")
            .filter(|e| e.kind == EdgeKind::Sends)
            .collect();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].label, "dispatches CreateOrderCommand");
    }

    #[test]
    fn test_sends_skips_bare_request_argument() {
        let command = class("App", "CreateOrderCommand");
        let mut endpoint = class("Web", "Create");
        endpoint.base_types.push("Endpoint<Request>".into());
        let graph = GraphBuilder::new().build(&[command, endpoint], &[]);
        assert_eq!(graph.edges_from("Web.Create").filter(|e| e.kind == EdgeKind::Sends).count(), 0);
    }

    #[test]
    fn test_project_ownership_priority() {
        let mut web = ProjectDescriptor::new("Shop.Web", "src/Shop.Web/Shop.Web.csproj");
        web.source_files.push("shared/Listed.cs".into());
        let core = ProjectDescriptor::new("Shop.Core", "src/Shop.Core/Shop.Core.csproj");

        let listed = ClassDescriptor::new("Listed", "Anything", "shared/Listed.cs");
        let contained = ClassDescriptor::new("Order", "X", "src/Shop.Core/Orders/Order.cs");
        let by_namespace = ClassDescriptor::new("Clock", "Shop.Core.Time", "elsewhere/Clock.cs");
        let orphan = ClassDescriptor::new("Orphan", "Other", "elsewhere/Orphan.cs");

        let graph = GraphBuilder::new().build(&[listed, contained, by_namespace, orphan], &[web, core]);
        assert_eq!(graph.node("Anything.Listed").map(|n| n.project.as_str()), Some("Shop.Web"));
        assert_eq!(graph.node("X.Order").map(|n| n.project.as_str()), Some("Shop.Core"));
        assert_eq!(graph.node("Shop.Core.Time.Clock").map(|n| n.project.as_str()), Some("Shop.Core"));
        assert_eq!(graph.node("Other.Orphan").map(|n| n.project.as_str()), Some(""));
        assert_eq!(graph.node("X.Order").map(|n| n.layer), Some(Layer::Core));
    }

    #[test]
    fn test_namespace_fallback_prefers_most_specific_project() {
        let core = ProjectDescriptor::new("Shop.Core", "src/Shop.Core/Shop.Core.csproj");
        let tests = ProjectDescriptor::new("Shop.Core.Tests", "test/Shop.Core.Tests/Shop.Core.Tests.csproj");

        let cls = ClassDescriptor::new("OrderTests", "Shop.Core.Tests.Orders", "elsewhere/OrderTests.cs");
        let graph = GraphBuilder::new().build(&[cls], &[core, tests]);

        let node = graph.node("Shop.Core.Tests.Orders.OrderTests").unwrap();
        assert_eq!(node.project, "Shop.Core.Tests");
        assert_eq!(node.layer, Layer::Test);
    }

    #[test]
    fn test_namespace_fallback_ignores_case_and_dots() {
        let infra = ProjectDescriptor::new("Shop.Infrastructure", "src/Shop.Infrastructure/Shop.Infrastructure.csproj");

        let lowercase = ClassDescriptor::new("Db", "shop.infrastructure.data", "elsewhere/Db.cs");
        let undotted = ClassDescriptor::new("Cache", "ShopInfrastructure.Caching", "elsewhere/Cache.cs");
        let graph = GraphBuilder::new().build(&[lowercase, undotted], &[infra]);

        assert_eq!(
            graph.node("shop.infrastructure.data.Db").map(|n| n.project.as_str()),
            Some("Shop.Infrastructure")
        );
        assert_eq!(
            graph.node("ShopInfrastructure.Caching.Cache").map(|n| n.project.as_str()),
            Some("Shop.Infrastructure")
        );
    }

    #[test]
    fn test_excluded_project_never_owns() {
        let legacy = ProjectDescriptor::new("Shop.Legacy", "legacy/Shop.Legacy.csproj");
        let cls = ClassDescriptor::new("Old", "Shop.Legacy", "legacy/Old.cs");
        let graph = GraphBuilder::new()
            .with_excluded_projects(&["*.Legacy".to_string()])
            .build(&[cls], &[legacy]);
        assert_eq!(graph.node("Shop.Legacy.Old").map(|n| n.project.as_str()), Some(""));
    }
}

//! Flow Reconstructor - end-to-end request flows over a built DependencyGraph
//!
//! One flow per command/query node, assembled as
//! endpoint → message → handler → repository → entity, with validators, pipeline behaviors and
//! event-raising methods recorded beside the steps rather than as steps.

use crate::domain::classifier::message_base_name;
use crate::domain::descriptor::{generic_argument, strip_generic};
use crate::domain::edge::EdgeKind;
use crate::domain::graph::DependencyGraph;
use crate::domain::node::{GraphNode, Layer, Role};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::info;

static LOWER_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid word-boundary regex"));
static ACRONYM_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid acronym regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("valid quoted-literal regex"));

/// HTTP-like verb inferred for a flow's entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Queries are always GET; commands are read off the first word of the display name.
    pub fn infer(display_name: &str, role: Role) -> Self {
        if role == Role::Query {
            return HttpMethod::Get;
        }
        let lower = display_name.to_lowercase();
        let starts = |verbs: &[&str]| verbs.iter().any(|v| lower.starts_with(v));
        if starts(&["create", "add", "register"]) {
            HttpMethod::Post
        } else if starts(&["update", "edit", "modify"]) {
            HttpMethod::Put
        } else if starts(&["delete", "remove"]) {
            HttpMethod::Delete
        } else if starts(&["list", "get", "find"]) {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One hop of a request flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowStep {
    /// Fully-qualified class name, or the declared type text when unresolved.
    pub class_name: String,
    pub role: Role,
    pub action: String,
    pub file_path: String,
    pub project: String,
    pub layer: Layer,
}

impl FlowStep {
    fn from_node(node: &GraphNode, role: Role, action: impl Into<String>) -> Self {
        Self {
            class_name: node.full_name(),
            role,
            action: action.into(),
            file_path: node.file_path().to_string(),
            project: node.project.clone(),
            layer: node.layer,
        }
    }
}

/// A reconstructed use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestFlow {
    /// Display name, e.g. `Create Order`.
    pub name: String,
    /// `<METHOD> <route>`.
    pub entry_point: String,
    pub http_method: HttpMethod,
    pub route: String,
    pub steps: Vec<FlowStep>,
    /// Short name of the originating command or query.
    pub command_or_query: String,
    /// Short name of the target aggregate entity, when one was found.
    pub aggregate: Option<String>,
    pub side_effects: Vec<String>,
    pub cross_cutting: Vec<String>,
}

impl RequestFlow {
    /// Lowercase name with spaces replaced by `-`.
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }

    /// Generated document for this flow.
    pub fn output_id(&self) -> String {
        format!("flows/{}.md", self.slug())
    }

    pub fn step_classes(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.class_name.as_str())
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &FlowStep> {
        self.steps.iter().filter(|s| s.role == Role::Endpoint)
    }
}

/// `CreateOrderCommand` → `Create Order`, `GetHTTPStatusQuery` → `Get HTTP Status`.
pub fn display_name(message_name: &str) -> String {
    let base = message_base_name(message_name);
    let words = LOWER_UPPER.replace_all(base, "$1 $2");
    let words = ACRONYM_WORD.replace_all(&words, "$1 $2");
    words.trim().to_string()
}

/// Last word pluralized under `/api/`, or `/api/unknown` for single-word names.
pub fn fallback_route(display_name: &str) -> String {
    let words: Vec<&str> = display_name.split_whitespace().collect();
    match words.as_slice() {
        [_, .., last] => {
            if last.ends_with('s') {
                format!("/api/{last}")
            } else {
                format!("/api/{last}s")
            }
        }
        _ => "/api/unknown".to_string(),
    }
}

/// Quoted route literal from the first `Route`/`Http*` annotation carrying one.
fn annotated_route(endpoint: &GraphNode) -> Option<String> {
    endpoint
        .class
        .attributes
        .iter()
        .filter(|a| a.contains("Route") || a.contains("Http"))
        .find_map(|a| QUOTED.captures(a).map(|caps| caps[1].to_string()))
        .filter(|route| !route.is_empty())
}

pub struct FlowReconstructor<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> FlowReconstructor<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    pub fn reconstruct(&self) -> Vec<RequestFlow> {
        let mut handler_of: HashMap<&str, &str> = HashMap::new();
        let mut endpoint_of: HashMap<&str, &str> = HashMap::new();
        for edge in self.graph.edges() {
            match edge.kind {
                EdgeKind::Handles => {
                    handler_of.entry(&edge.target).or_insert(&edge.source);
                }
                EdgeKind::Sends => {
                    endpoint_of.entry(&edge.target).or_insert(&edge.source);
                }
                _ => {}
            }
        }

        let mut flows: Vec<RequestFlow> = self
            .graph
            .nodes()
            .filter(|n| n.role.is_message())
            .map(|message| {
                let full = message.full_name();
                let endpoint = endpoint_of.get(full.as_str()).and_then(|e| self.graph.node(e));
                let handler = handler_of.get(full.as_str()).and_then(|h| self.graph.node(h));
                self.flow_for(message, endpoint, handler)
            })
            .collect();

        self.attach_validators(&mut flows);
        info!("Reconstructed {} request flows", flows.len());
        flows
    }

    fn flow_for(
        &self,
        message: &GraphNode,
        endpoint: Option<&GraphNode>,
        handler: Option<&GraphNode>,
    ) -> RequestFlow {
        let name = display_name(message.name());
        let method = HttpMethod::infer(&name, message.role);
        let route = endpoint
            .and_then(annotated_route)
            .unwrap_or_else(|| fallback_route(&name));

        let mut flow = RequestFlow {
            entry_point: format!("{method} {route}"),
            name,
            http_method: method,
            route,
            steps: Vec::new(),
            command_or_query: message.name().to_string(),
            aggregate: None,
            side_effects: Vec::new(),
            cross_cutting: Vec::new(),
        };

        if let Some(endpoint) = endpoint {
            flow.steps.push(FlowStep::from_node(
                endpoint,
                Role::Endpoint,
                format!("receives HTTP {method}"),
            ));
        }
        flow.steps.push(FlowStep::from_node(
            message,
            message.role,
            format!("CQRS {} message", message.role),
        ));

        if let Some(handler) = handler {
            flow.steps.push(FlowStep::from_node(
                handler,
                Role::Handler,
                format!("handles {}", message.role),
            ));
            self.follow_dependencies(handler, &mut flow);

            for method in &handler.class.methods {
                let lower = method.name.to_lowercase();
                if ["event", "notify", "publish"].iter().any(|k| lower.contains(k)) {
                    flow.side_effects.push(format!("Raises event via {}()", method.name));
                }
            }
        }

        flow
    }

    /// Repository steps (plus their entity) and cross-cutting concerns from the handler's
    /// constructor parameters.
    fn follow_dependencies(&self, handler: &GraphNode, flow: &mut RequestFlow) {
        for param in handler.class.constructor_parameters() {
            let stripped = strip_generic(&param.type_name).to_lowercase();

            if stripped.contains("repository") {
                flow.steps.push(self.repository_step(&param.type_name));

                let entity = generic_argument(&param.type_name).and_then(|arg| {
                    self.graph
                        .resolve_name(arg)
                        .into_candidates()
                        .into_iter()
                        .filter_map(|full| self.graph.node(&full))
                        .find(|n| matches!(n.role, Role::Entity | Role::Other))
                });
                if let Some(entity) = entity {
                    if flow.aggregate.is_none() {
                        flow.aggregate = Some(entity.name().to_string());
                    }
                    flow.steps.push(FlowStep::from_node(entity, Role::Entity, "domain entity"));
                }
            } else if stripped.contains("mediator") || stripped.contains("logger") {
                continue;
            } else if stripped.contains("validator") {
                flow.cross_cutting.push(format!("Validator: {}", param.type_name));
            } else if stripped.contains("behavior") || stripped.contains("pipeline") {
                flow.cross_cutting.push(format!("Pipeline: {}", param.type_name));
            }
        }
    }

    /// First implementation of the declared type, else the type itself when it is a node,
    /// else the declared text with no provenance.
    fn repository_step(&self, declared: &str) -> FlowStep {
        let action = "persists/retrieves data";
        let resolved = self
            .graph
            .resolve_interface(declared)
            .into_iter()
            .next()
            .or_else(|| {
                self.graph
                    .resolve_name(declared)
                    .candidates()
                    .first()
                    .and_then(|full| self.graph.node(full))
            });
        match resolved {
            Some(node) => FlowStep::from_node(node, Role::Repository, action),
            None => FlowStep {
                class_name: declared.to_string(),
                role: Role::Repository,
                action: action.to_string(),
                file_path: String::new(),
                project: String::new(),
                layer: Layer::Infrastructure,
            },
        }
    }

    /// `<Base>Validator` classes attach to every flow whose message base name is `<Base>`.
    fn attach_validators(&self, flows: &mut [RequestFlow]) {
        for node in self.graph.nodes() {
            let Some(base) = node.name().strip_suffix("Validator") else {
                continue;
            };
            if base.is_empty() {
                continue;
            }
            for flow in flows.iter_mut() {
                if message_base_name(&flow.command_or_query) == base {
                    flow.cross_cutting
                        .push(format!("FluentValidation: {}", node.name()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_splits_pascal_case() {
        assert_eq!(display_name("CreateContributorCommand"), "Create Contributor");
        assert_eq!(display_name("GetContributorByIdQuery"), "Get Contributor By Id");
        assert_eq!(display_name("GetHTTPStatusQuery"), "Get HTTP Status");
        assert_eq!(display_name("Ping"), "Ping");
    }

    #[test]
    fn test_http_method_table() {
        assert_eq!(HttpMethod::infer("Create Order", Role::Command), HttpMethod::Post);
        assert_eq!(HttpMethod::infer("Edit Order", Role::Command), HttpMethod::Put);
        assert_eq!(HttpMethod::infer("Remove Line", Role::Command), HttpMethod::Delete);
        assert_eq!(HttpMethod::infer("Find Orders", Role::Command), HttpMethod::Get);
        assert_eq!(HttpMethod::infer("Archive Order", Role::Command), HttpMethod::Post);
        assert_eq!(HttpMethod::infer("Create Order", Role::Query), HttpMethod::Get);
    }

    #[test]
    fn test_fallback_route() {
        assert_eq!(fallback_route("Create Order"), "/api/Orders");
        assert_eq!(fallback_route("List Contributors"), "/api/Contributors");
        assert_eq!(fallback_route("Ping"), "/api/unknown");
    }

    #[test]
    fn test_slug() {
        let flow = RequestFlow {
            name: "Get Contributor By Id".into(),
            entry_point: "GET /api/Ids".into(),
            http_method: HttpMethod::Get,
            route: "/api/Ids".into(),
            steps: Vec::new(),
            command_or_query: "GetContributorByIdQuery".into(),
            aggregate: None,
            side_effects: Vec::new(),
            cross_cutting: Vec::new(),
        };
        assert_eq!(flow.slug(), "get-contributor-by-id");
        assert_eq!(flow.output_id(), "flows/get-contributor-by-id.md");
    }
}

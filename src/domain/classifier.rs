//! Pattern classifier - assigns an architectural role and layer to each class descriptor.
//!
//! Role detection is an ordered table of independent predicates evaluated top-to-bottom; the
//! first match wins. Several predicates can match the same class (a `FooHandler` implementing
//! `INotificationHandler<T>` is both a handler and an event handler), so the table order is the
//! priority contract. Layer detection looks at the owning project first and falls back to role.

use crate::domain::descriptor::{ClassDescriptor, ClassKind, ProjectDescriptor, strip_generic};
use crate::domain::node::{Layer, Role};
use serde::Serialize;

/// One entry of the role priority table.
pub struct RoleRule {
    pub role: Role,
    pub matches: fn(&ClassDescriptor) -> bool,
}

/// Role predicates in priority order. `Role::Other` is the implicit fallback.
pub const ROLE_RULES: &[RoleRule] = &[
    RoleRule { role: Role::Endpoint, matches: is_endpoint },
    RoleRule { role: Role::Command, matches: is_command },
    RoleRule { role: Role::Query, matches: is_query },
    RoleRule { role: Role::Handler, matches: is_handler },
    RoleRule { role: Role::Repository, matches: is_repository },
    RoleRule { role: Role::Entity, matches: is_aggregate_root },
    RoleRule { role: Role::Config, matches: is_entity_configuration },
    RoleRule { role: Role::Dto, matches: is_dto },
    RoleRule { role: Role::Specification, matches: is_specification },
    RoleRule { role: Role::ValueObject, matches: is_value_object },
    RoleRule { role: Role::DomainEvent, matches: is_domain_event },
    RoleRule { role: Role::EventHandler, matches: is_event_handler },
    RoleRule { role: Role::Interface, matches: is_interface },
];

/// Project-name keywords per layer, checked in this order against the lowercased name.
const LAYER_KEYWORDS: &[(Layer, &[&str])] = &[
    (Layer::Test, &["test", "spec"]),
    (Layer::Web, &["web", "api", "host", "server"]),
    (Layer::Infrastructure, &["infrastructure", "infra", "data", "persistence"]),
    (Layer::Application, &["usecase", "application"]),
    (Layer::Core, &["core", "domain", "shared", "kernel"]),
];

const DTO_SUFFIXES: &[&str] = &["DTO", "Dto", "Request", "Response", "Model"];

// -----------------------------------------------------------------------------
// Predicates
// -----------------------------------------------------------------------------

fn has_attribute(cls: &ClassDescriptor, name: &str) -> bool {
    cls.attributes
        .iter()
        .any(|a| a.trim_matches(|c| c == '[' || c == ']') == name)
}

pub fn is_endpoint(cls: &ClassDescriptor) -> bool {
    cls.base_types
        .iter()
        .any(|b| b.contains("Endpoint") || b.contains("Controller"))
        || has_attribute(cls, "ApiController")
        || (cls.kind != ClassKind::Interface && cls.name.ends_with("Endpoint"))
}

pub fn is_command(cls: &ClassDescriptor) -> bool {
    cls.name.ends_with("Command")
        || cls.interfaces.iter().any(|i| {
            (i.contains("ICommand") && !i.contains("Handler"))
                || (i.contains("IRequest") && cls.name.contains("Command"))
        })
}

pub fn is_query(cls: &ClassDescriptor) -> bool {
    cls.name.ends_with("Query")
        || cls.interfaces.iter().any(|i| {
            (i.contains("IQuery") && !i.contains("Handler"))
                || (i.contains("IRequest") && cls.name.contains("Query"))
        })
}

pub fn is_handler(cls: &ClassDescriptor) -> bool {
    cls.name.ends_with("Handler")
        || cls.interfaces.iter().any(|i| {
            i.contains("Handler")
                && (i.contains("Command") || i.contains("Query") || i.contains("Request"))
        })
}

pub fn is_repository(cls: &ClassDescriptor) -> bool {
    cls.interfaces.iter().any(|i| i.contains("IRepository"))
        || cls.base_types.iter().any(|b| b.contains("Repository"))
        || cls.name.contains("Repository")
}

pub fn is_aggregate_root(cls: &ClassDescriptor) -> bool {
    cls.interfaces
        .iter()
        .any(|i| strip_generic(i) == "IAggregateRoot")
        || cls.attributes.iter().any(|a| a.contains("AggregateRoot"))
}

pub fn is_entity_configuration(cls: &ClassDescriptor) -> bool {
    cls.interfaces
        .iter()
        .any(|i| i.contains("IEntityTypeConfiguration"))
}

pub fn is_dto(cls: &ClassDescriptor) -> bool {
    (cls.kind == ClassKind::Record && cls.methods.is_empty() && !cls.properties.is_empty())
        || DTO_SUFFIXES.iter().any(|s| cls.name.ends_with(s))
}

pub fn is_specification(cls: &ClassDescriptor) -> bool {
    cls.name.ends_with("Spec")
        || cls.name.ends_with("Specification")
        || cls.base_types.iter().any(|b| b.contains("Specification"))
}

pub fn is_value_object(cls: &ClassDescriptor) -> bool {
    cls.attributes
        .iter()
        .any(|a| a.contains("ValueObject") || a.contains("Vogen"))
        || cls.base_types.iter().any(|b| b.contains("ValueObject"))
        || (cls.kind == ClassKind::Record && cls.methods.is_empty())
}

pub fn is_domain_event(cls: &ClassDescriptor) -> bool {
    cls.name.ends_with("Event")
        || cls
            .interfaces
            .iter()
            .chain(cls.base_types.iter())
            .any(|t| t.to_lowercase().contains("event"))
}

pub fn is_event_handler(cls: &ClassDescriptor) -> bool {
    cls.interfaces
        .iter()
        .any(|i| i.contains("NotificationHandler") || i.contains("EventHandler"))
}

pub fn is_interface(cls: &ClassDescriptor) -> bool {
    cls.kind == ClassKind::Interface
}

// -----------------------------------------------------------------------------
// Aggregates and use cases
// -----------------------------------------------------------------------------

/// A DDD aggregate: a root entity plus the related classes in its namespace subtree.
#[derive(Debug, Clone, Serialize)]
pub struct DomainAggregate {
    pub root: ClassDescriptor,
    pub value_objects: Vec<ClassDescriptor>,
    pub domain_events: Vec<ClassDescriptor>,
    pub specifications: Vec<ClassDescriptor>,
    pub event_handlers: Vec<ClassDescriptor>,
}

/// A command or query paired with its conventionally named handler.
#[derive(Debug, Clone, Serialize)]
pub struct UseCase {
    pub message: ClassDescriptor,
    pub handler: ClassDescriptor,
    /// `Role::Command` or `Role::Query`.
    pub pattern: Role,
    /// Declared constructor parameter types of the handler.
    pub dependencies: Vec<String>,
}

/// Strips a trailing `Command` or `Query`.
pub fn message_base_name(name: &str) -> &str {
    name.strip_suffix("Command")
        .or_else(|| name.strip_suffix("Query"))
        .unwrap_or(name)
}

fn in_namespace_subtree(namespace: &str, root: &str) -> bool {
    root.is_empty()
        || namespace == root
        || namespace
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Stateless classifier service.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternClassifier;

impl PatternClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Role of the first matching rule in `ROLE_RULES`, or `Role::Other`.
    pub fn role(&self, cls: &ClassDescriptor) -> Role {
        ROLE_RULES
            .iter()
            .find(|rule| (rule.matches)(cls))
            .map(|rule| rule.role)
            .unwrap_or(Role::Other)
    }

    /// Layer from the project's name keywords, then its declared packages, then the role.
    pub fn layer(&self, role: Role, project: Option<&ProjectDescriptor>) -> Layer {
        if let Some(project) = project {
            let name = project.name.to_lowercase();
            for (layer, keywords) in LAYER_KEYWORDS {
                if keywords.iter().any(|k| name.contains(k)) {
                    return *layer;
                }
            }
            if project.is_test_project() {
                return Layer::Test;
            }
            if project.is_web_project() {
                return Layer::Web;
            }
        }
        match role {
            Role::Endpoint => Layer::Web,
            Role::Handler | Role::Command | Role::Query => Layer::Application,
            Role::Entity | Role::DomainEvent => Layer::Core,
            Role::Repository | Role::Config => Layer::Infrastructure,
            _ => Layer::Other,
        }
    }

    /// Pure classification of one descriptor.
    pub fn classify(
        &self,
        cls: &ClassDescriptor,
        project: Option<&ProjectDescriptor>,
    ) -> (Role, Layer) {
        let role = self.role(cls);
        (role, self.layer(role, project))
    }

    /// Groups the classes under `root`'s namespace (or nested namespaces) by pattern.
    pub fn find_aggregate(&self, classes: &[ClassDescriptor], root: &ClassDescriptor) -> DomainAggregate {
        let root_full = root.full_name();
        let mut aggregate = DomainAggregate {
            root: root.clone(),
            value_objects: Vec::new(),
            domain_events: Vec::new(),
            specifications: Vec::new(),
            event_handlers: Vec::new(),
        };

        for cls in classes {
            if !in_namespace_subtree(&cls.namespace, &root.namespace) || cls.full_name() == root_full {
                continue;
            }
            if is_value_object(cls) {
                aggregate.value_objects.push(cls.clone());
            } else if is_domain_event(cls) {
                aggregate.domain_events.push(cls.clone());
            } else if is_specification(cls) {
                aggregate.specifications.push(cls.clone());
            } else if is_event_handler(cls) {
                aggregate.event_handlers.push(cls.clone());
            }
        }

        aggregate
    }

    /// One aggregate per aggregate-root class.
    pub fn find_aggregates(&self, classes: &[ClassDescriptor]) -> Vec<DomainAggregate> {
        classes
            .iter()
            .filter(|cls| is_aggregate_root(cls))
            .map(|root| self.find_aggregate(classes, root))
            .collect()
    }

    /// Pairs `<Base>Command` / `<Base>Query` with a handler class named exactly `<Base>Handler`.
    pub fn find_use_case(&self, classes: &[ClassDescriptor], message: &ClassDescriptor) -> Option<UseCase> {
        let pattern = if is_command(message) {
            Role::Command
        } else if is_query(message) {
            Role::Query
        } else {
            return None;
        };
        let expected = format!("{}Handler", message_base_name(&message.name));

        classes
            .iter()
            .find(|cls| cls.name == expected && is_handler(cls))
            .map(|handler| UseCase {
                message: message.clone(),
                handler: handler.clone(),
                pattern,
                dependencies: handler
                    .constructor_parameters()
                    .map(|p| p.type_name.clone())
                    .collect(),
            })
    }

    pub fn find_use_cases(&self, classes: &[ClassDescriptor]) -> Vec<UseCase> {
        classes
            .iter()
            .filter(|cls| is_command(cls) || is_query(cls))
            .filter_map(|cls| self.find_use_case(classes, cls))
            .collect()
    }
}

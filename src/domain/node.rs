use crate::domain::descriptor::ClassDescriptor;
use serde::{Deserialize, Serialize};

/// Architectural role inferred from a descriptor's shape and naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Endpoint,
    Command,
    Query,
    Handler,
    Repository,
    /// Aggregate root.
    Entity,
    /// EF-style entity mapping.
    Config,
    Dto,
    Specification,
    ValueObject,
    DomainEvent,
    EventHandler,
    Interface,
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Endpoint => "endpoint",
            Role::Command => "command",
            Role::Query => "query",
            Role::Handler => "handler",
            Role::Repository => "repository",
            Role::Entity => "entity",
            Role::Config => "config",
            Role::Dto => "dto",
            Role::Specification => "specification",
            Role::ValueObject => "value_object",
            Role::DomainEvent => "domain_event",
            Role::EventHandler => "event_handler",
            Role::Interface => "interface",
            Role::Other => "other",
        }
    }

    /// Command or query: a CQRS message.
    pub fn is_message(&self) -> bool {
        matches!(self, Role::Command | Role::Query)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse architectural bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Web,
    Application,
    Core,
    Infrastructure,
    Test,
    Other,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Web => "Web",
            Layer::Application => "Application",
            Layer::Core => "Core",
            Layer::Infrastructure => "Infrastructure",
            Layer::Test => "Test",
            Layer::Other => "Other",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified class in the dependency graph. Built once per graph construction and never
/// mutated; a rebuild replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub class: ClassDescriptor,
    pub role: Role,
    /// Owning project name; empty when no project claims the class.
    pub project: String,
    pub layer: Layer,
}

impl GraphNode {
    pub fn new(class: ClassDescriptor, role: Role, project: impl Into<String>, layer: Layer) -> Self {
        Self {
            class,
            role,
            project: project.into(),
            layer,
        }
    }

    pub fn full_name(&self) -> String {
        self.class.full_name()
    }

    pub fn name(&self) -> &str {
        &self.class.name
    }

    pub fn file_path(&self) -> &str {
        &self.class.file_path
    }
}

use serde::{Deserialize, Serialize};

/// Edge kind - the relationship a source class has with a target class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    // ============ Structural ============
    Injects,    // Class → constructor parameter type
    Inherits,   // Class → base type
    Implements, // Class → interface

    // ============ CQRS wiring ============
    Handles, // Handler → Command/Query
    Sends,   // Endpoint → Command/Query
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Injects => "injects",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Implements => "implements",
            EdgeKind::Handles => "handles",
            EdgeKind::Sends => "sends",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directed edge between two fully-qualified class names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    /// Human-readable label, e.g. `constructor param: repository`.
    pub label: String,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            label: label.into(),
        }
    }
}

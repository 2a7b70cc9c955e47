use crate::domain::graph::GraphStats;
use crate::domain::impact::{ImpactReport, RiskLevel};
use crate::domain::node::{Layer, Role};
use crate::domain::state::ChangeSet;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub name: String,
    pub entry_point: String,
    pub step_count: usize,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UseCaseSummary {
    pub message: String,
    pub handler: String,
    /// `command` or `query`.
    pub pattern: Role,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateSummary {
    pub root: String,
    pub value_objects: usize,
    pub domain_events: usize,
    pub specifications: usize,
    pub event_handlers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub solution: String,
    pub project_count: usize,
    pub graph: GraphStats,
    pub flows: Vec<FlowSummary>,
    pub aggregates: Vec<AggregateSummary>,
    pub use_cases: Vec<UseCaseSummary>,
    pub tracked_files: usize,
    pub unparsed_files: usize,
    /// Output identifiers whose provenance was recorded.
    pub outputs: Vec<String>,
    pub state_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateResponse {
    /// No usable prior state; a full scan ran instead.
    FullScan(ScanResponse),
    UpToDate { tracked_files: usize },
    Updated {
        changes: ChangeSet,
        risk_level: RiskLevel,
        total_impact_count: usize,
        /// Outputs that need regenerating.
        stale_outputs: Vec<String>,
        impact: ImpactReport,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactResponse {
    pub risk_level: RiskLevel,
    pub total_impact_count: usize,
    #[serde(flatten)]
    pub report: ImpactReport,
}

impl From<ImpactReport> for ImpactResponse {
    fn from(report: ImpactReport) -> Self {
        Self {
            risk_level: report.risk_level(),
            total_impact_count: report.total_impact_count(),
            report,
        }
    }
}

/// One class with its neighborhood.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub role: Role,
    pub layer: Layer,
    pub project: String,
    pub file_path: String,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
    pub upstream: Vec<String>,
    pub downstream: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectResponse {
    pub query: String,
    pub matches: Vec<ClassReport>,
}

//! Impact Analyzer - blast radius of a set of changed files
//!
//! Changed files map to changed classes by path. From there:
//! - **direct**: one-hop dependents of a changed class
//! - **indirect**: upstream nodes with a dependency on a direct item
//! - **transitive**: everything else upstream, within the hop cap
//!
//! Flows, endpoints, generated documents and tests are then propagated from the class sets.
//! Risk is a function of the affected-flow count alone.

use crate::domain::descriptor::paths_match;
use crate::domain::flow::RequestFlow;
use crate::domain::graph::{ClassId, DependencyGraph};
use crate::domain::node::{GraphNode, Layer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Default hop cap for upstream impact traversal.
pub const DEFAULT_IMPACT_DEPTH: usize = 5;

/// Generated summary document, affected whenever any flow is.
pub const SUMMARY_OUTPUT: &str = "SUMMARY.md";

/// Impact tier. Ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Direct,
    Indirect,
    Transitive,
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Direct => "direct",
            ImpactLevel::Indirect => "indirect",
            ImpactLevel::Transitive => "transitive",
        }
    }
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Class,
    Flow,
    KbDoc,
    Test,
    Endpoint,
}

/// Risk tier derived from the number of affected flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// 0 → low, 1-2 → medium, 3-4 → high, 5+ → critical.
    pub fn from_flow_count(count: usize) -> Self {
        match count {
            0 => RiskLevel::Low,
            1..=2 => RiskLevel::Medium,
            3..=4 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactedItem {
    pub name: String,
    pub kind: ItemKind,
    pub level: ImpactLevel,
    pub reason: String,
    /// Declaring file, or the output path for flows and documents.
    pub file_path: String,
}

impl ImpactedItem {
    fn new(
        name: impl Into<String>,
        kind: ItemKind,
        level: ImpactLevel,
        reason: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            level,
            reason: reason.into(),
            file_path: file_path.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub changed_files: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Fully-qualified names of the classes declared in the changed files.
    pub changed_classes: Vec<ClassId>,
    pub affected_classes: Vec<ImpactedItem>,
    pub affected_flows: Vec<ImpactedItem>,
    pub affected_kb_docs: Vec<ImpactedItem>,
    pub affected_tests: Vec<ImpactedItem>,
    pub affected_endpoints: Vec<ImpactedItem>,
}

impl ImpactReport {
    fn empty(changed_files: &[String]) -> Self {
        Self {
            changed_files: changed_files.to_vec(),
            timestamp: Utc::now(),
            changed_classes: Vec::new(),
            affected_classes: Vec::new(),
            affected_flows: Vec::new(),
            affected_kb_docs: Vec::new(),
            affected_tests: Vec::new(),
            affected_endpoints: Vec::new(),
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_flow_count(self.affected_flows.len())
    }

    pub fn total_impact_count(&self) -> usize {
        self.affected_classes.len()
            + self.affected_flows.len()
            + self.affected_kb_docs.len()
            + self.affected_tests.len()
            + self.affected_endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_impact_count() == 0
    }
}

/// Class sets computed by the tier pass.
#[derive(Debug, Default)]
struct Tiers {
    changed: BTreeSet<ClassId>,
    direct: BTreeSet<ClassId>,
    indirect: BTreeSet<ClassId>,
    transitive: BTreeSet<ClassId>,
}

impl Tiers {
    /// Strongest tier among `classes`, with changed classes counting as direct.
    fn strongest<'c>(&self, classes: impl IntoIterator<Item = &'c str>) -> Option<ImpactLevel> {
        classes
            .into_iter()
            .filter_map(|c| {
                if self.changed.contains(c) || self.direct.contains(c) {
                    Some(ImpactLevel::Direct)
                } else if self.indirect.contains(c) {
                    Some(ImpactLevel::Indirect)
                } else if self.transitive.contains(c) {
                    Some(ImpactLevel::Transitive)
                } else {
                    None
                }
            })
            .min()
    }

    fn contains(&self, class: &str) -> bool {
        self.changed.contains(class)
            || self.direct.contains(class)
            || self.indirect.contains(class)
            || self.transitive.contains(class)
    }
}

pub struct ImpactAnalyzer<'a> {
    graph: &'a DependencyGraph,
    flows: &'a [RequestFlow],
    /// Output identifier → source files that produced it.
    kb_outputs: Option<&'a BTreeMap<String, Vec<String>>>,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(graph: &'a DependencyGraph, flows: &'a [RequestFlow]) -> Self {
        Self {
            graph,
            flows,
            kb_outputs: None,
        }
    }

    pub fn with_outputs(mut self, kb_outputs: &'a BTreeMap<String, Vec<String>>) -> Self {
        self.kb_outputs = Some(kb_outputs);
        self
    }

    pub fn analyze(&self, changed_files: &[String], max_depth: usize) -> ImpactReport {
        let mut report = ImpactReport::empty(changed_files);

        let changed = self.changed_classes(changed_files);
        if changed.is_empty() {
            info!("No classes declared in {} changed file(s)", changed_files.len());
            return report;
        }
        debug!("Changed classes: {:?}", changed);

        let tiers = self.tiers(changed, max_depth);
        report.changed_classes = tiers.changed.iter().cloned().collect();
        report.affected_classes = self.class_items(&tiers);
        report.affected_flows = self.flow_items(&tiers);
        report.affected_endpoints = self.endpoint_items(&tiers);
        report.affected_kb_docs = self.kb_doc_items(changed_files, &report.affected_flows);
        report.affected_tests = self.test_items(&tiers);

        info!(
            "Impact analysis: {} items affected, risk={}",
            report.total_impact_count(),
            report.risk_level()
        );
        report
    }

    fn changed_classes(&self, changed_files: &[String]) -> BTreeSet<ClassId> {
        self.graph
            .nodes()
            .filter(|node| changed_files.iter().any(|f| paths_match(node.file_path(), f)))
            .map(GraphNode::full_name)
            .collect()
    }

    fn tiers(&self, changed: BTreeSet<ClassId>, max_depth: usize) -> Tiers {
        let mut tiers = Tiers {
            changed,
            ..Tiers::default()
        };

        for class in &tiers.changed {
            for dependent in self.graph.get_dependents(class) {
                let name = dependent.full_name();
                if !tiers.changed.contains(&name) {
                    tiers.direct.insert(name);
                }
            }
        }

        for class in &tiers.changed {
            for upstream in self.graph.get_all_upstream(class, max_depth) {
                if tiers.changed.contains(&upstream) || tiers.direct.contains(&upstream) {
                    continue;
                }
                let via_direct = self
                    .graph
                    .get_dependencies(&upstream)
                    .iter()
                    .any(|dep| tiers.direct.contains(&dep.full_name()));
                if via_direct {
                    tiers.transitive.remove(&upstream);
                    tiers.indirect.insert(upstream);
                } else if !tiers.indirect.contains(&upstream) {
                    tiers.transitive.insert(upstream);
                }
            }
        }

        tiers
    }

    /// `<edge kind> <target>` for the first edge into `targets`, if any.
    fn edge_reason(&self, class: &str, targets: &BTreeSet<ClassId>) -> Option<String> {
        self.graph.edges_from(class).find_map(|edge| {
            targets.contains(&edge.target).then(|| {
                let short = self
                    .graph
                    .node(&edge.target)
                    .map(|n| n.name().to_string())
                    .unwrap_or_else(|| edge.target.clone());
                format!("{} {}", edge.kind, short)
            })
        })
    }

    fn class_items(&self, tiers: &Tiers) -> Vec<ImpactedItem> {
        let mut items = Vec::new();
        let levels = [
            (ImpactLevel::Direct, &tiers.direct),
            (ImpactLevel::Indirect, &tiers.indirect),
            (ImpactLevel::Transitive, &tiers.transitive),
        ];
        for (level, classes) in levels {
            for class in classes {
                let Some(node) = self.graph.node(class) else {
                    continue;
                };
                let reason = match level {
                    ImpactLevel::Transitive => "Transitively depends on changed classes".to_string(),
                    ImpactLevel::Direct => self
                        .edge_reason(class, &tiers.changed)
                        .unwrap_or_else(|| format!("{level} dependency on changed classes")),
                    ImpactLevel::Indirect => self
                        .edge_reason(class, &tiers.changed)
                        .or_else(|| self.edge_reason(class, &tiers.direct))
                        .unwrap_or_else(|| format!("{level} dependency on changed classes")),
                };
                items.push(ImpactedItem::new(
                    node.name(),
                    ItemKind::Class,
                    level,
                    reason,
                    node.file_path(),
                ));
            }
        }
        dedup_by_name(items)
    }

    fn flow_items(&self, tiers: &Tiers) -> Vec<ImpactedItem> {
        let items = self
            .flows
            .iter()
            .filter_map(|flow| {
                let level = tiers.strongest(flow.step_classes())?;
                let overlap: BTreeSet<&str> =
                    flow.step_classes().filter(|c| tiers.contains(c)).collect();
                let reason = format!(
                    "Flow passes through: {}",
                    overlap.into_iter().collect::<Vec<_>>().join(", ")
                );
                Some(ImpactedItem::new(&flow.name, ItemKind::Flow, level, reason, flow.output_id()))
            })
            .collect();
        dedup_by_name(items)
    }

    fn endpoint_items(&self, tiers: &Tiers) -> Vec<ImpactedItem> {
        let items = self
            .flows
            .iter()
            .filter(|flow| flow.step_classes().any(|c| tiers.contains(c)))
            .flat_map(|flow| {
                flow.endpoints().map(move |step| {
                    ImpactedItem::new(
                        &step.class_name,
                        ItemKind::Endpoint,
                        ImpactLevel::Indirect,
                        format!("Endpoint for flow: {} ({})", flow.name, flow.entry_point),
                        &step.file_path,
                    )
                })
            })
            .collect();
        dedup_by_name(items)
    }

    fn kb_doc_items(&self, changed_files: &[String], affected_flows: &[ImpactedItem]) -> Vec<ImpactedItem> {
        let mut items = Vec::new();

        if let Some(outputs) = self.kb_outputs {
            for (output, sources) in outputs {
                let touched = sources
                    .iter()
                    .any(|s| changed_files.iter().any(|f| paths_match(s, f)));
                if touched {
                    items.push(ImpactedItem::new(
                        output,
                        ItemKind::KbDoc,
                        ImpactLevel::Direct,
                        "Source files changed",
                        output,
                    ));
                }
            }
        }

        if !affected_flows.is_empty() {
            items.push(ImpactedItem::new(
                SUMMARY_OUTPUT,
                ItemKind::KbDoc,
                ImpactLevel::Direct,
                "Flows changed, summary may need update",
                SUMMARY_OUTPUT,
            ));
            for flow in affected_flows {
                items.push(ImpactedItem::new(
                    &flow.file_path,
                    ItemKind::KbDoc,
                    flow.level,
                    format!("Flow '{}' affected", flow.name),
                    &flow.file_path,
                ));
            }
        }

        dedup_by_name(items)
    }

    /// Test-layer classes whose name contains an impacted class's short name plus `Test`/`Spec`.
    /// Changed classes are visited first so a test of a changed class keeps the direct tier; a
    /// changed test class lists itself.
    fn test_items(&self, tiers: &Tiers) -> Vec<ImpactedItem> {
        let tests: Vec<&GraphNode> = self
            .graph
            .nodes()
            .filter(|n| n.layer == Layer::Test)
            .filter(|n| n.name().contains("Test") || n.name().contains("Spec"))
            .collect();
        if tests.is_empty() {
            return Vec::new();
        }

        let impacted = tiers
            .changed
            .iter()
            .map(|c| (c, ImpactLevel::Direct))
            .chain(
                tiers
                    .direct
                    .iter()
                    .chain(&tiers.indirect)
                    .chain(&tiers.transitive)
                    .map(|c| (c, ImpactLevel::Indirect)),
            );

        let mut items = Vec::new();
        for (class, level) in impacted {
            let Some(node) = self.graph.node(class) else {
                continue;
            };
            let short = node.name();
            for test in &tests {
                if !test.name().contains(short) {
                    continue;
                }
                items.push(ImpactedItem::new(
                    test.name(),
                    ItemKind::Test,
                    level,
                    format!("Tests class: {short}"),
                    test.file_path(),
                ));
            }
        }
        dedup_by_name(items)
    }
}

/// Keeps the first item per name, preserving order.
fn dedup_by_name(items: Vec<ImpactedItem>) -> Vec<ImpactedItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.name.clone()))
        .collect()
}

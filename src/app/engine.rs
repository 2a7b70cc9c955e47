use crate::adapters::fs::fingerprint::Sha256Fingerprinter;
use crate::adapters::fs::snapshot::JsonSnapshotSource;
use crate::adapters::fs::state_store::JsonStateStore;
use crate::app::config::EngineConfig;
use crate::app::dto::*;
use crate::domain::builder::GraphBuilder;
use crate::domain::classifier::{DomainAggregate, PatternClassifier, UseCase};
use crate::domain::descriptor::CodebaseSnapshot;
use crate::domain::flow::{FlowReconstructor, RequestFlow};
use crate::domain::graph::DependencyGraph;
use crate::domain::node::GraphNode;
use crate::domain::impact::{ImpactAnalyzer, ImpactReport, SUMMARY_OUTPUT};
use crate::domain::ports::{DescriptorSource, Fingerprinter, StateStore};
use crate::domain::state::KbState;
use crate::domain::tracker::StateTracker;
use crate::domain::type_registry::ScopeHint;
use crate::error::EngineError;
use anyhow::{Context as _, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything derived from one snapshot.
pub struct Analysis {
    pub snapshot: CodebaseSnapshot,
    pub graph: DependencyGraph,
    pub flows: Vec<RequestFlow>,
    pub aggregates: Vec<DomainAggregate>,
    pub use_cases: Vec<UseCase>,
}

/// Pipeline orchestration: snapshot → graph → flows → impact, plus state persistence.
pub struct KnowledgeEngine {
    root: PathBuf,
    config: EngineConfig,
    source: Box<dyn DescriptorSource>,
    fingerprinter: Box<dyn Fingerprinter>,
    store: Box<dyn StateStore>,
    pool: Option<rayon::ThreadPool>,
}

impl KnowledgeEngine {
    pub fn new(
        root: impl Into<PathBuf>,
        config: EngineConfig,
        source: Box<dyn DescriptorSource>,
        fingerprinter: Box<dyn Fingerprinter>,
        store: Box<dyn StateStore>,
    ) -> Result<Self> {
        let pool = if config.workers > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.workers)
                    .build()
                    .context("Failed to build worker pool")?,
            )
        } else {
            None
        };
        Ok(Self {
            root: root.into(),
            config,
            source,
            fingerprinter,
            store,
            pool,
        })
    }

    /// Filesystem wiring: JSON snapshot, SHA-256 fingerprints, JSON state under `root`.
    pub fn open(snapshot_path: &Path, root: &Path, config: EngineConfig) -> Result<Self> {
        let store = JsonStateStore::new(config.state_path(root));
        Self::new(
            root,
            config,
            Box::new(JsonSnapshotSource::new(snapshot_path)),
            Box::new(Sha256Fingerprinter::new()),
            Box::new(store),
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state_path(&self) -> PathBuf {
        self.config.state_path(&self.root)
    }

    fn run<T: Send>(&self, job: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }

    fn tracker<'a>(&'a self, snapshot: &CodebaseSnapshot) -> StateTracker<'a> {
        let base = if snapshot.root.is_empty() {
            self.root.clone()
        } else {
            PathBuf::from(&snapshot.root)
        };
        StateTracker::new(base, self.fingerprinter.as_ref())
    }

    fn load_snapshot(&self) -> Result<CodebaseSnapshot> {
        let snapshot = self.source.load().context("Failed to load codebase snapshot")?;
        if snapshot.projects.is_empty() {
            return Err(EngineError::NoProjects {
                root: if snapshot.root.is_empty() {
                    self.root.display().to_string()
                } else {
                    snapshot.root.clone()
                },
            }
            .into());
        }
        let unparsed = snapshot.unparsed_count();
        if unparsed > 0 {
            warn!("{} file(s) could not be parsed and were skipped", unparsed);
        }
        Ok(snapshot)
    }

    /// Builds graph, flows, aggregates and use cases from a fresh snapshot.
    pub fn analyze(&self) -> Result<Analysis> {
        let snapshot = self.load_snapshot()?;
        Ok(self.analyze_snapshot(snapshot))
    }

    fn analyze_snapshot(&self, snapshot: CodebaseSnapshot) -> Analysis {
        let classes = snapshot.classes();
        let builder = GraphBuilder::new().with_excluded_projects(&self.config.exclude_projects);
        let graph = self.run(|| builder.build(&classes, &snapshot.projects));

        let flows = FlowReconstructor::new(&graph).reconstruct();
        let classifier = PatternClassifier::new();
        let aggregates = classifier.find_aggregates(&classes);
        let use_cases = classifier.find_use_cases(&classes);
        info!(
            "Analysis: {} flows, {} aggregates, {} use cases",
            flows.len(),
            aggregates.len(),
            use_cases.len()
        );

        Analysis {
            snapshot,
            graph,
            flows,
            aggregates,
            use_cases,
        }
    }

    /// `SUMMARY.md` comes from every source file; each flow document from its steps' files.
    fn record_outputs(&self, tracker: &StateTracker<'_>, state: &mut KbState, analysis: &Analysis) -> Vec<String> {
        state.kb_outputs.clear();
        tracker.mark_output(state, SUMMARY_OUTPUT, analysis.snapshot.source_paths());
        for flow in &analysis.flows {
            let sources: BTreeSet<String> = flow
                .steps
                .iter()
                .filter(|s| !s.file_path.is_empty())
                .map(|s| s.file_path.clone())
                .collect();
            tracker.mark_output(state, flow.output_id(), sources.into_iter().collect());
        }
        state.kb_outputs.keys().cloned().collect()
    }

    /// Full scan: analyze everything, fingerprint every source file, persist fresh state.
    pub fn scan(&self) -> Result<ScanResponse> {
        let analysis = self.analyze()?;
        let tracker = self.tracker(&analysis.snapshot);
        let sources = analysis.snapshot.source_paths();

        let mut state = KbState::new();
        let tracked = self.run(|| tracker.update_file_states(&mut state, &sources));
        if tracked < sources.len() {
            warn!(
                "{} of {} source file(s) could not be fingerprinted and stay untracked",
                sources.len() - tracked,
                sources.len()
            );
        }
        let outputs = self.record_outputs(&tracker, &mut state, &analysis);
        let now = Utc::now();
        state.last_full_scan = Some(now);
        state.last_update = Some(now);
        self.store.save(&state)?;

        info!("Full scan complete: {} files tracked", tracked);
        Ok(scan_response(&analysis, tracked, outputs, self.state_path()))
    }

    /// Incremental update. Without usable prior state this is a full scan.
    pub fn update(&self) -> Result<UpdateResponse> {
        let Some(mut state) = self.store.load() else {
            info!("No usable prior state, falling back to full scan");
            return Ok(UpdateResponse::FullScan(self.scan()?));
        };

        let snapshot = self.load_snapshot()?;
        let tracker = self.tracker(&snapshot);
        let sources = snapshot.source_paths();
        let changes = self.run(|| tracker.compute_changes(&sources, &state));
        if !changes.has_changes() {
            info!("Knowledge base is up to date");
            return Ok(UpdateResponse::UpToDate {
                tracked_files: state.files.len(),
            });
        }

        let analysis = self.analyze_snapshot(snapshot);
        let changed = changes.all_changed();
        let report = ImpactAnalyzer::new(&analysis.graph, &analysis.flows)
            .with_outputs(&state.kb_outputs)
            .analyze(&changed, self.config.impact_depth);

        let mut touched = changed.clone();
        touched.extend(changes.deleted.iter().cloned());
        let mut stale: BTreeSet<String> = tracker.affected_outputs(&state, &touched);
        stale.extend(report.affected_kb_docs.iter().map(|d| d.name.clone()));
        stale.insert(SUMMARY_OUTPUT.to_string());

        state.forget(&changes.deleted);
        self.run(|| tracker.update_file_states(&mut state, &changed));
        self.record_outputs(&tracker, &mut state, &analysis);
        state.last_update = Some(Utc::now());
        self.store.save(&state)?;

        info!(
            "Update complete: {} stale outputs, risk={}",
            stale.len(),
            report.risk_level()
        );
        Ok(UpdateResponse::Updated {
            risk_level: report.risk_level(),
            total_impact_count: report.total_impact_count(),
            stale_outputs: stale.into_iter().collect(),
            changes,
            impact: report,
        })
    }

    /// Drops persisted state and rescans from scratch.
    pub fn refresh(&self) -> Result<ScanResponse> {
        self.store.clear()?;
        self.scan()
    }

    /// Impact of `files` against the stored provenance map. Never writes state.
    pub fn impact(&self, files: &[String], max_depth: Option<usize>) -> Result<ImpactReport> {
        let analysis = self.analyze()?;
        let state = self.store.load();
        let mut analyzer = ImpactAnalyzer::new(&analysis.graph, &analysis.flows);
        if let Some(state) = &state {
            analyzer = analyzer.with_outputs(&state.kb_outputs);
        }
        Ok(analyzer.analyze(files, max_depth.unwrap_or(self.config.impact_depth)))
    }

    /// Neighborhood of every class matching `name` (short or fully qualified).
    pub fn inspect(&self, name: &str, namespace: Option<&str>) -> Result<InspectResponse> {
        let analysis = self.analyze()?;
        let graph = &analysis.graph;

        let candidates = if graph.contains(name) {
            vec![name.to_string()]
        } else {
            let resolution = match namespace {
                Some(ns) => graph.resolve_name_scoped(name, &ScopeHint::namespace(ns)),
                None => graph.resolve_name(name),
            };
            resolution.into_candidates()
        };

        let depth = self.config.traversal_depth;
        let matches = candidates
            .iter()
            .filter_map(|full| graph.node(full))
            .map(|node| {
                let full = node.full_name();
                ClassReport {
                    role: node.role,
                    layer: node.layer,
                    project: node.project.clone(),
                    file_path: node.file_path().to_string(),
                    dependencies: full_names(graph.get_dependencies(&full)),
                    dependents: full_names(graph.get_dependents(&full)),
                    upstream: graph.get_all_upstream(&full, depth).into_iter().collect(),
                    downstream: graph.get_all_downstream(&full, depth).into_iter().collect(),
                    class: full,
                }
            })
            .collect();

        Ok(InspectResponse {
            query: name.to_string(),
            matches,
        })
    }
}

fn full_names(nodes: Vec<&GraphNode>) -> Vec<String> {
    nodes.into_iter().map(GraphNode::full_name).collect()
}

fn scan_response(analysis: &Analysis, tracked: usize, outputs: Vec<String>, state_path: PathBuf) -> ScanResponse {
    ScanResponse {
        solution: analysis.snapshot.solution_name.clone(),
        project_count: analysis.snapshot.projects.len(),
        graph: analysis.graph.stats(),
        flows: analysis
            .flows
            .iter()
            .map(|f| FlowSummary {
                name: f.name.clone(),
                entry_point: f.entry_point.clone(),
                step_count: f.steps.len(),
                output: f.output_id(),
            })
            .collect(),
        aggregates: analysis
            .aggregates
            .iter()
            .map(|a| AggregateSummary {
                root: a.root.full_name(),
                value_objects: a.value_objects.len(),
                domain_events: a.domain_events.len(),
                specifications: a.specifications.len(),
                event_handlers: a.event_handlers.len(),
            })
            .collect(),
        use_cases: analysis
            .use_cases
            .iter()
            .map(|u| UseCaseSummary {
                message: u.message.full_name(),
                handler: u.handler.full_name(),
                pattern: u.pattern,
                dependencies: u.dependencies.clone(),
            })
            .collect(),
        tracked_files: tracked,
        unparsed_files: analysis.snapshot.unparsed_count(),
        outputs,
        state_path: state_path.display().to_string(),
    }
}

use crate::app::dto::{ImpactResponse, InspectResponse, ScanResponse, UpdateResponse};
use crate::app::engine::KnowledgeEngine;
use crate::domain::impact::ImpactedItem;
use anyhow::Result;
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_scan(result: &ScanResponse) {
    println!("Scan complete: {}", result.solution);
    println!("  Projects:       {}", result.project_count);
    println!("  Classes:        {}", result.graph.node_count);
    println!("  Relationships:  {}", result.graph.edge_count);
    println!("  Flows:          {}", result.flows.len());
    println!("  Aggregates:     {}", result.aggregates.len());
    println!("  Use cases:      {}", result.use_cases.len());
    println!("  Tracked files:  {}", result.tracked_files);
    if result.unparsed_files > 0 {
        println!("  Unparsed files: {}", result.unparsed_files);
    }
    println!("  State:          {}", result.state_path);

    if !result.graph.roles.is_empty() {
        println!("\nRoles:");
        for (role, count) in &result.graph.roles {
            println!("  {:<14} {}", role, count);
        }
    }
}

pub fn scan(engine: &KnowledgeEngine, json: bool) -> Result<()> {
    let result = engine.scan()?;
    if json {
        return print_json(&result);
    }
    print_scan(&result);
    Ok(())
}

pub fn refresh(engine: &KnowledgeEngine, json: bool) -> Result<()> {
    let result = engine.refresh()?;
    if json {
        return print_json(&result);
    }
    println!("State cleared.");
    print_scan(&result);
    Ok(())
}

pub fn update(engine: &KnowledgeEngine, json: bool) -> Result<()> {
    let result = engine.update()?;
    if json {
        return print_json(&result);
    }
    match &result {
        UpdateResponse::FullScan(scan) => {
            println!("No previous state found, ran a full scan.");
            print_scan(scan);
        }
        UpdateResponse::UpToDate { tracked_files } => {
            println!("Up to date ({} files tracked).", tracked_files);
        }
        UpdateResponse::Updated {
            changes,
            risk_level,
            total_impact_count,
            stale_outputs,
            ..
        } => {
            println!(
                "Changes: +{} ~{} -{}",
                changes.added.len(),
                changes.modified.len(),
                changes.deleted.len()
            );
            println!("Risk: {} ({} items affected)", risk_level, total_impact_count);
            println!("\nOutputs to regenerate:");
            for output in stale_outputs {
                println!("  {}", output);
            }
        }
    }
    Ok(())
}

fn print_items(title: &str, items: &[ImpactedItem]) {
    if items.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, items.len());
    for item in items {
        println!("  [{}] {} - {}", item.level, item.name, item.reason);
    }
}

pub fn impact(engine: &KnowledgeEngine, files: &[String], depth: Option<usize>, json: bool) -> Result<()> {
    let result = ImpactResponse::from(engine.impact(files, depth)?);
    if json {
        return print_json(&result);
    }

    println!("Impact of {} changed file(s)", result.report.changed_files.len());
    println!("{}", "=".repeat(60));
    if result.report.changed_classes.is_empty() {
        println!("No classes are declared in the changed files.");
        return Ok(());
    }
    println!("Risk: {}", result.risk_level);
    println!("Changed classes: {}", result.report.changed_classes.join(", "));
    print_items("Affected classes", &result.report.affected_classes);
    print_items("Affected flows", &result.report.affected_flows);
    print_items("Affected endpoints", &result.report.affected_endpoints);
    print_items("Affected tests", &result.report.affected_tests);
    print_items("Documents to regenerate", &result.report.affected_kb_docs);
    Ok(())
}

/// Graph export is JSON only.
pub fn graph(engine: &KnowledgeEngine) -> Result<()> {
    let analysis = engine.analyze()?;
    print_json(&analysis.graph.export())
}

pub fn flows(engine: &KnowledgeEngine, json: bool) -> Result<()> {
    let analysis = engine.analyze()?;
    if json {
        return print_json(&analysis.flows);
    }
    for flow in &analysis.flows {
        println!("{}  [{}]", flow.name, flow.entry_point);
        for (i, step) in flow.steps.iter().enumerate() {
            println!("  {}. {} ({}) {}", i + 1, step.class_name, step.role, step.action);
        }
        for concern in &flow.cross_cutting {
            println!("  + {}", concern);
        }
        for effect in &flow.side_effects {
            println!("  ! {}", effect);
        }
        println!();
    }
    Ok(())
}

pub fn inspect(engine: &KnowledgeEngine, name: &str, namespace: Option<&str>, json: bool) -> Result<()> {
    let result: InspectResponse = engine.inspect(name, namespace)?;
    if json {
        return print_json(&result);
    }
    if result.matches.is_empty() {
        println!("No class named '{}'", name);
        return Ok(());
    }
    for class in &result.matches {
        println!("{} [{} / {}]", class.class, class.role, class.layer);
        println!("  File:        {}", class.file_path);
        if !class.project.is_empty() {
            println!("  Project:     {}", class.project);
        }
        println!("  Depends on:  {}", class.dependencies.join(", "));
        println!("  Used by:     {}", class.dependents.join(", "));
        println!("  Upstream:    {} classes", class.upstream.len());
        println!("  Downstream:  {} classes", class.downstream.len());
        println!();
    }
    Ok(())
}

//! Command implementations for the CLI

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use riskgraph::definition::Definition;
use riskgraph::diagram::{DiagramEdge, DiagramNode};
use riskgraph::model::{EvaluateError, Model};
use riskgraph::output::{BacklogRow, CheckResult, OperationResult, OutputMode, RiskRow};
use riskgraph::report::{self, TableFormat};
use riskgraph::storage::StateStore;

/// Risk state operations shared by the `risk` subcommands
#[derive(Debug, Clone, Copy)]
pub enum RiskOp {
    /// Record the risk as accepted
    Accept,
    /// Record the risk as transferred
    Transfer,
    /// Record the risk as mitigated
    Mitigate,
    /// Record the risk as a false positive
    Discard,
}

/// Task state operations shared by the `task` subcommands
#[derive(Debug, Clone, Copy)]
pub enum TaskOp {
    /// Record the task as in progress
    Process,
    /// Record the task as closed
    Close,
    /// Record the task as deferred
    Defer,
}

fn load(path: &Path) -> anyhow::Result<(Model, StateStore)> {
    let definition = Definition::load(path)
        .with_context(|| format!("cannot load model definition {}", path.display()))?;
    let mut model = definition.build()?;

    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let store = StateStore::new(root);
    model.set_state(store.load()?);
    Ok((model, store))
}

fn evaluated(path: &Path) -> anyhow::Result<(Model, StateStore)> {
    let (mut model, store) = load(path)?;
    model.evaluate()?;
    Ok((model, store))
}

/// Build and evaluate the model, reporting validation violations
pub fn check(path: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let (mut model, _store) = load(path)?;
    let result = match model.evaluate() {
        Ok(()) => CheckResult {
            passed: true,
            model: model.name.clone(),
            risks: model.risks().count(),
            violations: Vec::new(),
        },
        Err(EvaluateError::Validation(violations)) => CheckResult {
            passed: false,
            model: model.name.clone(),
            risks: 0,
            violations,
        },
        Err(err) => return Err(err.into()),
    };

    result.render(mode);
    if !result.passed {
        std::process::exit(1);
    }
    Ok(())
}

/// List the derived risks
pub fn risks(path: &Path, format: TableFormat, mode: OutputMode) -> anyhow::Result<()> {
    let (model, _store) = evaluated(path)?;
    match mode {
        OutputMode::Json => {
            let rows: Vec<RiskRow> = model
                .risks()
                .map(|risk| RiskRow {
                    id: risk.id.clone(),
                    severity: risk.severity,
                    category: risk.category.to_string(),
                    name: risk.name.clone(),
                    target: risk.target.clone(),
                    treatment: model.treatment_of(risk).to_string(),
                    text: risk.text.clone(),
                })
                .collect();
            riskgraph::output::render_json(&rows);
        },
        OutputMode::Human => print!("{}", report::risks_table(&model, format)),
    }
    Ok(())
}

/// List the remediation backlog
pub fn backlog(path: &Path, format: TableFormat, mode: OutputMode) -> anyhow::Result<()> {
    let (model, _store) = evaluated(path)?;
    match mode {
        OutputMode::Json => {
            let rows: Vec<BacklogRow> = model
                .backlog()
                .into_iter()
                .map(|task| BacklogRow {
                    id: task.id,
                    risk_id: task.risk_id,
                    sub_category: task.sub_category,
                    text: task.text,
                    state: task.state.to_string(),
                })
                .collect();
            riskgraph::output::render_json(&rows);
        },
        OutputMode::Human => print!("{}", report::backlog_table(&model, format)),
    }
    Ok(())
}

/// Export the model as an OTM document
pub fn export(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let (model, _store) = evaluated(path)?;
    let json = model.otm().to_json()?;
    match output {
        Some(target) => {
            fs::write(target, &json)
                .with_context(|| format!("cannot write {}", target.display()))?;
            println!("exported {} to {}", model.name, target.display());
        },
        None => println!("{json}"),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DiagramResult {
    nodes: Vec<DiagramNode>,
    edges: Vec<DiagramEdge>,
}

/// Print the diagram descriptors
pub fn diagram(path: &Path, mode: OutputMode) -> anyhow::Result<()> {
    let (model, _store) = load(path)?;
    let result = DiagramResult {
        nodes: model.diagram_nodes(),
        edges: model.diagram_edges(),
    };
    match mode {
        OutputMode::Json => riskgraph::output::render_json(&result),
        OutputMode::Human => {
            for node in &result.nodes {
                println!("node {} [{}] {}", node.id, node.shape, node.name);
            }
            for edge in &result.edges {
                let arrow = if edge.bidirectional { "<->" } else { "->" };
                println!("edge {} {arrow} {} ({})", edge.source, edge.destination, edge.label);
            }
        },
    }
    Ok(())
}

/// Record a risk disposition and persist it
pub fn risk_state(
    path: &Path,
    op: RiskOp,
    risk_id: &str,
    ticket: Option<String>,
    comment: Option<String>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let (mut model, store) = evaluated(path)?;
    let (verb, result) = match op {
        RiskOp::Accept => ("accepted", model.accept_risk(risk_id, ticket, comment)),
        RiskOp::Transfer => ("transferred", model.transfer_risk(risk_id, ticket, comment)),
        RiskOp::Mitigate => ("mitigated", model.mitigate_risk(risk_id, ticket, comment)),
        RiskOp::Discard => ("discarded", model.discard_risk(risk_id, ticket, comment)),
    };
    result?;
    store.save(model.state())?;

    OperationResult {
        success: true,
        message: format!("{verb} risk {risk_id}"),
    }
    .render(mode);
    Ok(())
}

/// Record a task state and persist it
pub fn task_state(
    path: &Path,
    op: TaskOp,
    task_id: &str,
    ticket: Option<String>,
    comment: Option<String>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let (mut model, store) = evaluated(path)?;
    let (verb, result) = match op {
        TaskOp::Process => ("started", model.process_task(task_id, ticket, comment)),
        TaskOp::Close => ("closed", model.close_task(task_id, ticket, comment)),
        TaskOp::Defer => ("deferred", model.defer_task(task_id, ticket, comment)),
    };
    result?;
    store.save(model.state())?;

    OperationResult {
        success: true,
        message: format!("{verb} task {task_id}"),
    }
    .render(mode);
    Ok(())
}

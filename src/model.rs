//! The model root - owner of the construct tree and everything in it
//!
//! A [`Model`] owns the tree, the typed element maps keyed by tree node, the
//! rule library, the task template repository, the derived risk set, and the
//! persisted remediation state. Elements are registered through the `add_*`
//! methods, which assign the deterministic construct id and hand back a typed
//! handle; all later access goes through that handle.

use std::collections::BTreeMap;

use log::{debug, info};
use thiserror::Error;

use crate::asset::Asset;
use crate::component::Component;
use crate::data_flow::DataFlow;
use crate::diagram::{DiagramEdge, DiagramNode};
use crate::element::{AssetId, BoundaryId, ComponentId, FlowId, MitigationId};
use crate::risk::{Mitigation, MitigationKind, Risk, Treatment};
use crate::storage::{ModelState, RiskStateRecord, TaskStateRecord};
use crate::task::{RemediationTask, TaskState, TaskTemplateRepository};
use crate::threat::{render_risk_text, ApplyError, Threat, ThreatLibrary};
use crate::tree::{kebab_case, NodeId, Tree, TreeError};
use crate::trust_boundary::TrustBoundary;

/// Errors from model lookups and state operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// Registration in the construct tree failed
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// No risk with the given id exists in the current risk set
    #[error("no risk with id `{0}`; run an evaluation first")]
    UnknownRisk(String),

    /// No task with the given id exists in the current backlog
    #[error("no task with id `{0}`; run an evaluation first")]
    UnknownTask(String),
}

/// Errors from an evaluation pass
#[derive(Debug, Error)]
pub enum EvaluateError {
    /// One or more model validations failed
    #[error("model validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// A threat rule failed during derivation
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

type Validation = Box<dyn Fn(&Model) -> Option<String> + Send + Sync>;

/// A threat model: architecture graph, rules, risks, and recorded state
pub struct Model {
    /// Model name; model-scoped risks target it
    pub name: String,
    /// Free-form description, carried into exports
    pub description: String,
    /// The rule library applied on evaluation
    pub library: ThreatLibrary,
    /// Remediation task templates matched to risks by CWE id
    pub templates: TaskTemplateRepository,
    /// When set, evaluation skips the registered validations
    pub skip_validation: bool,
    tree: Tree,
    root: NodeId,
    components: BTreeMap<NodeId, Component>,
    assets: BTreeMap<NodeId, Asset>,
    flows: BTreeMap<NodeId, DataFlow>,
    boundaries: BTreeMap<NodeId, TrustBoundary>,
    mitigations: BTreeMap<NodeId, Mitigation>,
    risks: BTreeMap<String, Risk>,
    state: ModelState,
    validations: Vec<Validation>,
}

impl Model {
    /// Create a model using the built-in rule catalog and task templates
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_library(name, crate::catalog::default_library())
    }

    /// Create a model with a custom rule library
    #[must_use]
    pub fn with_library(name: impl Into<String>, library: ThreatLibrary) -> Self {
        let (tree, root) = Tree::new();
        Self {
            name: name.into(),
            description: String::new(),
            library,
            templates: TaskTemplateRepository::builtin(),
            skip_validation: false,
            tree,
            root,
            components: BTreeMap::new(),
            assets: BTreeMap::new(),
            flows: BTreeMap::new(),
            boundaries: BTreeMap::new(),
            mitigations: BTreeMap::new(),
            risks: BTreeMap::new(),
            state: ModelState::default(),
            validations: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    // ---- registration ----------------------------------------------------

    /// Register a component and return its handle
    pub fn add_component(&mut self, mut component: Component) -> Result<ComponentId, ModelError> {
        let node = self.register(&component.info.name)?;
        component.info.node = Some(node);
        self.components.insert(node, component);
        Ok(ComponentId(node))
    }

    /// Register an asset and return its handle
    pub fn add_asset(&mut self, mut asset: Asset) -> Result<AssetId, ModelError> {
        let node = self.register(&asset.info.name)?;
        asset.info.node = Some(node);
        self.assets.insert(node, asset);
        Ok(AssetId(node))
    }

    /// Register a data flow and return its handle
    ///
    /// Every flow is expected to transfer at least one asset; a validation
    /// checking this is registered alongside the flow.
    pub fn add_data_flow(&mut self, mut flow: DataFlow) -> Result<FlowId, ModelError> {
        let node = self.register(&flow.info.name)?;
        flow.info.node = Some(node);
        self.flows.insert(node, flow);

        let id = FlowId(node);
        self.add_validation(move |model| {
            let flow = model.data_flow(id);
            flow.assets.is_empty().then(|| {
                format!(
                    "unnecessary communication link: data flow `{}` transfers no assets",
                    flow.info.name
                )
            })
        });
        Ok(id)
    }

    /// Register a trust boundary and return its handle
    pub fn add_trust_boundary(
        &mut self,
        mut boundary: TrustBoundary,
    ) -> Result<BoundaryId, ModelError> {
        let node = self.register(&boundary.info.name)?;
        boundary.info.node = Some(node);
        self.boundaries.insert(node, boundary);
        Ok(BoundaryId(node))
    }

    /// Register a mitigation and return its handle
    ///
    /// Mitigation presets share their display name, so colliding construct
    /// ids get a numeric suffix in registration order.
    pub fn add_mitigation(&mut self, mut mitigation: Mitigation) -> Result<MitigationId, ModelError> {
        let base = kebab_case(&mitigation.info.name);
        let mut id = base.clone();
        let mut n = 1;
        while self.tree.find_child(self.root, &id).is_some() {
            n += 1;
            id = format!("{base}-{n}");
        }
        let node = self.tree.add_node(self.root, &id)?;
        mitigation.info.node = Some(node);
        self.mitigations.insert(node, mitigation);
        Ok(MitigationId(node))
    }

    /// Register a validation run before every evaluation pass
    ///
    /// A validation returns `Some(message)` to report a failure.
    pub fn add_validation<F>(&mut self, validation: F)
    where
        F: Fn(&Self) -> Option<String> + Send + Sync + 'static,
    {
        self.validations.push(Box::new(validation));
    }

    fn register(&mut self, name: &str) -> Result<NodeId, ModelError> {
        Ok(self.tree.add_node(self.root, &kebab_case(name))?)
    }

    // ---- element access --------------------------------------------------

    /// The component behind a handle issued by this model
    #[must_use]
    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[&id.0]
    }

    /// Mutable access to a registered component
    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        self.components.get_mut(&id.0).unwrap_or_else(|| unreachable!("stale component handle"))
    }

    /// The asset behind a handle issued by this model
    #[must_use]
    pub fn asset(&self, id: AssetId) -> &Asset {
        &self.assets[&id.0]
    }

    /// The data flow behind a handle issued by this model
    #[must_use]
    pub fn data_flow(&self, id: FlowId) -> &DataFlow {
        &self.flows[&id.0]
    }

    /// Mutable access to a registered data flow
    pub fn data_flow_mut(&mut self, id: FlowId) -> &mut DataFlow {
        self.flows.get_mut(&id.0).unwrap_or_else(|| unreachable!("stale data flow handle"))
    }

    /// The trust boundary behind a handle issued by this model
    #[must_use]
    pub fn trust_boundary(&self, id: BoundaryId) -> &TrustBoundary {
        &self.boundaries[&id.0]
    }

    /// The mitigation behind a handle issued by this model
    #[must_use]
    pub fn mitigation(&self, id: MitigationId) -> &Mitigation {
        &self.mitigations[&id.0]
    }

    /// All components in registration order
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components.iter().map(|(&node, c)| (ComponentId(node), c))
    }

    /// All assets in registration order
    pub fn assets(&self) -> impl Iterator<Item = (AssetId, &Asset)> {
        self.assets.iter().map(|(&node, a)| (AssetId(node), a))
    }

    /// All data flows in registration order
    pub fn data_flows(&self) -> impl Iterator<Item = (FlowId, &DataFlow)> {
        self.flows.iter().map(|(&node, f)| (FlowId(node), f))
    }

    /// All trust boundaries in registration order
    pub fn trust_boundaries(&self) -> impl Iterator<Item = (BoundaryId, &TrustBoundary)> {
        self.boundaries.iter().map(|(&node, b)| (BoundaryId(node), b))
    }

    /// All mitigations in registration order
    pub fn mitigations(&self) -> impl Iterator<Item = (MitigationId, &Mitigation)> {
        self.mitigations.iter().map(|(&node, m)| (MitigationId(node), m))
    }

    /// The construct id of an element node
    #[must_use]
    pub fn construct_id(&self, node: NodeId) -> &str {
        self.tree.id(node)
    }

    /// Find a component by display name
    #[must_use]
    pub fn component_by_name(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|(_, c)| c.info.name == name)
            .map(|(&node, _)| ComponentId(node))
    }

    /// Find a data flow by display name
    #[must_use]
    pub fn data_flow_by_name(&self, name: &str) -> Option<FlowId> {
        self.flows
            .iter()
            .find(|(_, f)| f.info.name == name)
            .map(|(&node, _)| FlowId(node))
    }

    /// Data flows terminating at the component
    #[must_use]
    pub fn incoming_flows(&self, component: ComponentId) -> Vec<FlowId> {
        self.flows
            .iter()
            .filter(|(_, f)| f.destination == component)
            .map(|(&node, _)| FlowId(node))
            .collect()
    }

    /// Data flows originating at the component
    #[must_use]
    pub fn outgoing_flows(&self, component: ComponentId) -> Vec<FlowId> {
        self.flows
            .iter()
            .filter(|(_, f)| f.source == component)
            .map(|(&node, _)| FlowId(node))
            .collect()
    }

    /// Whether a flow crosses a trust boundary
    ///
    /// True when the endpoints relate to different boundaries (or only one
    /// relates to a boundary at all).
    #[must_use]
    pub fn is_across_trust_boundary(&self, flow: FlowId) -> bool {
        let flow = self.data_flow(flow);
        self.component(flow.source).trust_boundary
            != self.component(flow.destination).trust_boundary
    }

    /// Whether a flow is out of scope; it is iff both endpoints are
    #[must_use]
    pub fn flow_out_of_scope(&self, flow: FlowId) -> bool {
        let flow = self.data_flow(flow);
        self.component(flow.source).info.out_of_scope
            && self.component(flow.destination).info.out_of_scope
    }

    /// Record that `flow` transfers `asset`
    ///
    /// Both endpoints are marked as processing the asset. The operation is
    /// idempotent.
    pub fn transfers(&mut self, flow: FlowId, asset: AssetId) {
        let (source, destination) = {
            let flow = self.flows.get_mut(&flow.0).unwrap_or_else(|| unreachable!("stale data flow handle"));
            flow.assets.insert(asset);
            (flow.source, flow.destination)
        };
        self.component_mut(source).processes(asset);
        self.component_mut(destination).processes(asset);
    }

    // ---- evaluation ------------------------------------------------------

    /// Lock the model against structural mutation
    pub fn lock(&mut self) {
        self.tree.lock(self.root);
    }

    /// Unlock the model
    pub fn unlock(&mut self) {
        self.tree.unlock(self.root);
    }

    /// Whether the model is currently locked
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.tree.is_locked(self.root)
    }

    /// Run a full evaluation pass
    ///
    /// The model is locked, validated, the risk set rebuilt from scratch,
    /// mitigations re-attached by treated risk id, and the model unlocked
    /// again (also on failure). Evaluating an unchanged model twice yields
    /// the same risk set.
    pub fn evaluate(&mut self) -> Result<(), EvaluateError> {
        self.lock();
        let result = self.run_evaluation();
        self.unlock();
        result
    }

    fn run_evaluation(&mut self) -> Result<(), EvaluateError> {
        if self.skip_validation {
            debug!("validations skipped by configuration");
        } else {
            let failures: Vec<String> =
                self.validations.iter().filter_map(|check| check(self)).collect();
            if !failures.is_empty() {
                return Err(EvaluateError::Validation(failures));
            }
        }

        let mut risks: BTreeMap<String, Risk> = BTreeMap::new();
        for risk in self.library.apply(self, None)? {
            risks.insert(risk.id.clone(), risk);
        }
        let component_ids: Vec<ComponentId> =
            self.components.keys().map(|&node| ComponentId(node)).collect();
        for component in component_ids {
            for risk in self.library.apply(self, Some(component))? {
                risks.insert(risk.id.clone(), risk);
            }
        }

        for (&node, mitigation) in &self.mitigations {
            for risk_id in mitigation.treated_risk_ids() {
                if let Some(risk) = risks.get_mut(risk_id) {
                    risk.mitigation_ids.push(MitigationId(node));
                }
            }
        }

        info!("evaluation produced {} risk(s) for model `{}`", risks.len(), self.name);
        self.risks = risks;
        Ok(())
    }

    // ---- risks and treatment ---------------------------------------------

    /// Look up a risk from the last evaluation pass
    pub fn risk(&self, id: &str) -> Result<&Risk, ModelError> {
        self.risks.get(id).ok_or_else(|| ModelError::UnknownRisk(id.to_string()))
    }

    /// Mutable access to a risk, e.g. for an ephemeral treatment override
    pub fn risk_mut(&mut self, id: &str) -> Result<&mut Risk, ModelError> {
        self.risks.get_mut(id).ok_or_else(|| ModelError::UnknownRisk(id.to_string()))
    }

    /// All risks from the last evaluation pass, in id order
    pub fn risks(&self) -> impl Iterator<Item = &Risk> {
        self.risks.values()
    }

    /// Resolve the effective treatment of a risk
    ///
    /// Precedence: recorded disposition, then the in-memory override, then
    /// attached mitigations, then a fully closed non-empty task set, else
    /// unchecked. Among mitigations, an Accept action wins regardless of
    /// registration order, then Transfer, then FalsePositive; any effective
    /// countermeasure counts as mitigated.
    #[must_use]
    pub fn treatment_of(&self, risk: &Risk) -> Treatment {
        if let Some(record) = self.state.risks.get(&risk.id) {
            return record.treatment;
        }
        if let Some(treatment) = risk.treatment_override {
            return treatment;
        }

        let mut accepted = false;
        let mut transferred = false;
        let mut false_positive = false;
        let mut has_countermeasure = false;
        for &id in &risk.mitigation_ids {
            let mitigation = self.mitigation(id);
            match mitigation.kind {
                MitigationKind::Accept => accepted = true,
                MitigationKind::Transfer => transferred = true,
                MitigationKind::FalsePositive => false_positive = true,
                MitigationKind::Countermeasure => {
                    has_countermeasure |= mitigation.risk_reduction > 0;
                },
            }
        }
        if accepted {
            return Treatment::Accepted;
        }
        if transferred {
            return Treatment::Transferred;
        }
        if false_positive {
            return Treatment::FalsePositive;
        }
        if has_countermeasure {
            return Treatment::Mitigated;
        }

        let tasks = self.tasks_for(risk);
        if !tasks.is_empty() && tasks.iter().all(|t| t.state == TaskState::Closed) {
            return Treatment::Mitigated;
        }
        Treatment::Unchecked
    }

    // ---- remediation backlog ---------------------------------------------

    /// Derive the remediation tasks for one risk
    ///
    /// Templates are matched by shared CWE id, narrowed by the rule's
    /// template filter when the rule defines one, and rendered against the
    /// risk's component and data flow.
    #[must_use]
    pub fn tasks_for(&self, risk: &Risk) -> Vec<RemediationTask> {
        let matched = self.templates.get_by_cwe(&risk.cwe_ids);
        let component = self.component_by_name(&risk.target);
        let flow = risk.data_flow.as_deref().and_then(|name| self.data_flow_by_name(name));

        let templates = match (self.library.get(&risk.threat_id), component) {
            (Some(Threat::Component(rule)), Some(c)) => rule.task_templates(self, c, &matched),
            _ => matched,
        };

        templates
            .into_iter()
            .map(|template| {
                let id = format!("{}@{}", template.id, risk.id);
                let text = if template.user_story.is_empty() {
                    template.description.clone()
                } else {
                    render_risk_text(&template.user_story, self, component, flow)
                };
                let state = self.state.tasks.get(&id).map_or_else(TaskState::default, |r| r.state);
                RemediationTask {
                    id,
                    risk_id: risk.id.clone(),
                    template_id: template.id.clone(),
                    sub_category: template.sub_category().to_string(),
                    text,
                    state,
                }
            })
            .collect()
    }

    /// The full remediation backlog across all risks, in risk id order
    #[must_use]
    pub fn backlog(&self) -> Vec<RemediationTask> {
        self.risks.values().flat_map(|risk| self.tasks_for(risk)).collect()
    }

    // ---- persisted state -------------------------------------------------

    /// The persisted remediation state
    #[must_use]
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Replace the persisted remediation state, e.g. after loading it
    pub fn set_state(&mut self, state: ModelState) {
        self.state = state;
    }

    /// Record a risk as consciously accepted
    pub fn accept_risk(
        &mut self,
        risk_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_risk_state(risk_id, Treatment::Accepted, ticket, comment)
    }

    /// Record a risk as transferred to another party
    pub fn transfer_risk(
        &mut self,
        risk_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_risk_state(risk_id, Treatment::Transferred, ticket, comment)
    }

    /// Record a risk as mitigated
    pub fn mitigate_risk(
        &mut self,
        risk_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_risk_state(risk_id, Treatment::Mitigated, ticket, comment)
    }

    /// Record a risk as a false positive
    pub fn discard_risk(
        &mut self,
        risk_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_risk_state(risk_id, Treatment::FalsePositive, ticket, comment)
    }

    fn record_risk_state(
        &mut self,
        risk_id: &str,
        treatment: Treatment,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        if !self.risks.contains_key(risk_id) {
            return Err(ModelError::UnknownRisk(risk_id.to_string()));
        }
        self.state.risks.insert(
            risk_id.to_string(),
            RiskStateRecord {
                treatment,
                ticket,
                comment,
                recorded_at: chrono::Utc::now(),
            },
        );
        Ok(())
    }

    /// Record a task as in progress
    pub fn process_task(
        &mut self,
        task_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_task_state(task_id, TaskState::InProgress, ticket, comment)
    }

    /// Record a task as closed
    pub fn close_task(
        &mut self,
        task_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_task_state(task_id, TaskState::Closed, ticket, comment)
    }

    /// Record a task as deferred
    pub fn defer_task(
        &mut self,
        task_id: &str,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        self.record_task_state(task_id, TaskState::Deferred, ticket, comment)
    }

    fn record_task_state(
        &mut self,
        task_id: &str,
        state: TaskState,
        ticket: Option<String>,
        comment: Option<String>,
    ) -> Result<(), ModelError> {
        if !self.backlog().iter().any(|task| task.id == task_id) {
            return Err(ModelError::UnknownTask(task_id.to_string()));
        }
        self.state.tasks.insert(
            task_id.to_string(),
            TaskStateRecord {
                state,
                ticket,
                comment,
                recorded_at: chrono::Utc::now(),
            },
        );
        Ok(())
    }

    // ---- diagram descriptors ---------------------------------------------

    /// One renderable node per component, in registration order
    #[must_use]
    pub fn diagram_nodes(&self) -> Vec<DiagramNode> {
        self.components
            .iter()
            .map(|(&node, component)| DiagramNode {
                id: self.tree.id(node).to_string(),
                name: component.info.name.clone(),
                shape: component.diagram_shape(),
            })
            .collect()
    }

    /// One renderable edge per data flow, in registration order
    #[must_use]
    pub fn diagram_edges(&self) -> Vec<DiagramEdge> {
        self.flows
            .values()
            .map(|flow| DiagramEdge {
                source: self.tree.id(flow.source.0).to_string(),
                destination: self.tree.id(flow.destination.0).to_string(),
                label: format!("{}: {}", flow.protocol, flow.info.name),
                bidirectional: flow.bidirectional,
            })
            .collect()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("components", &self.components.len())
            .field("flows", &self.flows.len())
            .field("risks", &self.risks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{DataFormat, Technology};
    use crate::data_flow::Protocol;
    use crate::score::Score;

    fn make_model() -> Model {
        let mut model = Model::new("Demo");
        let user = model
            .add_component(Component::actor("User").with_technology(Technology::Browser))
            .unwrap();
        let app = model
            .add_component(
                Component::process("WebApp")
                    .with_technology(Technology::WebApplication)
                    .accepts(DataFormat::Json),
            )
            .unwrap();
        let db = model
            .add_component(Component::data_store("Database").with_technology(Technology::Database))
            .unwrap();

        let asset = model
            .add_asset(Asset::new("User data", Score::MEDIUM, Score::MEDIUM, Score::LOW))
            .unwrap();
        let login = model
            .add_data_flow(DataFlow::new("Login", user, app, Protocol::Https))
            .unwrap();
        let query = model
            .add_data_flow(DataFlow::new("Query", app, db, Protocol::Sql))
            .unwrap();
        model.transfers(login, asset);
        model.transfers(query, asset);
        model
    }

    #[test]
    fn evaluation_derives_csrf_per_incoming_web_flow() {
        let mut model = make_model();
        model.evaluate().unwrap();

        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(risk.threat_id, "CAPEC-62");
        assert_eq!(risk.target, "WebApp");
        assert_eq!(risk.data_flow.as_deref(), Some("Login"));
        assert_eq!(
            risk.text,
            "Cross-Site Request Forgery (CSRF) risk at WebApp via Login from User"
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut model = make_model();
        model.evaluate().unwrap();
        let first: Vec<String> = model.risks().map(|r| r.id.clone()).collect();
        model.evaluate().unwrap();
        let second: Vec<String> = model.risks().map(|r| r.id.clone()).collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn out_of_scope_components_bear_no_risks() {
        let mut model = make_model();
        let app = model.component_by_name("WebApp").unwrap();
        model.component_mut(app).info.out_of_scope = true;
        model.evaluate().unwrap();
        assert!(model.risks().all(|r| r.target != "WebApp"));
    }

    #[test]
    fn flows_without_assets_fail_validation() {
        let mut model = make_model();
        let app = model.component_by_name("WebApp").unwrap();
        let db = model.component_by_name("Database").unwrap();
        model
            .add_data_flow(DataFlow::new("Backup", db, app, Protocol::Https))
            .unwrap();

        match model.evaluate() {
            Err(EvaluateError::Validation(failures)) => {
                assert!(failures.iter().any(|m| m.contains("Backup")));
            },
            other => panic!("expected a validation failure, got {other:?}"),
        }

        model.skip_validation = true;
        model.evaluate().unwrap();
    }

    #[test]
    fn model_is_unlocked_after_evaluation() {
        let mut model = make_model();
        model.evaluate().unwrap();
        assert!(!model.is_locked());
        assert!(model.add_component(Component::process("LateAddition")).is_ok());
    }

    #[test]
    fn locked_model_rejects_registration() {
        let mut model = make_model();
        model.lock();
        assert!(matches!(
            model.add_component(Component::process("Rejected")),
            Err(ModelError::Tree(TreeError::Locked { .. }))
        ));
        model.unlock();
    }

    #[test]
    fn accept_mitigation_resolves_to_accepted() {
        let mut model = make_model();
        model.add_mitigation(Mitigation::accept().treats("CAPEC-62@WebApp@Login")).unwrap();
        model.evaluate().unwrap();

        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::Accepted);
    }

    #[test]
    fn accept_wins_regardless_of_mitigation_order() {
        let mut model = make_model();
        model.add_mitigation(Mitigation::transfer().treats("CAPEC-62@WebApp@Login")).unwrap();
        model.add_mitigation(Mitigation::accept().treats("CAPEC-62@WebApp@Login")).unwrap();
        model.evaluate().unwrap();

        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::Accepted);
    }

    #[test]
    fn untreated_risk_is_unchecked() {
        let mut model = make_model();
        model.evaluate().unwrap();
        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::Unchecked);
    }

    #[test]
    fn closing_all_tasks_resolves_to_mitigated() {
        let mut model = make_model();
        model.evaluate().unwrap();

        let risk_id = "CAPEC-62@WebApp@Login".to_string();
        let tasks = model.tasks_for(model.risk(&risk_id).unwrap());
        assert!(!tasks.is_empty());
        let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        for task_id in &task_ids {
            model.close_task(task_id, None, None).unwrap();
        }

        let risk = model.risk(&risk_id).unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::Mitigated);
    }

    #[test]
    fn recorded_disposition_wins_over_mitigations() {
        let mut model = make_model();
        model.add_mitigation(Mitigation::accept().treats("CAPEC-62@WebApp@Login")).unwrap();
        model.evaluate().unwrap();
        model
            .discard_risk("CAPEC-62@WebApp@Login", None, Some("scanner artifact".to_string()))
            .unwrap();

        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::FalsePositive);
    }

    #[test]
    fn recorded_state_survives_re_evaluation() {
        let mut model = make_model();
        model.evaluate().unwrap();
        model.accept_risk("CAPEC-62@WebApp@Login", Some("SEC-1".to_string()), None).unwrap();
        model.evaluate().unwrap();

        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::Accepted);
    }

    #[test]
    fn treatment_override_does_not_survive_re_evaluation() {
        let mut model = make_model();
        model.evaluate().unwrap();
        model.risk_mut("CAPEC-62@WebApp@Login").unwrap().treat(Treatment::InDiscussion);
        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::InDiscussion);

        model.evaluate().unwrap();
        let risk = model.risk("CAPEC-62@WebApp@Login").unwrap();
        assert_eq!(model.treatment_of(risk), Treatment::Unchecked);
    }

    #[test]
    fn unknown_risk_and_task_ids_are_errors() {
        let mut model = make_model();
        model.evaluate().unwrap();
        assert!(matches!(
            model.accept_risk("CAPEC-1@Nothing", None, None),
            Err(ModelError::UnknownRisk(_))
        ));
        assert!(matches!(
            model.close_task("ASVS-0@CAPEC-1@Nothing", None, None),
            Err(ModelError::UnknownTask(_))
        ));
    }

    #[test]
    fn template_filter_narrows_the_backlog() {
        let mut model = make_model();
        model.evaluate().unwrap();

        // WebApp is not a REST or SOAP service, so the XSS risk must not
        // pull in the service-specific input validation templates.
        let tasks = model.tasks_for(model.risk("CAPEC-63@WebApp").unwrap());
        assert!(tasks.iter().any(|t| t.template_id == "ASVS-5.3.3"));
        assert!(tasks.iter().all(|t| t.template_id != "ASVS-13.2.1"));
        assert!(tasks.iter().all(|t| t.template_id != "ASVS-13.3.1"));
    }

    #[test]
    fn task_text_renders_the_component_name() {
        let mut model = make_model();
        model.evaluate().unwrap();
        let tasks = model.tasks_for(model.risk("CAPEC-63@WebApp").unwrap());
        let xss = tasks.iter().find(|t| t.template_id == "ASVS-5.3.3").unwrap();
        assert!(xss.text.contains("WebApp"), "unexpected task text: {}", xss.text);
    }

    #[test]
    fn duplicate_component_names_are_rejected() {
        let mut model = make_model();
        assert!(matches!(
            model.add_component(Component::process("WebApp")),
            Err(ModelError::Tree(TreeError::DuplicateId { .. }))
        ));
    }

    #[test]
    fn mitigation_preset_names_get_disambiguated() {
        let mut model = make_model();
        model.add_mitigation(Mitigation::accept().treats("a")).unwrap();
        model.add_mitigation(Mitigation::accept().treats("b")).unwrap();
        assert_eq!(model.mitigations().count(), 2);
    }

    #[test]
    fn diagram_descriptors_cover_the_graph() {
        let model = make_model();
        let nodes = model.diagram_nodes();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().any(|n| n.id == "web-app" && n.name == "WebApp"));

        let edges = model.diagram_edges();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|e| e.source == "user"
            && e.destination == "web-app"
            && e.label == "https: Login"));
    }

    #[test]
    fn boundary_crossing_follows_endpoint_membership() {
        let mut model = make_model();
        let boundary = model
            .add_trust_boundary(TrustBoundary::new("Internal"))
            .unwrap();
        let app = model.component_by_name("WebApp").unwrap();
        let db = model.component_by_name("Database").unwrap();
        model.component_mut(app).trust_boundary = Some(boundary);

        let login = model.data_flow_by_name("Login").unwrap();
        let query = model.data_flow_by_name("Query").unwrap();
        assert!(model.is_across_trust_boundary(login));
        assert!(model.is_across_trust_boundary(query));

        model.component_mut(db).trust_boundary = Some(boundary);
        assert!(!model.is_across_trust_boundary(query));
    }

    #[test]
    fn flows_are_out_of_scope_only_when_both_endpoints_are() {
        let mut model = make_model();
        let user = model.component_by_name("User").unwrap();
        let app = model.component_by_name("WebApp").unwrap();
        let login = model.data_flow_by_name("Login").unwrap();

        assert!(!model.flow_out_of_scope(login));
        model.component_mut(user).info.out_of_scope = true;
        assert!(!model.flow_out_of_scope(login));
        model.component_mut(app).info.out_of_scope = true;
        assert!(model.flow_out_of_scope(login));
    }

    #[test]
    fn after_apply_hook_sees_one_batch_per_scope() {
        use std::sync::{Arc, Mutex};

        let mut model = make_model();
        let batches: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&batches);
        model.library.set_after_apply_hook(move |risks| {
            sink.lock().unwrap().push(risks.iter().map(|r| r.id.clone()).collect());
        });
        model.evaluate().unwrap();

        let batches = batches.lock().unwrap();
        // One model-scope batch plus one batch per component.
        assert_eq!(batches.len(), 4);
        let all: Vec<&String> = batches.iter().flatten().collect();
        assert!(all.iter().any(|id| *id == "CAPEC-62@WebApp@Login"));
    }

    #[test]
    fn excluded_rules_do_not_fire() {
        let mut model = make_model();
        model.library.excludes.insert("CAPEC-62".to_string());
        model.evaluate().unwrap();
        assert!(model.risks().all(|r| r.threat_id != "CAPEC-62"));
    }
}

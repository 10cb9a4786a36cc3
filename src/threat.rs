//! Threat rules and the rule library
//!
//! A threat is a parametrized predicate/derivation pair. Rules come in two
//! scopes, kept as a closed tagged enum instead of a polymorphic class
//! hierarchy: [`ComponentThreat`] rules range over one component at a time
//! (and may fire once per qualifying data flow), [`ModelThreat`] rules fire
//! at most once per evaluation against the model itself. The split keeps the
//! dispatch loop O(components x rules) with a clean per-rule contract.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace};
use thiserror::Error;

use crate::element::{ComponentId, FlowId};
use crate::model::Model;
use crate::risk::{Impact, Likelihood, Risk, Severity};
use crate::task::TaskTemplate;

/// CAPEC attack mechanism categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Category {
    /// Deceive a target into trusting the wrong principal (CAPEC-156)
    EngageInDeceptiveInteractions,
    /// Abuse functions of the application itself (CAPEC-210)
    AbuseExistingFunctionality,
    /// Exploit characteristics of system data structures (CAPEC-255)
    ManipulateDataStructures,
    /// Manipulate one or more system resources (CAPEC-262)
    ManipulateSystemResources,
    /// Control behavior through crafted input or injected code (CAPEC-152)
    InjectUnexpectedItems,
    /// Exploit rare conditions via probabilistic techniques (CAPEC-223)
    EmployProbabilisticTechniques,
    /// Exploit weaknesses in timing or state keeping (CAPEC-172)
    ManipulateTimingAndState,
    /// Gather and steal information (CAPEC-118)
    CollectAndAnalyzeInformation,
    /// Exploit identity, authentication, and authorization handling (CAPEC-225)
    SubvertAccessControl,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EngageInDeceptiveInteractions => "Engage in Deceptive Interactions",
            Self::AbuseExistingFunctionality => "Abuse Existing Functionality",
            Self::ManipulateDataStructures => "Manipulate Data Structures",
            Self::ManipulateSystemResources => "Manipulate System Resources",
            Self::InjectUnexpectedItems => "Inject Unexpected Items",
            Self::EmployProbabilisticTechniques => "Employ Probabilistic Techniques",
            Self::ManipulateTimingAndState => "Manipulate Timing and State",
            Self::CollectAndAnalyzeInformation => "Collect and Analyze Information",
            Self::SubvertAccessControl => "Subvert Access Control",
        };
        write!(f, "{s}")
    }
}

/// A failure inside a rule's derivation closure
///
/// Derivation failures are never swallowed: they abort the whole evaluation
/// pass, since a partial risk set is worse than a clear failure.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DeriveError(pub String);

/// Errors from applying the library
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A rule's derivation closure failed
    #[error("threat rule `{threat_id}` failed during derivation: {source}")]
    Derivation {
        /// Id of the failing rule
        threat_id: String,
        /// The underlying failure
        source: DeriveError,
    },
}

/// Static rule metadata shared by both rule scopes
#[derive(Debug, Clone)]
pub struct ThreatMeta {
    /// Stable rule id, e.g. `CAPEC-62`
    pub id: String,
    /// Rule name
    pub name: String,
    /// Attack category
    pub category: Category,
    /// Long description
    pub description: String,
    /// Attack prerequisites
    pub prerequisites: Vec<String>,
    /// Risk text template; see [`render_risk_text`] for placeholders
    pub risk_text: String,
    /// Related CWE ids
    pub cwe_ids: Vec<u32>,
    /// External references
    pub references: Vec<String>,
    /// Default impact fed into the severity matrix
    pub impact: Impact,
    /// Default likelihood fed into the severity matrix
    pub likelihood: Likelihood,
    /// Fixed severity bypassing the matrix, when set
    pub fix_severity: Option<Severity>,
}

impl ThreatMeta {
    /// Create metadata with medium/likely severity inputs
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            prerequisites: Vec::new(),
            risk_text: String::new(),
            cwe_ids: Vec::new(),
            references: Vec::new(),
            impact: Impact::Medium,
            likelihood: Likelihood::Likely,
            fix_severity: None,
        }
    }

    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the prerequisites
    #[must_use]
    pub fn prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    /// Set the risk text template
    #[must_use]
    pub fn risk_text(mut self, template: impl Into<String>) -> Self {
        self.risk_text = template.into();
        self
    }

    /// Set the related CWE ids
    #[must_use]
    pub fn cwe_ids(mut self, cwe_ids: impl IntoIterator<Item = u32>) -> Self {
        self.cwe_ids = cwe_ids.into_iter().collect();
        self
    }

    /// Add an external reference
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    /// Set the severity matrix inputs
    #[must_use]
    pub const fn rated(mut self, impact: Impact, likelihood: Likelihood) -> Self {
        self.impact = impact;
        self.likelihood = likelihood;
        self
    }

    /// Fix the severity, bypassing the matrix
    #[must_use]
    pub const fn fixed_severity(mut self, severity: Severity) -> Self {
        self.fix_severity = Some(severity);
        self
    }

    fn severity(&self) -> Severity {
        self.fix_severity
            .unwrap_or_else(|| Severity::from_matrix(self.impact, self.likelihood))
    }

    fn references_with_cwe_links(&self) -> Vec<String> {
        let mut refs = self.references.clone();
        refs.extend(
            self.cwe_ids
                .iter()
                .map(|cwe| format!("https://cwe.mitre.org/data/definitions/{cwe}.html")),
        );
        refs
    }
}

/// One firing of a component-scoped rule
#[derive(Debug, Clone, Copy)]
pub struct Incident {
    /// The qualifying data flow, when the rule fired per flow
    pub data_flow: Option<FlowId>,
}

impl Incident {
    /// The rule fired against the component itself
    #[must_use]
    pub const fn component() -> Self {
        Self { data_flow: None }
    }

    /// The rule fired for one qualifying data flow
    #[must_use]
    pub const fn via(flow: FlowId) -> Self {
        Self {
            data_flow: Some(flow),
        }
    }
}

type ComponentDerive =
    Box<dyn Fn(&Model, ComponentId) -> Result<Vec<Incident>, DeriveError> + Send + Sync>;
type ModelDerive = Box<dyn Fn(&Model) -> Result<bool, DeriveError> + Send + Sync>;
type TemplateFilter = Box<dyn Fn(&Model, ComponentId, &TaskTemplate) -> bool + Send + Sync>;
type AfterApplyHook = Box<dyn Fn(&[Risk]) + Send + Sync>;

/// A rule ranging over single components
pub struct ComponentThreat {
    /// Static rule metadata
    pub meta: ThreatMeta,
    derive: ComponentDerive,
    template_filter: Option<TemplateFilter>,
}

impl ComponentThreat {
    /// Create a component-scoped rule from metadata and a derivation closure
    #[must_use]
    pub fn new<F>(meta: ThreatMeta, derive: F) -> Self
    where
        F: Fn(&Model, ComponentId) -> Result<Vec<Incident>, DeriveError> + Send + Sync + 'static,
    {
        Self {
            meta,
            derive: Box::new(derive),
            template_filter: None,
        }
    }

    /// Restrict which remediation-task templates apply per component
    #[must_use]
    pub fn with_template_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Model, ComponentId, &TaskTemplate) -> bool + Send + Sync + 'static,
    {
        self.template_filter = Some(Box::new(filter));
        self
    }

    /// Whether the rule applies to the component at all
    ///
    /// Out-of-scope components never bear component risks.
    #[must_use]
    pub fn is_applicable(&self, model: &Model, component: ComponentId) -> bool {
        !model.component(component).info.out_of_scope
    }

    /// Run the derivation closure, producing zero or more incidents
    pub fn derive(
        &self,
        model: &Model,
        component: ComponentId,
    ) -> Result<Vec<Incident>, DeriveError> {
        (self.derive)(model, component)
    }

    /// Select the CWE-matched templates that apply to this component
    #[must_use]
    pub fn task_templates<'a>(
        &self,
        model: &Model,
        component: ComponentId,
        templates: &'a [&'a TaskTemplate],
    ) -> Vec<&'a TaskTemplate> {
        templates
            .iter()
            .copied()
            .filter(|tpl| {
                self.template_filter.as_ref().is_none_or(|f| f(model, component, tpl))
            })
            .collect()
    }
}

impl std::fmt::Debug for ComponentThreat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentThreat").field("meta", &self.meta).finish_non_exhaustive()
    }
}

/// A rule ranging over the model as a whole
pub struct ModelThreat {
    /// Static rule metadata
    pub meta: ThreatMeta,
    derive: ModelDerive,
}

impl ModelThreat {
    /// Create a model-scoped rule; the closure decides whether it fires
    #[must_use]
    pub fn new<F>(meta: ThreatMeta, derive: F) -> Self
    where
        F: Fn(&Model) -> Result<bool, DeriveError> + Send + Sync + 'static,
    {
        Self {
            meta,
            derive: Box::new(derive),
        }
    }

    /// Run the derivation closure
    pub fn derive(&self, model: &Model) -> Result<bool, DeriveError> {
        (self.derive)(model)
    }
}

impl std::fmt::Debug for ModelThreat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelThreat").field("meta", &self.meta).finish_non_exhaustive()
    }
}

/// Rule scope as a closed tagged enum
#[derive(Debug)]
pub enum Threat {
    /// Applies per component
    Component(ComponentThreat),
    /// Applies once per evaluation
    Model(ModelThreat),
}

impl Threat {
    /// Static metadata of the rule
    #[must_use]
    pub const fn meta(&self) -> &ThreatMeta {
        match self {
            Self::Component(t) => &t.meta,
            Self::Model(t) => &t.meta,
        }
    }

    /// Stable rule id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta().id
    }
}

/// Registry of threat rules keyed by id
///
/// There is no process-wide default instance; construct a library (usually
/// via [`crate::catalog::default_library`]) and hand it to the model.
pub struct ThreatLibrary {
    threats: BTreeMap<String, Threat>,
    /// Rule ids excluded from evaluation
    pub excludes: BTreeSet<String>,
    after_apply: Option<AfterApplyHook>,
}

impl ThreatLibrary {
    /// Create an empty library
    #[must_use]
    pub fn new() -> Self {
        Self {
            threats: BTreeMap::new(),
            excludes: BTreeSet::new(),
            after_apply: None,
        }
    }

    /// Insert rules, overwriting by id
    pub fn add_threats(&mut self, threats: impl IntoIterator<Item = Threat>) {
        for threat in threats {
            self.threats.insert(threat.id().to_string(), threat);
        }
    }

    /// Look up a rule by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Threat> {
        self.threats.get(id)
    }

    /// Iterate rules in id order
    pub fn iter(&self) -> impl Iterator<Item = &Threat> {
        self.threats.values()
    }

    /// Number of registered rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.threats.len()
    }

    /// Whether the library holds no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threats.is_empty()
    }

    /// Install a hook receiving each batch of newly produced risks
    pub fn set_after_apply_hook<F>(&mut self, hook: F)
    where
        F: Fn(&[Risk]) + Send + Sync + 'static,
    {
        self.after_apply = Some(Box::new(hook));
    }

    /// Apply the library against one component, or against the model
    ///
    /// With `Some(component)`, every non-excluded component-scoped rule that
    /// applies to the (in-scope) component runs and may yield one risk per
    /// qualifying incident. With `None`, every non-excluded model-scoped
    /// rule runs once.
    pub fn apply(
        &self,
        model: &Model,
        component: Option<ComponentId>,
    ) -> Result<Vec<Risk>, ApplyError> {
        let mut risks = Vec::new();

        for threat in self.threats.values() {
            if self.excludes.contains(threat.id()) {
                trace!("skipping excluded rule {}", threat.id());
                continue;
            }

            match (threat, component) {
                (Threat::Component(rule), Some(c)) => {
                    if !rule.is_applicable(model, c) {
                        continue;
                    }
                    let incidents =
                        rule.derive(model, c).map_err(|source| ApplyError::Derivation {
                            threat_id: rule.meta.id.clone(),
                            source,
                        })?;
                    for incident in incidents {
                        risks.push(component_risk(&rule.meta, model, c, incident.data_flow));
                    }
                },
                (Threat::Model(rule), None) => {
                    let fired = rule.derive(model).map_err(|source| ApplyError::Derivation {
                        threat_id: rule.meta.id.clone(),
                        source,
                    })?;
                    if fired {
                        risks.push(model_risk(&rule.meta, model));
                    }
                },
                _ => {},
            }
        }

        debug!(
            "library produced {} risk(s) for {}",
            risks.len(),
            component.map_or_else(|| "model scope".to_string(), |c| model.component(c).info.name.clone())
        );

        if let Some(hook) = &self.after_apply {
            hook(&risks);
        }

        Ok(risks)
    }
}

impl Default for ThreatLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreatLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreatLibrary")
            .field("threats", &self.threats)
            .field("excludes", &self.excludes)
            .finish_non_exhaustive()
    }
}

fn component_risk(
    meta: &ThreatMeta,
    model: &Model,
    component: ComponentId,
    data_flow: Option<FlowId>,
) -> Risk {
    let target = model.component(component).info.name.clone();
    let flow_name = data_flow.map(|f| model.data_flow(f).info.name.clone());

    let id = flow_name.as_ref().map_or_else(
        || format!("{}@{}", meta.id, target),
        |flow| format!("{}@{}@{}", meta.id, target, flow),
    );

    Risk {
        id,
        threat_id: meta.id.clone(),
        name: meta.name.clone(),
        category: meta.category,
        description: meta.description.clone(),
        text: render_risk_text(&meta.risk_text, model, Some(component), data_flow),
        target,
        data_flow: flow_name,
        impact: meta.impact,
        likelihood: meta.likelihood,
        severity: meta.severity(),
        cwe_ids: meta.cwe_ids.clone(),
        references: meta.references_with_cwe_links(),
        treatment_override: None,
        mitigation_ids: Vec::new(),
    }
}

fn model_risk(meta: &ThreatMeta, model: &Model) -> Risk {
    Risk {
        id: format!("{}@model", meta.id),
        threat_id: meta.id.clone(),
        name: meta.name.clone(),
        category: meta.category,
        description: meta.description.clone(),
        text: render_risk_text(&meta.risk_text, model, None, None),
        target: model.name.clone(),
        data_flow: None,
        impact: meta.impact,
        likelihood: meta.likelihood,
        severity: meta.severity(),
        cwe_ids: meta.cwe_ids.clone(),
        references: meta.references_with_cwe_links(),
        treatment_override: None,
        mitigation_ids: Vec::new(),
    }
}

/// Render a risk/task text template
///
/// Placeholders: `{component}`, `{data_flow}`, `{data_flow.source}`,
/// `{data_flow.destination}`, and `{model}`, each resolved to the element's
/// name. Longer placeholders are substituted first.
#[must_use]
pub fn render_risk_text(
    template: &str,
    model: &Model,
    component: Option<ComponentId>,
    data_flow: Option<FlowId>,
) -> String {
    let mut text = template.to_string();

    if let Some(flow) = data_flow {
        let flow = model.data_flow(flow);
        text = text.replace("{data_flow.source}", &model.component(flow.source).info.name);
        text = text
            .replace("{data_flow.destination}", &model.component(flow.destination).info.name);
        text = text.replace("{data_flow}", &flow.info.name);
    }
    if let Some(c) = component {
        text = text.replace("{component}", &model.component(c).info.name);
    }
    text.replace("{model}", &model.name)
}

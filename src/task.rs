//! Remediation tasks and their CWE-indexed template repository
//!
//! A remediation task is a concrete, actionable backlog item derived from a
//! risk via a template. Templates are matched to risks by shared CWE ids; a
//! rule may additionally filter which templates fit a given component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lookup failure in the template repository
#[derive(Debug, Error)]
#[error("no task template with id `{0}`")]
pub struct TemplateLookupError(pub String);

/// Lifecycle state of a remediation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Derived but not started
    #[default]
    Open,
    /// Being worked on
    InProgress,
    /// Done
    Closed,
    /// Consciously postponed
    Deferred,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Closed => "closed",
            Self::Deferred => "deferred",
        };
        write!(f, "{s}")
    }
}

/// A reusable, CWE-indexed remediation template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Stable template id (ASVS-style)
    pub id: String,
    /// Top-level category
    pub category: String,
    /// Finer-grained category; empty means "same as category"
    #[serde(default)]
    pub sub_category: String,
    /// What the template addresses
    pub description: String,
    /// Feature name for backlog tooling
    #[serde(default)]
    pub feature_name: String,
    /// Templated user-story text; see [`crate::threat::render_risk_text`]
    #[serde(default)]
    pub user_story: String,
    /// Given/when/then scenarios keyed by name
    #[serde(default)]
    pub scenarios: BTreeMap<String, String>,
    /// External references
    #[serde(default)]
    pub references: Vec<String>,
    /// CWE ids this template remediates
    #[serde(default)]
    pub cwe_ids: Vec<u32>,
    /// Related NIST controls
    #[serde(default)]
    pub nist: Vec<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TaskTemplate {
    /// The finer-grained category, falling back to the category
    #[must_use]
    pub fn sub_category(&self) -> &str {
        if self.sub_category.is_empty() {
            &self.category
        } else {
            &self.sub_category
        }
    }
}

/// Repository of task templates keyed by id
#[derive(Debug, Clone, Default)]
pub struct TaskTemplateRepository {
    templates: BTreeMap<String, TaskTemplate>,
}

impl TaskTemplateRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a repository from a JSON array of templates
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let templates: Vec<TaskTemplate> = serde_json::from_str(json)?;
        let mut repository = Self::new();
        repository.add_templates(templates);
        Ok(repository)
    }

    /// The built-in template set shipped with the crate
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_json(include_str!("templates/task_templates.json"))
            .unwrap_or_else(|e| unreachable!("built-in task templates must parse: {e}"))
    }

    /// Insert templates, overwriting by id
    pub fn add_templates(&mut self, templates: impl IntoIterator<Item = TaskTemplate>) {
        for template in templates {
            self.templates.insert(template.id.clone(), template);
        }
    }

    /// Look up a template by id
    pub fn get_by_id(&self, id: &str) -> Result<&TaskTemplate, TemplateLookupError> {
        self.templates.get(id).ok_or_else(|| TemplateLookupError(id.to_string()))
    }

    /// All templates in id order
    #[must_use]
    pub fn get_all(&self) -> Vec<&TaskTemplate> {
        self.templates.values().collect()
    }

    /// All templates sharing at least one of the given CWE ids
    #[must_use]
    pub fn get_by_cwe(&self, cwe_ids: &[u32]) -> Vec<&TaskTemplate> {
        self.templates
            .values()
            .filter(|tpl| tpl.cwe_ids.iter().any(|id| cwe_ids.contains(id)))
            .collect()
    }

    /// Number of templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the repository is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A backlog item derived from one risk via one template
#[derive(Debug, Clone, Serialize)]
pub struct RemediationTask {
    /// Composite identity: `template_id@risk_id`
    pub id: String,
    /// The risk this task remediates
    pub risk_id: String,
    /// The template the task was derived from
    pub template_id: String,
    /// Finer-grained category for backlog grouping
    pub sub_category: String,
    /// Rendered task text
    pub text: String,
    /// Current lifecycle state (from the persisted state map)
    pub state: TaskState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_parse_and_index_by_cwe() {
        let repo = TaskTemplateRepository::builtin();
        assert!(!repo.is_empty());

        // CSRF templates are indexed under CWE-352
        let csrf = repo.get_by_cwe(&[352]);
        assert!(!csrf.is_empty());
        for tpl in csrf {
            assert!(tpl.cwe_ids.contains(&352));
        }
    }

    #[test]
    fn unknown_template_id_is_a_lookup_error() {
        let repo = TaskTemplateRepository::builtin();
        assert!(repo.get_by_id("no-such-template").is_err());
    }

    #[test]
    fn sub_category_falls_back_to_category() {
        let tpl = TaskTemplate {
            id: "T-1".to_string(),
            category: "Validation".to_string(),
            sub_category: String::new(),
            description: "d".to_string(),
            feature_name: String::new(),
            user_story: String::new(),
            scenarios: BTreeMap::new(),
            references: Vec::new(),
            cwe_ids: Vec::new(),
            nist: Vec::new(),
            tags: Vec::new(),
        };
        assert_eq!(tpl.sub_category(), "Validation");
    }
}

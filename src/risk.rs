//! Risks, severity, treatment, and mitigations
//!
//! A risk is a derived fact: threat rule x target component, optionally
//! narrowed to one data flow. Its identity is the composite key
//! `threat_id@target[@data_flow]`, never a surrogate, so re-evaluating an
//! unchanged model reproduces the same identities.

use serde::{Deserialize, Serialize};

use crate::element::{ElementInfo, MitigationId};
use crate::threat::Category;

/// Impact of a successful attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Impact {
    /// Low impact
    Low,
    /// Medium impact
    Medium,
    /// High impact
    High,
    /// Very high impact
    VeryHigh,
}

impl Impact {
    const fn weight(self) -> u32 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        };
        write!(f, "{s}")
    }
}

/// Likelihood of a successful attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Likelihood {
    /// Unlikely
    Unlikely,
    /// Likely
    Likely,
    /// Very likely
    VeryLikely,
    /// Frequent
    Frequent,
}

impl Likelihood {
    const fn weight(self) -> u32 {
        match self {
            Self::Unlikely => 1,
            Self::Likely => 2,
            Self::VeryLikely => 3,
            Self::Frequent => 4,
        }
    }
}

impl std::fmt::Display for Likelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unlikely => "unlikely",
            Self::Likely => "likely",
            Self::VeryLikely => "very-likely",
            Self::Frequent => "frequent",
        };
        write!(f, "{s}")
    }
}

/// Severity band of a risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// Elevated severity
    Elevated,
    /// High severity
    High,
    /// Critical severity
    Critical,
}

impl Severity {
    /// Deterministic table lookup from impact and likelihood
    ///
    /// The product of the two weights maps onto non-linear bands. Band
    /// boundaries are fixed for compatibility with existing reports.
    #[must_use]
    pub const fn from_matrix(impact: Impact, likelihood: Likelihood) -> Self {
        let score = impact.weight() * likelihood.weight();
        match score {
            0..=1 => Self::Low,
            2..=3 => Self::Medium,
            4..=8 => Self::Elevated,
            9..=12 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Elevated => "elevated",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Remediation disposition of a risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Treatment {
    /// Not yet looked at
    #[default]
    Unchecked,
    /// Under discussion
    InDiscussion,
    /// Remediation in progress
    InProgress,
    /// Remediated
    Mitigated,
    /// Transferred to another party
    Transferred,
    /// Avoided by changing the design
    Avoided,
    /// Consciously accepted
    Accepted,
    /// Determined not to be a real risk
    FalsePositive,
}

impl std::fmt::Display for Treatment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unchecked => "unchecked",
            Self::InDiscussion => "in-discussion",
            Self::InProgress => "in-progress",
            Self::Mitigated => "mitigated",
            Self::Transferred => "transferred",
            Self::Avoided => "avoided",
            Self::Accepted => "accepted",
            Self::FalsePositive => "false-positive",
        };
        write!(f, "{s}")
    }
}

/// A derived security risk
///
/// Risks are rebuilt from scratch on every evaluation pass; only their
/// identity is stable. Treatment is resolved by the owning model from
/// attached mitigations, derived remediation tasks, and recorded state.
#[derive(Debug, Clone)]
pub struct Risk {
    /// Composite identity: `threat_id@target[@data_flow]`
    pub id: String,
    /// Id of the rule that derived this risk
    pub threat_id: String,
    /// Rule name
    pub name: String,
    /// CAPEC attack category
    pub category: Category,
    /// Rule description
    pub description: String,
    /// Rendered risk text
    pub text: String,
    /// Name of the targeted component, or the model name for model risks
    pub target: String,
    /// Name of the qualifying data flow, if the rule fired per flow
    pub data_flow: Option<String>,
    /// Impact used for severity
    pub impact: Impact,
    /// Likelihood used for severity
    pub likelihood: Likelihood,
    /// Derived (or rule-fixed) severity
    pub severity: Severity,
    /// CWE ids carried over from the rule
    pub cwe_ids: Vec<u32>,
    /// References: rule references plus CWE definition links
    pub references: Vec<String>,
    pub(crate) treatment_override: Option<Treatment>,
    pub(crate) mitigation_ids: Vec<MitigationId>,
}

impl Risk {
    /// Override the computed treatment for this risk object
    ///
    /// The override lives on the risk object only; it does not survive a
    /// rebuild of the risk set. Use the model's persisted state operations
    /// for dispositions that must outlive re-evaluation.
    pub fn treat(&mut self, treatment: Treatment) {
        self.treatment_override = Some(treatment);
    }

    /// Mitigations attached during the last evaluation pass
    #[must_use]
    pub fn mitigation_ids(&self) -> &[MitigationId] {
        &self.mitigation_ids
    }
}

/// How a mitigation disposes the risks it treats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MitigationKind {
    /// A real countermeasure reducing the risk
    Countermeasure,
    /// Conscious acceptance of the risk
    Accept,
    /// Transfer of the risk to another party
    Transfer,
    /// The risk was determined not to apply
    FalsePositive,
}

/// An applied remediation action
///
/// A mitigation treats risks by id, not by reference, so one authored before
/// an evaluation pass still applies after the risk objects are rebuilt.
#[derive(Debug, Clone)]
pub struct Mitigation {
    /// Shared element state (name, description, tags)
    pub info: ElementInfo,
    /// Disposition this mitigation implies
    pub kind: MitigationKind,
    /// Risk reduction in percent (0..=100)
    pub risk_reduction: u8,
    pub(crate) treats: Vec<String>,
}

impl Mitigation {
    /// Create a countermeasure with the given risk reduction
    #[must_use]
    pub fn new(name: impl Into<String>, risk_reduction: u8) -> Self {
        Self {
            info: ElementInfo::new(name),
            kind: MitigationKind::Countermeasure,
            risk_reduction,
            treats: Vec::new(),
        }
    }

    /// Preset: accept the risk (full reduction)
    #[must_use]
    pub fn accept() -> Self {
        Self {
            info: ElementInfo::new("Accept risk"),
            kind: MitigationKind::Accept,
            risk_reduction: 100,
            treats: Vec::new(),
        }
    }

    /// Preset: transfer the risk (full reduction)
    #[must_use]
    pub fn transfer() -> Self {
        Self {
            info: ElementInfo::new("Transfer risk"),
            kind: MitigationKind::Transfer,
            risk_reduction: 100,
            treats: Vec::new(),
        }
    }

    /// Preset: mark the risk a false positive (full reduction)
    #[must_use]
    pub fn false_positive() -> Self {
        Self {
            info: ElementInfo::new("False positive"),
            kind: MitigationKind::FalsePositive,
            risk_reduction: 100,
            treats: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    /// Declare that this mitigation treats the given risk id
    #[must_use]
    pub fn treats(mut self, risk_id: impl Into<String>) -> Self {
        let id = risk_id.into();
        if !self.treats.contains(&id) {
            self.treats.push(id);
        }
        self
    }

    /// The risk ids this mitigation treats
    #[must_use]
    pub fn treated_risk_ids(&self) -> &[String] {
        &self.treats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_band_boundaries() {
        assert_eq!(Severity::from_matrix(Impact::Low, Likelihood::Unlikely), Severity::Low);
        assert_eq!(Severity::from_matrix(Impact::Low, Likelihood::Likely), Severity::Medium);
        assert_eq!(Severity::from_matrix(Impact::Medium, Likelihood::Likely), Severity::Elevated);
        assert_eq!(Severity::from_matrix(Impact::VeryHigh, Likelihood::Likely), Severity::Elevated);
        assert_eq!(Severity::from_matrix(Impact::High, Likelihood::VeryLikely), Severity::High);
        assert_eq!(Severity::from_matrix(Impact::VeryHigh, Likelihood::VeryLikely), Severity::High);
        assert_eq!(
            Severity::from_matrix(Impact::VeryHigh, Likelihood::Frequent),
            Severity::Critical
        );
    }

    #[test]
    fn severity_is_monotone_in_impact_and_likelihood() {
        let impacts = [Impact::Low, Impact::Medium, Impact::High, Impact::VeryHigh];
        let likelihoods = [
            Likelihood::Unlikely,
            Likelihood::Likely,
            Likelihood::VeryLikely,
            Likelihood::Frequent,
        ];

        for &l in &likelihoods {
            for pair in impacts.windows(2) {
                assert!(
                    Severity::from_matrix(pair[0], l) <= Severity::from_matrix(pair[1], l),
                    "impact monotonicity violated at {:?}/{l:?}",
                    pair[1]
                );
            }
        }
        for &i in &impacts {
            for pair in likelihoods.windows(2) {
                assert!(
                    Severity::from_matrix(i, pair[0]) <= Severity::from_matrix(i, pair[1]),
                    "likelihood monotonicity violated at {i:?}/{:?}",
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn presets_carry_full_reduction() {
        assert_eq!(Mitigation::accept().risk_reduction, 100);
        assert_eq!(Mitigation::transfer().risk_reduction, 100);
        assert_eq!(Mitigation::false_positive().risk_reduction, 100);
    }

    #[test]
    fn treats_is_a_set() {
        let m = Mitigation::accept().treats("CAPEC-62@WebApp").treats("CAPEC-62@WebApp");
        assert_eq!(m.treated_risk_ids().len(), 1);
    }
}

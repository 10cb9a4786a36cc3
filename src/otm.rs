//! Open Threat Model export
//!
//! Serializes a model into an OTM-style JSON document, version `"0.1.0"`.
//! The export is a one-way snapshot of the last evaluation pass; it is not
//! read back.

use serde::Serialize;

use crate::model::Model;

/// The OTM document version this export produces
pub const OTM_VERSION: &str = "0.1.0";

/// An OTM-style document
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Otm {
    /// Document format version
    pub otm_version: String,
    /// Project header
    pub project: OtmProject,
    /// Exported assets
    pub assets: Vec<OtmAsset>,
    /// Exported components
    pub components: Vec<OtmComponent>,
    /// Exported data flows
    pub dataflows: Vec<OtmDataFlow>,
    /// Risks from the last evaluation pass
    pub threats: Vec<OtmThreat>,
    /// Registered mitigations
    pub mitigations: Vec<OtmMitigation>,
}

/// Project header section
#[derive(Debug, Serialize)]
pub struct OtmProject {
    /// Construct id of the model
    pub id: String,
    /// Model name
    pub name: String,
    /// Model description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Asset protection requirements
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OtmAssetRisk {
    /// Confidentiality score
    pub confidentiality: u32,
    /// Integrity score
    pub integrity: u32,
    /// Availability score
    pub availability: u32,
}

/// One exported asset
#[derive(Debug, Serialize)]
pub struct OtmAsset {
    /// Construct id
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Protection requirements
    pub risk: OtmAssetRisk,
}

/// One exported component
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtmComponent {
    /// Construct id
    pub id: String,
    /// Display name
    pub name: String,
    /// Component variant
    #[serde(rename = "type")]
    pub kind: String,
    /// Description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Free-form tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// One exported data flow
#[derive(Debug, Serialize)]
pub struct OtmDataFlow {
    /// Construct id
    pub id: String,
    /// Display name
    pub name: String,
    /// Construct id of the sending component
    pub source: String,
    /// Construct id of the receiving component
    pub destination: String,
    /// Whether data travels both ways
    pub bidirectional: bool,
    /// Construct ids of the transferred assets
    pub assets: Vec<String>,
}

/// Severity inputs of an exported threat
#[derive(Debug, Serialize)]
pub struct OtmThreatRisk {
    /// Impact fed into the severity matrix
    pub impact: String,
    /// Likelihood fed into the severity matrix
    pub likelihood: String,
    /// Resulting severity band
    pub severity: String,
}

/// One exported threat (a derived risk)
#[derive(Debug, Serialize)]
pub struct OtmThreat {
    /// Composite risk id
    pub id: String,
    /// Rule name
    pub name: String,
    /// Rendered risk text
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Attack categories
    pub categories: Vec<String>,
    /// Related CWE ids
    pub cwes: Vec<u32>,
    /// Severity inputs and band
    pub risk: OtmThreatRisk,
}

/// One exported mitigation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtmMitigation {
    /// Construct id
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Risk reduction in percent
    pub risk_reduction: u8,
    /// Risk ids this mitigation treats
    pub attacks: Vec<String>,
}

impl Otm {
    /// Build the export snapshot from a model
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        let assets = model
            .assets()
            .map(|(id, asset)| OtmAsset {
                id: model.construct_id(id.0).to_string(),
                name: asset.info.name.clone(),
                description: asset.info.description.clone(),
                risk: OtmAssetRisk {
                    confidentiality: asset.confidentiality.value(),
                    integrity: asset.integrity.value(),
                    availability: asset.availability.value(),
                },
            })
            .collect();

        let components = model
            .components()
            .map(|(id, component)| OtmComponent {
                id: model.construct_id(id.0).to_string(),
                name: component.info.name.clone(),
                kind: component.kind.to_string(),
                description: component.info.description.clone(),
                tags: component.info.tags.iter().cloned().collect(),
            })
            .collect();

        let dataflows = model
            .data_flows()
            .map(|(id, flow)| OtmDataFlow {
                id: model.construct_id(id.0).to_string(),
                name: flow.info.name.clone(),
                source: model.construct_id(flow.source.0).to_string(),
                destination: model.construct_id(flow.destination.0).to_string(),
                bidirectional: flow.bidirectional,
                assets: flow
                    .assets()
                    .iter()
                    .map(|a| model.construct_id(a.0).to_string())
                    .collect(),
            })
            .collect();

        let threats = model
            .risks()
            .map(|risk| OtmThreat {
                id: risk.id.clone(),
                name: risk.name.clone(),
                description: risk.text.clone(),
                categories: vec![risk.category.to_string()],
                cwes: risk.cwe_ids.clone(),
                risk: OtmThreatRisk {
                    impact: risk.impact.to_string(),
                    likelihood: risk.likelihood.to_string(),
                    severity: risk.severity.to_string(),
                },
            })
            .collect();

        let mitigations = model
            .mitigations()
            .map(|(id, mitigation)| OtmMitigation {
                id: model.construct_id(id.0).to_string(),
                name: mitigation.info.name.clone(),
                description: mitigation.info.description.clone(),
                risk_reduction: mitigation.risk_reduction,
                attacks: mitigation.treated_risk_ids().to_vec(),
            })
            .collect();

        Self {
            otm_version: OTM_VERSION.to_string(),
            project: OtmProject {
                id: crate::tree::kebab_case(&model.name),
                name: model.name.clone(),
                description: model.description.clone(),
            },
            assets,
            components,
            dataflows,
            threats,
            mitigations,
        }
    }

    /// Serialize the document as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Model {
    /// Export the model as an OTM-style document
    #[must_use]
    pub fn otm(&self) -> Otm {
        Otm::from_model(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use crate::component::{Component, Technology};
    use crate::data_flow::{DataFlow, Protocol};
    use crate::score::Score;

    fn make_model() -> Model {
        let mut model = Model::new("Online Shop").with_description("storefront");
        let user = model.add_component(Component::actor("User")).unwrap();
        let app = model
            .add_component(
                Component::process("WebApp").with_technology(Technology::WebApplication),
            )
            .unwrap();
        let asset = model
            .add_asset(Asset::new("Orders", Score::HIGH, Score::HIGH, Score::MEDIUM))
            .unwrap();
        let flow = model
            .add_data_flow(DataFlow::new("WebTraffic", user, app, Protocol::Https))
            .unwrap();
        model.transfers(flow, asset);
        model.evaluate().unwrap();
        model
    }

    #[test]
    fn export_carries_the_document_version() {
        let otm = make_model().otm();
        assert_eq!(otm.otm_version, OTM_VERSION);
        assert_eq!(otm.project.name, "Online Shop");
        assert_eq!(otm.project.id, "online-shop");
    }

    #[test]
    fn export_links_flows_by_construct_id() {
        let otm = make_model().otm();
        assert_eq!(otm.dataflows.len(), 1);
        let flow = &otm.dataflows[0];
        assert_eq!(flow.source, "user");
        assert_eq!(flow.destination, "web-app");
        assert_eq!(flow.assets, vec!["orders".to_string()]);
    }

    #[test]
    fn export_serializes_with_camel_case_keys() {
        let json = make_model().otm().to_json().unwrap();
        assert!(json.contains("\"otmVersion\": \"0.1.0\""));
        assert!(json.contains("\"dataflows\""));
    }

    #[test]
    fn export_snapshots_the_risk_set() {
        let model = make_model();
        let otm = model.otm();
        assert_eq!(otm.threats.len(), model.risks().count());
        assert!(otm.threats.iter().any(|t| t.id == "CAPEC-62@WebApp@WebTraffic"));
    }
}

//! TOML model definitions
//!
//! A model can be authored declaratively in a TOML file and built into a
//! [`Model`]. Elements reference each other by display name; references are
//! resolved while building, so a dangling name is a definition error, not a
//! panic later.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::asset::Asset;
use crate::component::{Component, ComponentKind, DataFormat, Encryption, Machine, Technology};
use crate::data_flow::{Authentication, Authorization, DataFlow, Protocol};
use crate::element::{AssetId, BoundaryId, ComponentId};
use crate::model::{Model, ModelError};
use crate::score::{Score, ScoreOutOfRange};
use crate::trust_boundary::TrustBoundary;

/// Errors raised while loading or building a model definition
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Reading the definition file failed
    #[error("failed to read model definition `{path}`: {source}")]
    Io {
        /// Path of the definition file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The definition file holds invalid TOML
    #[error("invalid model definition: {0}")]
    Parse(#[from] toml::de::Error),

    /// A protection score is outside 0..=100
    #[error("asset `{asset}`: {source}")]
    Score {
        /// Name of the offending asset
        asset: String,
        /// Underlying range error
        #[source]
        source: ScoreOutOfRange,
    },

    /// A flow references a component name that is not defined
    #[error("data flow `{flow}` references unknown component `{name}`")]
    UnknownComponent {
        /// Name of the referencing flow
        flow: String,
        /// The dangling component name
        name: String,
    },

    /// A flow transfers an asset name that is not defined
    #[error("data flow `{flow}` transfers unknown asset `{name}`")]
    UnknownAsset {
        /// Name of the referencing flow
        flow: String,
        /// The dangling asset name
        name: String,
    },

    /// A component references a boundary name that is not defined
    #[error("component `{component}` references unknown trust boundary `{name}`")]
    UnknownBoundary {
        /// Name of the referencing component
        component: String,
        /// The dangling boundary name
        name: String,
    },

    /// Registering an element failed
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// The `[project]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectDef {
    /// Model name
    pub name: String,
    /// Model description
    #[serde(default)]
    pub description: String,
}

/// The `[settings]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SettingsDef {
    /// Skip the registered validations on evaluation
    #[serde(default)]
    pub skip_validation: bool,
    /// Rule ids excluded from evaluation
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// One `[[assets]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AssetDef {
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Confidentiality score in 0..=100
    pub confidentiality: u32,
    /// Integrity score in 0..=100
    pub integrity: u32,
    /// Availability score in 0..=100
    pub availability: u32,
    /// Whether the asset contains PII
    #[serde(default)]
    pub pii: bool,
}

/// One `[[boundaries]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BoundaryDef {
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// One `[[components]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ComponentDef {
    /// Display name
    pub name: String,
    /// Component variant
    pub kind: ComponentKind,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Technology tag
    #[serde(default)]
    pub technology: Technology,
    /// Deployment tag
    #[serde(default)]
    pub machine: Machine,
    /// At-rest encryption
    #[serde(default)]
    pub encryption: Encryption,
    /// Accepted input data formats
    #[serde(default)]
    pub accepts: Vec<DataFormat>,
    /// Mark the component out of scope
    #[serde(default)]
    pub out_of_scope: bool,
    /// Name of the trust boundary the component belongs to
    #[serde(default)]
    pub boundary: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One `[[flows]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FlowDef {
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Name of the sending component
    pub source: String,
    /// Name of the receiving component
    pub destination: String,
    /// Wire protocol
    #[serde(default)]
    pub protocol: Protocol,
    /// Authentication on the flow
    #[serde(default)]
    pub authentication: Authentication,
    /// Authorization on the flow
    #[serde(default)]
    pub authorization: Authorization,
    /// Whether the flow is VPN-tunneled
    #[serde(default)]
    pub vpn: bool,
    /// Whether the destination only reads
    #[serde(default)]
    pub readonly: bool,
    /// Whether data travels both ways
    #[serde(default)]
    pub bidirectional: bool,
    /// Names of the transferred assets
    #[serde(default)]
    pub transfers: Vec<String>,
}

/// A parsed model definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Definition {
    /// The `[project]` section
    pub project: ProjectDef,
    /// The `[settings]` section
    #[serde(default)]
    pub settings: SettingsDef,
    /// The `[[assets]]` entries
    #[serde(default)]
    pub assets: Vec<AssetDef>,
    /// The `[[boundaries]]` entries
    #[serde(default)]
    pub boundaries: Vec<BoundaryDef>,
    /// The `[[components]]` entries
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    /// The `[[flows]]` entries
    #[serde(default)]
    pub flows: Vec<FlowDef>,
}

impl Definition {
    /// Parse a definition from TOML text
    pub fn from_toml(raw: &str) -> Result<Self, DefinitionError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load and parse a definition file
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        debug!("loading model definition from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Build the defined model
    ///
    /// Registers boundaries, assets, components, and flows in that order and
    /// resolves all by-name references.
    pub fn build(&self) -> Result<Model, DefinitionError> {
        let mut model =
            Model::new(&self.project.name).with_description(&self.project.description);
        model.skip_validation = self.settings.skip_validation;
        model.library.excludes.extend(self.settings.excludes.iter().cloned());

        let mut boundaries: BTreeMap<&str, BoundaryId> = BTreeMap::new();
        for def in &self.boundaries {
            let boundary =
                TrustBoundary::new(&def.name).with_description(&def.description);
            boundaries.insert(def.name.as_str(), model.add_trust_boundary(boundary)?);
        }

        let mut assets: BTreeMap<&str, AssetId> = BTreeMap::new();
        for def in &self.assets {
            let score = |value: u32| {
                Score::new(value).map_err(|source| DefinitionError::Score {
                    asset: def.name.clone(),
                    source,
                })
            };
            let mut asset = Asset::new(
                &def.name,
                score(def.confidentiality)?,
                score(def.integrity)?,
                score(def.availability)?,
            )
            .with_description(&def.description);
            if def.pii {
                asset = asset.pii();
            }
            assets.insert(def.name.as_str(), model.add_asset(asset)?);
        }

        let mut components: BTreeMap<&str, ComponentId> = BTreeMap::new();
        for def in &self.components {
            let mut component = Component::new(&def.name, def.kind)
                .with_technology(def.technology)
                .with_machine(def.machine)
                .with_encryption(def.encryption)
                .with_description(&def.description);
            for &format in &def.accepts {
                component = component.accepts(format);
            }
            if def.out_of_scope {
                component = component.out_of_scope();
            }
            if let Some(name) = &def.boundary {
                let boundary = boundaries.get(name.as_str()).ok_or_else(|| {
                    DefinitionError::UnknownBoundary {
                        component: def.name.clone(),
                        name: name.clone(),
                    }
                })?;
                component = component.in_boundary(*boundary);
            }
            for tag in &def.tags {
                component.info.add_tag(tag);
            }
            components.insert(def.name.as_str(), model.add_component(component)?);
        }

        for def in &self.flows {
            let resolve = |name: &str| {
                components.get(name).copied().ok_or_else(|| DefinitionError::UnknownComponent {
                    flow: def.name.clone(),
                    name: name.to_string(),
                })
            };
            let mut flow = DataFlow::new(
                &def.name,
                resolve(&def.source)?,
                resolve(&def.destination)?,
                def.protocol,
            )
            .with_authentication(def.authentication)
            .with_authorization(def.authorization)
            .with_description(&def.description);
            flow.vpn = def.vpn;
            flow.readonly = def.readonly;
            flow.bidirectional = def.bidirectional;

            let id = model.add_data_flow(flow)?;
            for name in &def.transfers {
                let asset =
                    assets.get(name.as_str()).copied().ok_or_else(|| {
                        DefinitionError::UnknownAsset {
                            flow: def.name.clone(),
                            name: name.clone(),
                        }
                    })?;
                model.transfers(id, asset);
            }
        }

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"
[project]
name = "Online Shop"
description = "storefront"

[settings]
excludes = ["CAPEC-17"]

[[assets]]
name = "Orders"
confidentiality = 80
integrity = 80
availability = 60
pii = true

[[boundaries]]
name = "Internal"

[[components]]
name = "User"
kind = "actor"
technology = "browser"

[[components]]
name = "WebApp"
kind = "process"
technology = "web-application"
accepts = ["json"]
boundary = "Internal"

[[flows]]
name = "WebTraffic"
source = "User"
destination = "WebApp"
protocol = "https"
authentication = "session-id"
transfers = ["Orders"]
"#;

    #[test]
    fn demo_definition_builds_and_evaluates() {
        let mut model = Definition::from_toml(DEMO).unwrap().build().unwrap();
        assert_eq!(model.name, "Online Shop");
        assert!(model.library.excludes.contains("CAPEC-17"));

        model.evaluate().unwrap();
        assert!(model.risk("CAPEC-62@WebApp@WebTraffic").is_ok());
    }

    #[test]
    fn dangling_component_reference_is_an_error() {
        let raw = r#"
[project]
name = "Broken"

[[components]]
name = "WebApp"
kind = "process"

[[flows]]
name = "Orphan"
source = "WebApp"
destination = "Nowhere"
"#;
        let err = Definition::from_toml(raw).unwrap().build().unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownComponent { .. }));
    }

    #[test]
    fn dangling_asset_reference_is_an_error() {
        let raw = r#"
[project]
name = "Broken"

[[components]]
name = "A"
kind = "process"

[[components]]
name = "B"
kind = "data-store"

[[flows]]
name = "F"
source = "A"
destination = "B"
transfers = ["Ghost"]
"#;
        let err = Definition::from_toml(raw).unwrap().build().unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownAsset { .. }));
    }

    #[test]
    fn out_of_range_score_is_an_error() {
        let raw = r#"
[project]
name = "Broken"

[[assets]]
name = "Oversized"
confidentiality = 101
integrity = 0
availability = 0
"#;
        let err = Definition::from_toml(raw).unwrap().build().unwrap_err();
        assert!(matches!(err, DefinitionError::Score { .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = r#"
[project]
name = "Strict"
colour = "red"
"#;
        assert!(matches!(Definition::from_toml(raw), Err(DefinitionError::Parse(_))));
    }
}

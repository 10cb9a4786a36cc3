//! Components - the nodes of the architecture graph
//!
//! A component is anything that sends, receives, processes, or stores data.
//! The original open inheritance chain (external entity / process / data
//! store / actor) is a closed [`ComponentKind`] variant set here; threat
//! rules switch on the variant and on the capability predicates instead of
//! downcasting.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::diagram::Shape;
use crate::element::{AssetId, BoundaryId, ElementInfo};

/// The closed set of component variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    /// A person or organization interacting with the system
    Actor,
    /// Entity or store outside of direct control; out of scope by default
    ExternalEntity,
    /// Task that receives, modifies, or redirects input to output
    Process,
    /// Permanent or temporary data storage
    DataStore,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Actor => "actor",
            Self::ExternalEntity => "external-entity",
            Self::Process => "process",
            Self::DataStore => "data-store",
        };
        write!(f, "{s}")
    }
}

/// Technology tag driving rule applicability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technology {
    /// Unknown or not relevant
    #[default]
    Unknown,
    /// Command line client
    Cli,
    /// Web browser
    Browser,
    /// Desktop client
    Desktop,
    /// Mobile application
    MobileApp,
    /// Browser-delivered user interface
    WebUi,
    /// Server-side web application
    WebApplication,
    /// REST web service
    WebServiceRest,
    /// SOAP web service
    WebServiceSoap,
    /// GraphQL web service
    WebServiceGraphql,
    /// Load balancer
    LoadBalancer,
    /// Database server
    Database,
    /// File server
    FileServer,
    /// Local file system
    LocalFileSystem,
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Cli => "cli",
            Self::Browser => "browser",
            Self::Desktop => "desktop",
            Self::MobileApp => "mobile-app",
            Self::WebUi => "web-ui",
            Self::WebApplication => "web-application",
            Self::WebServiceRest => "web-service-rest",
            Self::WebServiceSoap => "web-service-soap",
            Self::WebServiceGraphql => "web-service-graphql",
            Self::LoadBalancer => "load-balancer",
            Self::Database => "database",
            Self::FileServer => "file-server",
            Self::LocalFileSystem => "local-file-system",
        };
        write!(f, "{s}")
    }
}

/// Deployment machine tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Machine {
    /// Unknown deployment
    #[default]
    Unknown,
    /// Physical machine
    Physical,
    /// Virtual machine
    Virtual,
    /// Container
    Container,
    /// Serverless runtime
    Serverless,
}

impl std::fmt::Display for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Physical => "physical",
            Self::Virtual => "virtual",
            Self::Container => "container",
            Self::Serverless => "serverless",
        };
        write!(f, "{s}")
    }
}

/// At-rest encryption applied by the component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encryption {
    /// No encryption
    #[default]
    None,
    /// Transparent disk or volume encryption
    Transparent,
    /// Symmetric shared key
    SymmetricSharedKey,
    /// Asymmetric shared key
    AsymmetricSharedKey,
    /// Per-end-user individual key
    EnduserIndividualKey,
}

impl std::fmt::Display for Encryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Transparent => "transparent",
            Self::SymmetricSharedKey => "symmetric-shared-key",
            Self::AsymmetricSharedKey => "asymmetric-shared-key",
            Self::EnduserIndividualKey => "enduser-individual-key",
        };
        write!(f, "{s}")
    }
}

/// Data formats a component accepts as input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataFormat {
    /// JSON input
    Json,
    /// XML input
    Xml,
    /// Language-native serialization formats
    Serialization,
    /// File uploads
    File,
    /// CSV input
    Csv,
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Serialization => "serialization",
            Self::File => "file",
            Self::Csv => "csv",
        };
        write!(f, "{s}")
    }
}

/// A node of the architecture graph
#[derive(Debug, Clone)]
pub struct Component {
    /// Shared element state (name, description, scope, tags)
    pub info: ElementInfo,
    /// Closed component variant
    pub kind: ComponentKind,
    /// Technology tag
    pub technology: Technology,
    /// Deployment tag
    pub machine: Machine,
    /// At-rest encryption
    pub encryption: Encryption,
    /// Accepted input data formats
    pub accepts_data_formats: BTreeSet<DataFormat>,
    /// Whether humans use the component directly
    pub human_use: bool,
    /// Whether the component serves multiple tenants
    pub multi_tenant: bool,
    /// Whether the component is deployed redundantly
    pub redundant: bool,
    /// Whether the component contains custom-developed parts
    pub custom_developed_parts: bool,
    /// Relation to a trust boundary; no ownership implied
    pub trust_boundary: Option<BoundaryId>,
    pub(crate) assets_processed: BTreeSet<AssetId>,
    pub(crate) assets_stored: BTreeSet<AssetId>,
}

impl Component {
    /// Create a component of the given kind
    ///
    /// External entities start out of scope, matching their definition as
    /// parts of the world outside of direct control.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        let mut info = ElementInfo::new(name);
        info.out_of_scope = kind == ComponentKind::ExternalEntity;
        Self {
            info,
            kind,
            technology: Technology::Unknown,
            machine: Machine::Unknown,
            encryption: Encryption::None,
            accepts_data_formats: BTreeSet::new(),
            human_use: false,
            multi_tenant: false,
            redundant: false,
            custom_developed_parts: false,
            trust_boundary: None,
            assets_processed: BTreeSet::new(),
            assets_stored: BTreeSet::new(),
        }
    }

    /// Shorthand for an actor
    #[must_use]
    pub fn actor(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Actor)
    }

    /// Shorthand for an external entity
    #[must_use]
    pub fn external_entity(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::ExternalEntity)
    }

    /// Shorthand for a process
    #[must_use]
    pub fn process(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::Process)
    }

    /// Shorthand for a data store
    #[must_use]
    pub fn data_store(name: impl Into<String>) -> Self {
        Self::new(name, ComponentKind::DataStore)
    }

    /// Set the technology tag
    #[must_use]
    pub const fn with_technology(mut self, technology: Technology) -> Self {
        self.technology = technology;
        self
    }

    /// Set the deployment tag
    #[must_use]
    pub const fn with_machine(mut self, machine: Machine) -> Self {
        self.machine = machine;
        self
    }

    /// Set the at-rest encryption
    #[must_use]
    pub const fn with_encryption(mut self, encryption: Encryption) -> Self {
        self.encryption = encryption;
        self
    }

    /// Add an accepted input data format
    #[must_use]
    pub fn accepts(mut self, format: DataFormat) -> Self {
        self.accepts_data_formats.insert(format);
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    /// Relate the component to a trust boundary
    #[must_use]
    pub const fn in_boundary(mut self, boundary: BoundaryId) -> Self {
        self.trust_boundary = Some(boundary);
        self
    }

    /// Mark the component out of scope
    #[must_use]
    pub const fn out_of_scope(mut self) -> Self {
        self.info.out_of_scope = true;
        self
    }

    /// Assets the component processes
    #[must_use]
    pub fn assets_processed(&self) -> &BTreeSet<AssetId> {
        &self.assets_processed
    }

    /// Assets the component stores
    #[must_use]
    pub fn assets_stored(&self) -> &BTreeSet<AssetId> {
        &self.assets_stored
    }

    /// Record that the component processes the given asset
    ///
    /// Data stores also record the asset as stored, keeping stored a subset
    /// of processed.
    pub fn processes(&mut self, asset: AssetId) {
        self.assets_processed.insert(asset);
        if self.kind == ComponentKind::DataStore {
            self.assets_stored.insert(asset);
        }
    }

    /// Record that the component stores the given asset
    ///
    /// Storing implies processing unless `skip_process` is set.
    pub fn stores(&mut self, asset: AssetId, skip_process: bool) {
        self.assets_stored.insert(asset);
        if !skip_process {
            self.assets_processed.insert(asset);
        }
    }

    /// Whether the component is a server-side web application
    #[must_use]
    pub fn is_web_application(&self) -> bool {
        matches!(self.technology, Technology::WebApplication)
    }

    /// Whether the component is a web service of any flavor
    #[must_use]
    pub fn is_web_service(&self) -> bool {
        matches!(
            self.technology,
            Technology::WebServiceRest | Technology::WebServiceSoap | Technology::WebServiceGraphql
        )
    }

    /// Whether the component is client-side software
    #[must_use]
    pub fn is_client(&self) -> bool {
        matches!(
            self.technology,
            Technology::Cli
                | Technology::Browser
                | Technology::Desktop
                | Technology::MobileApp
                | Technology::WebUi
        )
    }

    /// Shape class used by diagram collaborators
    #[must_use]
    pub const fn diagram_shape(&self) -> Shape {
        match self.kind {
            ComponentKind::Actor | ComponentKind::ExternalEntity => Shape::Box,
            ComponentKind::Process => Shape::Circle,
            ComponentKind::DataStore => Shape::Cylinder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_entities_start_out_of_scope() {
        assert!(Component::external_entity("User").info.out_of_scope);
        assert!(!Component::process("WebApp").info.out_of_scope);
    }

    #[test]
    fn capability_predicates_follow_technology() {
        let app = Component::process("WebApp").with_technology(Technology::WebApplication);
        assert!(app.is_web_application());
        assert!(!app.is_web_service());
        assert!(!app.is_client());

        let api = Component::process("Api").with_technology(Technology::WebServiceRest);
        assert!(api.is_web_service());

        let browser = Component::external_entity("User").with_technology(Technology::Browser);
        assert!(browser.is_client());
    }

    #[test]
    fn shapes_follow_the_variant() {
        assert_eq!(Component::actor("A").diagram_shape(), Shape::Box);
        assert_eq!(Component::process("P").diagram_shape(), Shape::Circle);
        assert_eq!(Component::data_store("D").diagram_shape(), Shape::Cylinder);
    }
}

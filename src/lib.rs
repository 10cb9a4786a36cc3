//! riskgraph - threat modeling as code
//!
//! This library models a software architecture as a typed graph of
//! components, data flows, assets, and trust boundaries, derives security
//! risks by matching a catalog of parametrized threat rules against the
//! graph, and tracks remediation state per derived risk across evaluations.

// Deny all clippy warnings in this crate
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cargo_common_metadata
)]

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod asset;
pub mod catalog;
pub mod component;
pub mod data_flow;
pub mod definition;
pub mod diagram;
pub mod element;
pub mod model;
pub mod otm;
pub mod output;
pub mod report;
pub mod risk;
pub mod score;
pub mod storage;
pub mod task;
pub mod threat;
pub mod tree;
pub mod trust_boundary;

pub use asset::Asset;
pub use component::{Component, ComponentKind, Technology};
pub use data_flow::{DataFlow, Protocol};
pub use model::Model;
pub use risk::{Mitigation, Risk, Severity, Treatment};
pub use score::Score;
pub use threat::{Threat, ThreatLibrary};
pub use trust_boundary::TrustBoundary;

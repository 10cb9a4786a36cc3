//! Unit tests for riskgraph
//!
//! These tests verify the engine end to end: catalog rules against a
//! realistic model, the remediation lifecycle, and the CLI surface.

#[path = "unit/catalog_test.rs"]
mod catalog_test;

#[path = "unit/cli_test.rs"]
mod cli_test;

#[path = "unit/lifecycle_test.rs"]
mod lifecycle_test;

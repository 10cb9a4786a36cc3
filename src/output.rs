//! Output formatting for human and JSON modes
//!
//! Structured results that render either as human-readable text or as
//! machine-parseable JSON.

use colored::Colorize;
use serde::Serialize;

use crate::risk::Severity;

/// Output mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output (machine-readable)
    Json,
}

/// Result of evaluating a model
#[derive(Debug, Serialize)]
pub struct CheckResult {
    /// Whether validation and evaluation succeeded
    pub passed: bool,
    /// Model name
    pub model: String,
    /// Number of derived risks
    pub risks: usize,
    /// Validation violations, when evaluation was refused
    pub violations: Vec<String>,
}

impl CheckResult {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => self.render_human(),
            OutputMode::Json => render_json(self),
        }
    }

    fn render_human(&self) {
        if self.passed {
            println!(
                "{} model `{}` evaluated: {} risk(s) derived",
                "OK".green().bold(),
                self.model,
                self.risks
            );
        } else {
            println!("{} model `{}` failed validation:", "FAILED".red().bold(), self.model);
            for violation in &self.violations {
                println!("  - {violation}");
            }
        }
    }
}

/// One row of the risk listing
#[derive(Debug, Serialize)]
pub struct RiskRow {
    /// Composite risk id
    pub id: String,
    /// Severity band
    pub severity: Severity,
    /// Attack category
    pub category: String,
    /// Rule name
    pub name: String,
    /// Targeted element name
    pub target: String,
    /// Resolved treatment
    pub treatment: String,
    /// Rendered risk text
    pub text: String,
}

/// One row of the backlog listing
#[derive(Debug, Serialize)]
pub struct BacklogRow {
    /// Composite task id
    pub id: String,
    /// Risk the task remediates
    pub risk_id: String,
    /// Backlog grouping category
    pub sub_category: String,
    /// Rendered task text
    pub text: String,
    /// Lifecycle state
    pub state: String,
}

/// Generic operation result for simple commands
#[derive(Debug, Serialize)]
pub struct OperationResult {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
}

impl OperationResult {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => println!("{}", self.message),
            OutputMode::Json => render_json(self),
        }
    }
}

/// Print a serializable value as pretty JSON
pub fn render_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

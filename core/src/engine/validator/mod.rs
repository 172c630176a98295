//! Semantic validation for computations
//!
//! The interpreter can only pause at a suspension point that is the outermost
//! expression of its statement, and `break`/`continue` must have a loop to
//! land in. Both are checked here, before a body ever runs, by a small set of
//! independent rules.
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - Each rule implements this trait
//! 2. **Validator** - Collects and runs all rules
//! 3. **ValidationError** - The output of validation (errors, warnings, hints)
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `validator/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to the `Validator::new()` constructor

pub mod rules;

use super::types::Computation;

// ============================================================================
// Validation Error Types
// ============================================================================

/// A problem found by semantic analysis
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Computation the issue was found in
    pub computation: String,
    /// Human-readable message
    pub message: String,
    pub severity: Severity,
    /// Which rule produced this error
    pub rule_id: &'static str,
}

/// Severity levels for validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Must be fixed - the body cannot run correctly
    Error,
    /// Should probably be fixed - potential bug
    Warning,
    /// Suggestion for improvement
    Hint,
}

impl ValidationError {
    pub fn error(computation: &str, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::with_severity(computation, message, Severity::Error, rule_id)
    }

    pub fn warning(computation: &str, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::with_severity(computation, message, Severity::Warning, rule_id)
    }

    #[allow(dead_code)]
    pub fn hint(computation: &str, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self::with_severity(computation, message, Severity::Hint, rule_id)
    }

    fn with_severity(
        computation: &str,
        message: impl Into<String>,
        severity: Severity,
        rule_id: &'static str,
    ) -> Self {
        Self {
            computation: computation.to_string(),
            message: message.into(),
            severity,
            rule_id,
        }
    }

    /// Check if this is an error (not a warning or hint)
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        };
        write!(
            f,
            "{} in '{}': {} [{}]",
            severity, self.computation, self.message, self.rule_id
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules must implement.
///
/// Each rule checks one aspect of a body and does not depend on the results
/// of other rules.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "nested-suspension")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    /// Run the validation. An empty vector means no issues found.
    fn validate(&self, computation: &Computation) -> Vec<ValidationError>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

/// Runs every registered rule against a computation
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                // Error rules - the body cannot run as written
                Box::new(rules::NestedSuspensionRule),
                Box::new(rules::LoopControlRule),
                // Warning rules
                Box::new(rules::UnreachableCodeRule),
            ],
        }
    }

    pub fn validate(&self, computation: &Computation) -> Vec<ValidationError> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(computation))
            .collect()
    }

    /// Ids and descriptions of all registered rules
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Validate a computation and return everything found
pub fn validate_computation(computation: &Computation) -> Vec<ValidationError> {
    Validator::new().validate(computation)
}

/// Check if a computation has any validation errors (not just warnings)
pub fn has_errors(computation: &Computation) -> bool {
    validate_computation(computation)
        .iter()
        .any(|e| e.is_error())
}

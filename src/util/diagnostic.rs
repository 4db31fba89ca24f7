//! Structured diagnostics and the per-run diagnostics report.
//!
//! Every stage reports problems as `Diagnostic` values tagged with a
//! severity, the component that raised them and the entities involved.
//! The `DiagnosticsReport` collects them for one resolution run; it never
//! aborts anything itself, callers check `has_fatal()` and decide.

use std::fmt;

use serde::Serialize;

/// Severity level for diagnostics. Ordered most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The stage a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Store,
    Graph,
    Merger,
    Planner,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Store => write!(f, "store"),
            Component::Graph => write!(f, "graph"),
            Component::Merger => write!(f, "merger"),
            Component::Planner => write!(f, "planner"),
        }
    }
}

/// A diagnostic message with optional context and suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `gantry::graph::cycle`
    pub code: String,
    /// Severity level
    pub severity: Severity,
    /// Originating component
    pub component: Component,
    /// Primary message
    pub message: String,
    /// Names of the modules/targets involved
    pub entities: Vec<String>,
    /// Additional context lines
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    /// Suggested fixes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        component: Component,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            code: code.into(),
            severity,
            component,
            message: message.into(),
            entities: Vec::new(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(component: Component, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, component, code, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(
        component: Component,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, component, code, message)
    }

    /// Record an entity involved in the problem.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entities.push(entity.into());
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!(
            "{}[{}]: {}\n",
            severity_str, self.code, self.message
        ));
        output.push_str(&format!("  --> {}", self.component));
        if !self.entities.is_empty() {
            output.push_str(&format!(": {}", self.entities.join(", ")));
        }
        output.push('\n');

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// All diagnostics collected during one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiagnosticsReport {
    events: Vec<Diagnostic>,
}

impl DiagnosticsReport {
    pub fn new() -> Self {
        DiagnosticsReport::default()
    }

    /// Record a single diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.events.push(diagnostic);
    }

    /// Record a batch of diagnostics, preserving their order.
    pub fn collect<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        self.events.extend(events);
    }

    /// Whether any error-severity diagnostic was recorded.
    pub fn has_fatal(&self) -> bool {
        self.events.iter().any(Diagnostic::is_fatal)
    }

    /// Turn every warning into an error.
    pub fn promote_warnings(&mut self) {
        for event in &mut self.events {
            if event.severity == Severity::Warning {
                event.severity = Severity::Error;
            }
        }
    }

    /// Diagnostics in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics ordered by severity, then first occurrence.
    pub fn ordered(&self) -> Vec<&Diagnostic> {
        let mut ordered: Vec<&Diagnostic> = self.events.iter().collect();
        // sort_by_key is stable, so first-occurrence order survives within a severity
        ordered.sort_by_key(|d| d.severity);
        ordered
    }

    /// Render the report for a presentation layer.
    pub fn render(&self, color: bool) -> String {
        let mut output = String::new();
        for diagnostic in self.ordered() {
            output.push_str(&diagnostic.format(color));
            output.push('\n');
        }

        let errors = self.errors().count();
        let warnings = self.warnings().count();
        output.push_str(&format!(
            "{} error{}, {} warning{}\n",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" }
        ));
        output
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

impl std::error::Error for DiagnosticsReport {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error(
            Component::Graph,
            "gantry::graph::cycle",
            "cyclic dependency: A -> B -> A",
        )
        .with_entity("A")
        .with_entity("B")
        .with_context("A requires B")
        .with_suggestion("Break the cycle by removing one of the dependencies");

        let output = diag.format(false);
        assert!(output.contains("error[gantry::graph::cycle]: cyclic dependency"));
        assert!(output.contains("--> graph: A, B"));
        assert!(output.contains("= A requires B"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Break the cycle"));
    }

    #[test]
    fn test_report_orders_by_severity_then_occurrence() {
        let mut report = DiagnosticsReport::new();
        report.push(Diagnostic::warning(Component::Merger, "w1", "first warning"));
        report.push(Diagnostic::error(Component::Graph, "e1", "first error"));
        report.push(Diagnostic::warning(Component::Planner, "w2", "second warning"));
        report.push(Diagnostic::error(Component::Planner, "e2", "second error"));

        let codes: Vec<&str> = report.ordered().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["e1", "e2", "w1", "w2"]);
        assert!(report.has_fatal());

        let rendered = report.render(false);
        let e1 = rendered.find("first error").unwrap();
        let w1 = rendered.find("first warning").unwrap();
        assert!(e1 < w1);
        assert!(rendered.ends_with("2 errors, 2 warnings\n"));
    }

    #[test]
    fn test_warnings_are_not_fatal() {
        let mut report = DiagnosticsReport::new();
        report.push(Diagnostic::warning(Component::Merger, "w", "shadowed"));
        assert!(!report.has_fatal());

        report.promote_warnings();
        assert!(report.has_fatal());
    }
}

//! Dependency graph error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{Component, Diagnostic};

/// Error found while building the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum GraphError {
    #[error("module `{module}` depends on `{missing}`, which is not declared")]
    #[diagnostic(
        code(gantry::graph::unresolved),
        help("declare a module named `{missing}` or remove it from `{module}`")
    )]
    UnresolvedDependency { module: String, missing: String },

    #[error("module `{module}` depends on itself")]
    #[diagnostic(
        code(gantry::graph::self_dependency),
        help("remove `{module}` from its own dependency list")
    )]
    SelfDependency { module: String },

    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    #[diagnostic(
        code(gantry::graph::cycle),
        help("break the cycle by removing or restructuring one of the dependencies")
    )]
    CyclicDependency { cycle: Vec<String> },
}

impl GraphError {
    /// Names of the modules involved, in report order.
    pub fn entities(&self) -> Vec<String> {
        match self {
            GraphError::UnresolvedDependency { module, missing } => {
                vec![module.clone(), missing.clone()]
            }
            GraphError::SelfDependency { module } => vec![module.clone()],
            GraphError::CyclicDependency { cycle } => {
                // The closing node repeats the first one.
                let mut entities = cycle.clone();
                if entities.len() > 1 && entities.first() == entities.last() {
                    entities.pop();
                }
                entities
            }
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = MietteDiagnostic::code(self)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "gantry::graph".to_string());

        let mut diag = Diagnostic::error(Component::Graph, code, self.to_string());
        for entity in self.entities() {
            diag = diag.with_entity(entity);
        }

        if let GraphError::CyclicDependency { cycle } = self {
            for pair in cycle.windows(2) {
                diag = diag.with_context(format!("`{}` requires `{}`", pair[0], pair[1]));
            }
        }

        if let Some(help) = MietteDiagnostic::help(self) {
            diag = diag.with_suggestion(help.to_string());
        }

        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_diagnostic() {
        let err = GraphError::CyclicDependency {
            cycle: vec!["A".into(), "B".into(), "C".into(), "A".into()],
        };

        let diag = err.to_diagnostic();
        assert_eq!(diag.code, "gantry::graph::cycle");
        assert_eq!(diag.entities, vec!["A", "B", "C"]);
        assert_eq!(diag.context.len(), 3);

        let output = diag.format(false);
        assert!(output.contains("cyclic dependency: A -> B -> C -> A"));
        assert!(output.contains("`C` requires `A`"));
    }

    #[test]
    fn test_unresolved_diagnostic() {
        let err = GraphError::UnresolvedDependency {
            module: "Game".into(),
            missing: "Ghost".into(),
        };

        let diag = err.to_diagnostic();
        assert_eq!(diag.code, "gantry::graph::unresolved");
        assert_eq!(diag.entities, vec!["Game", "Ghost"]);
        assert!(diag.suggestions[0].contains("`Ghost`"));
    }
}

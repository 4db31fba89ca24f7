//! Command implementations

pub mod check;
pub mod completions;
pub mod flags;
pub mod order;
pub mod plan;

use anyhow::{bail, Result};

use gantry::builder::BuildPlan;
use gantry::core::Manifest;
use gantry::ops::{resolve_with, ResolveOptions};
use gantry::GlobalContext;

/// Load the manifest, resolve it, and print any diagnostics to stderr.
///
/// Fails after printing the report if the run produced a fatal diagnostic.
pub fn load_plan(ctx: &GlobalContext, deny_warnings: bool) -> Result<BuildPlan> {
    let manifest_path = ctx.find_manifest()?;
    let root = manifest_path.parent().unwrap_or(ctx.cwd());

    let config = ctx.load_config(root);
    let mut opts = ResolveOptions::from_config(&config);
    opts.warnings_as_errors |= deny_warnings;

    // Builtin, then config, then manifest; settings are typed and resolved
    // with the same table.
    let manifest = Manifest::load(&manifest_path)?;
    opts.policies
        .extend(manifest.policy.iter().map(|(k, v)| (k.clone(), *v)));
    let store = manifest.into_store_with(&opts.policies)?;

    match resolve_with(&store, &opts) {
        Ok(plan) => {
            if !plan.diagnostics.is_empty() {
                eprint!("{}", plan.diagnostics.render(ctx.color()));
            }
            Ok(plan)
        }
        Err(report) => {
            eprint!("{}", report.render(ctx.color()));
            let errors = report.errors().count();
            bail!(
                "could not resolve `{}` due to {} previous error{}",
                manifest_path.display(),
                errors,
                if errors == 1 { "" } else { "s" }
            )
        }
    }
}

//! `gantry check` command

use anyhow::Result;

use crate::cli::CheckArgs;
use gantry::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: CheckArgs) -> Result<()> {
    let plan = super::load_plan(ctx, args.deny_warnings)?;

    println!(
        "ok: {} module(s), {} target(s), {} warning(s)",
        plan.modules.len(),
        plan.targets.len(),
        plan.diagnostics.warnings().count()
    );

    Ok(())
}

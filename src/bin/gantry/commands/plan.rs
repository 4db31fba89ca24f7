//! `gantry plan` command

use anyhow::Result;

use crate::cli::PlanArgs;
use gantry::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: PlanArgs) -> Result<()> {
    let plan = super::load_plan(ctx, args.deny_warnings)?;

    if args.json {
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    println!("Build order:");
    for (i, module) in plan.modules.iter().enumerate() {
        if module.dependencies.is_empty() {
            println!("  {}. {} ({})", i + 1, module.name, module.kind);
        } else {
            println!(
                "  {}. {} ({}) <- {}",
                i + 1,
                module.name,
                module.kind,
                module.dependencies.join(", ")
            );
        }
    }

    for target in &plan.targets {
        println!();
        println!("Target `{}` ({}):", target.name, target.kind);
        println!("  link order: {}", target.link_order.join(" -> "));
    }

    println!();
    println!("fingerprint: {}", plan.fingerprint());

    Ok(())
}

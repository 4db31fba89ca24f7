//! `gantry flags` command

use anyhow::{anyhow, Result};

use crate::cli::FlagsArgs;
use gantry::builder::merger::EffectiveSettings;
use gantry::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: FlagsArgs) -> Result<()> {
    let plan = super::load_plan(ctx, false)?;

    let settings: EffectiveSettings = match &args.target {
        Some(target) => {
            if plan.target(target).is_none() {
                return Err(anyhow!("target `{}` not found", target));
            }
            plan.settings_for(target, &args.module).ok_or_else(|| {
                anyhow!(
                    "module `{}` is not part of target `{}`\n\
                     help: Run `gantry order --target {}` to see its modules",
                    args.module,
                    target,
                    target
                )
            })?
        }
        None => plan
            .module(&args.module)
            .map(|m| m.settings.clone())
            .ok_or_else(|| {
                anyhow!(
                    "module `{}` is not in the build plan\n\
                     help: Modules no target requires are left out of the plan",
                    args.module
                )
            })?,
    };

    match &args.target {
        Some(target) => println!("# Settings for `{}` in `{}`:", args.module, target),
        None => println!("# Settings for `{}`:", args.module),
    }

    for (key, value) in settings.iter() {
        println!("{} ({}):", key, value.policy());
        for entry in value.entries() {
            if args.no_provenance {
                println!("  {}", entry.value);
            } else {
                println!("  {}    # from: {}", entry.value, entry.from);
            }
        }
    }

    Ok(())
}

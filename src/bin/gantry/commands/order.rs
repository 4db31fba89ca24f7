//! `gantry order` command

use anyhow::{anyhow, Result};

use crate::cli::OrderArgs;
use gantry::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: OrderArgs) -> Result<()> {
    let plan = super::load_plan(ctx, false)?;

    let order: Vec<&str> = match &args.target {
        Some(name) => {
            let target = plan.target(name).ok_or_else(|| {
                anyhow!(
                    "target `{}` not found\n\
                     help: Run `gantry plan` to see available targets",
                    name
                )
            })?;
            target.link_order.iter().map(String::as_str).collect()
        }
        None => plan.build_order(),
    };

    for module in order {
        println!("{}", module);
    }

    Ok(())
}

//! List summary modes and strategies.

use console::style;

use crate::config::Settings;
use crate::summarise::{ChainType, SummaryMode};

pub fn cmd_modes(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", style("Summary modes").bold());
    for mode in SummaryMode::ALL {
        let marker = if mode == settings.default_mode { "*" } else { " " };
        println!(
            " {} {:<12} {}",
            style(marker).green(),
            mode.as_str(),
            style(mode.description()).dim()
        );
    }

    println!();
    println!("{}", style("Strategies").bold());
    for chain in ChainType::ALL {
        let marker = if chain == settings.default_chain { "*" } else { " " };
        println!(
            " {} {:<12} {}",
            style(marker).green(),
            chain.as_str(),
            style(chain.description()).dim()
        );
    }

    println!();
    println!("{} marks the configured default", style("*").green());
    Ok(())
}

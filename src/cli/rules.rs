use std::fs;

use anyhow::{Context, Result};
use mutation_dispatch::rules::{PRESETS, get_preset};

use crate::cli::RulesCommand;

pub fn rules(command: RulesCommand) -> Result<()> {
    match command {
        RulesCommand::ListPresets { detailed } => {
            for preset in PRESETS {
                if detailed {
                    println!("Name: {}\nDescription: {}\nRules: {}\n", preset.name, preset.short_description, (preset.rules)());
                } else {
                    println!("{}", preset.name);
                }
            }
        }
        RulesCommand::SaveToFile { preset, output_path } => {
            let json = get_preset(&preset)?.to_json_pretty()?;
            fs::write(&output_path, json).with_context(|| format!("couldn't write {}", output_path.display()))?;
            if_tracing! {
                tracing::info!(event = "preset_saved", preset = %preset, path = %output_path.display(), "saved preset");
            }
        }
    }

    Ok(())
}

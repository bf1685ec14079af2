use clap::Subcommand;
use grappletimer_core::{format_clock, Config, Preset};

use super::TimerArgs;

#[derive(Subcommand)]
pub enum PresetAction {
    /// List saved presets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a preset built from the stored default and any overrides
    Add {
        /// Preset name; defaults to a label like "10×5:00/1:00"
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        timer: TimerArgs,
    },
    /// Delete a preset by name or id
    Remove {
        /// Preset name or id
        key: String,
    },
    /// Make a preset the default timer configuration
    Select {
        /// Preset name or id
        key: String,
    },
}

pub fn run(action: PresetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;

    match action {
        PresetAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config.presets)?);
                return Ok(());
            }
            for preset in &config.presets {
                let cfg = &preset.configuration;
                let marker = if preset.configuration == config.timer { "*" } else { " " };
                println!(
                    "{marker} {:<16} {} rounds, {} / {}, clapper {}  ({})",
                    preset.name,
                    cfg.rounds,
                    format_clock(millis(cfg.round_duration)),
                    format_clock(millis(cfg.rest_duration)),
                    format_clock(millis(cfg.clapper_offset)),
                    preset.id
                );
            }
        }
        PresetAction::Add { name, timer } => {
            let cfg = timer.resolve(&config)?;
            let name = name.unwrap_or_else(|| Preset::label_for(&cfg));
            let preset = Preset::new(name, cfg);
            let id = preset.id;
            config.add_preset(preset)?;
            config.save()?;
            println!("{id}");
        }
        PresetAction::Remove { key } => {
            let removed = config.remove_preset(&key)?;
            config.save()?;
            println!("removed {}", removed.name);
        }
        PresetAction::Select { key } => {
            config.select_preset(&key)?;
            config.save()?;
            println!("ok");
        }
    }
    Ok(())
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

//! polysynth - Polyphonic voice engine

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use polysynth::config::{self, SynthConfig};
use polysynth::engine::{self, Script};
use polysynth::viz;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Base peak: {}", cfg.engine.base_peak);
                    println!(
                        "  Envelope: A {}s  D {}s  S {}  R {}s",
                        cfg.envelope.attack,
                        cfg.envelope.decay,
                        cfg.envelope.sustain,
                        cfg.envelope.release
                    );
                    println!("  Mode: {}", cfg.voice.mode);
                    println!("  Waveform: {}", cfg.voice.waveform);
                    println!("  Additive partials: {}", cfg.additive.partials);
                    println!(
                        "  AM: {} Hz, depth {}",
                        cfg.am.mod_frequency, cfg.am.depth
                    );
                    println!("  FM: {} Hz, index {}", cfg.fm.mod_frequency, cfg.fm.index);
                    println!(
                        "  Master: {:.0}%, LFO {} Hz x {}",
                        cfg.master.volume * 100.0,
                        cfg.master.lfo_rate,
                        cfg.master.lfo_depth
                    );
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../polysynth.example.yaml");

            let path = "polysynth.yaml";
            if Path::new(path).exists() {
                println!("polysynth.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)?;
                println!("Created polysynth.yaml with example configuration.");
            }
        }

        Commands::Plan {
            config: config_path,
            script,
            frames,
            pretty,
        } => {
            let cfg = load_or_default(&config_path)?;
            let script = Script::load(&script)?;
            let plan = engine::plan(&cfg, &script, frames);

            let json = if pretty {
                serde_json::to_string_pretty(&plan)?
            } else {
                serde_json::to_string(&plan)?
            };
            println!("{}", json);
        }

        Commands::Watch {
            config: config_path,
            script,
        } => {
            let cfg = load_or_default(&config_path)?;
            let script = Script::load(&script)?;
            viz::run_watch(&cfg, &script)?;
        }
    }

    Ok(())
}

/// Load the config file, falling back to defaults when it is absent
fn load_or_default(path: &Path) -> Result<SynthConfig> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        Ok(SynthConfig::default())
    }
}

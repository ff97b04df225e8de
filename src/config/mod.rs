//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::synth::{EnvelopeParameters, MasterBus, SynthParams, TopologyParams};

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<SynthConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: SynthConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

impl From<&SynthConfig> for SynthParams {
    fn from(config: &SynthConfig) -> Self {
        Self {
            envelope: EnvelopeParameters::new(
                config.envelope.attack,
                config.envelope.decay,
                config.envelope.sustain,
                config.envelope.release,
            ),
            topology: TopologyParams {
                partials: config.additive.partials,
                am_mod_frequency: config.am.mod_frequency,
                am_depth: config.am.depth,
                fm_mod_frequency: config.fm.mod_frequency,
                fm_index: config.fm.index,
            },
            waveform: config.voice.waveform,
            mode: config.voice.mode,
            master: MasterBus {
                volume: config.master.volume,
                lfo_rate: config.master.lfo_rate,
                lfo_depth: config.master.lfo_depth,
            },
        }
    }
}

//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::synth::{SynthMode, Waveform};

/// Main configuration for polysynth
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Engine limits and normalisation
    #[serde(default)]
    pub engine: EngineConfig,

    /// ADSR envelope
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Mode and waveform for new voices
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Additive topology settings
    #[serde(default)]
    pub additive: AdditiveConfig,

    /// Amplitude modulation settings
    #[serde(default)]
    pub am: AmConfig,

    /// Frequency modulation settings
    #[serde(default)]
    pub fm: FmConfig,

    /// Master bus (volume, tremolo)
    #[serde(default)]
    pub master: MasterConfig,
}

impl SynthConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate engine settings
        if self.engine.base_peak <= 0.0 || self.engine.base_peak > 1.0 {
            bail!("Base peak must be in (0.0, 1.0]");
        }
        if self.engine.rescale_ramp <= 0.0 || self.engine.rescale_ramp > 1.0 {
            bail!("Rescale ramp must be in (0.0, 1.0] seconds");
        }
        if self.engine.completion_queue == 0 {
            bail!("Completion queue capacity must be at least 1");
        }

        // Validate envelope
        let env = &self.envelope;
        if env.attack <= 0.0 || env.decay <= 0.0 || env.release <= 0.0 {
            bail!("Attack, decay and release must be positive");
        }
        if !(0.0..=1.0).contains(&env.sustain) {
            bail!("Sustain level must be between 0.0 and 1.0");
        }

        // Validate topologies
        if self.additive.partials == 0 || self.additive.partials > 32 {
            bail!("Additive partials must be between 1 and 32");
        }
        if !(0.0..=1.0).contains(&self.am.depth) {
            bail!("AM depth must be between 0.0 and 1.0");
        }
        if self.am.mod_frequency <= 0.0 || self.fm.mod_frequency <= 0.0 {
            bail!("Modulator frequencies must be positive");
        }
        if self.fm.index < 0.0 {
            bail!("FM index must not be negative");
        }

        // Validate master bus
        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }
        if self.master.lfo_rate < 0.0 || self.master.lfo_depth < 0.0 {
            bail!("LFO rate and depth must not be negative");
        }

        Ok(())
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Summed peak gain shared by all voices (default: 0.35)
    #[serde(default = "default_base_peak")]
    pub base_peak: f64,

    /// Seconds over which gains move to a new normalised target (default: 0.05)
    #[serde(default = "default_rescale_ramp")]
    pub rescale_ramp: f64,

    /// Capacity of the backend completion queue (default: 64)
    #[serde(default = "default_completion_queue")]
    pub completion_queue: usize,
}

fn default_base_peak() -> f64 { 0.35 }
fn default_rescale_ramp() -> f64 { 0.05 }
fn default_completion_queue() -> usize { 64 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_peak: default_base_peak(),
            rescale_ramp: default_rescale_ramp(),
            completion_queue: default_completion_queue(),
        }
    }
}

/// ADSR settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Attack time in seconds (default: 0.01)
    #[serde(default = "default_attack")]
    pub attack: f64,

    /// Decay time in seconds (default: 0.08)
    #[serde(default = "default_decay")]
    pub decay: f64,

    /// Sustain level 0.0-1.0 (default: 0.35)
    #[serde(default = "default_sustain")]
    pub sustain: f64,

    /// Release time in seconds (default: 0.15)
    #[serde(default = "default_release")]
    pub release: f64,
}

fn default_attack() -> f64 { 0.01 }
fn default_decay() -> f64 { 0.08 }
fn default_sustain() -> f64 { 0.35 }
fn default_release() -> f64 { 0.15 }

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            attack: default_attack(),
            decay: default_decay(),
            sustain: default_sustain(),
            release: default_release(),
        }
    }
}

/// Settings applied to newly created voices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Synthesis mode (default: additive)
    #[serde(default)]
    pub mode: SynthMode,

    /// Oscillator waveform (default: sine)
    #[serde(default)]
    pub waveform: Waveform,
}

/// Additive synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveConfig {
    /// Number of harmonic partials (default: 4)
    #[serde(default = "default_partials")]
    pub partials: u32,
}

fn default_partials() -> u32 { 4 }

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self { partials: default_partials() }
    }
}

/// Amplitude modulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmConfig {
    /// Modulator frequency in Hz (default: 80)
    #[serde(default = "default_am_frequency")]
    pub mod_frequency: f64,

    /// Modulation depth 0.0-1.0 (default: 0.5)
    #[serde(default = "default_am_depth")]
    pub depth: f64,
}

fn default_am_frequency() -> f64 { 80.0 }
fn default_am_depth() -> f64 { 0.5 }

impl Default for AmConfig {
    fn default() -> Self {
        Self {
            mod_frequency: default_am_frequency(),
            depth: default_am_depth(),
        }
    }
}

/// Frequency modulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmConfig {
    /// Modulator frequency in Hz (default: 200)
    #[serde(default = "default_fm_frequency")]
    pub mod_frequency: f64,

    /// Modulation index in Hz of carrier deviation (default: 100)
    #[serde(default = "default_fm_index")]
    pub index: f64,
}

fn default_fm_frequency() -> f64 { 200.0 }
fn default_fm_index() -> f64 { 100.0 }

impl Default for FmConfig {
    fn default() -> Self {
        Self {
            mod_frequency: default_fm_frequency(),
            index: default_fm_index(),
        }
    }
}

/// Master bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.8)
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Tremolo LFO rate in Hz (default: 5)
    #[serde(default = "default_lfo_rate")]
    pub lfo_rate: f64,

    /// Tremolo LFO depth (default: 10)
    #[serde(default = "default_lfo_depth")]
    pub lfo_depth: f64,
}

fn default_volume() -> f64 { 0.8 }
fn default_lfo_rate() -> f64 { 5.0 }
fn default_lfo_depth() -> f64 { 10.0 }

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            lfo_rate: default_lfo_rate(),
            lfo_depth: default_lfo_depth(),
        }
    }
}

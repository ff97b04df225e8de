//! Live synthesis parameters
//!
//! All values are last-writer-wins and read fresh whenever a voice is built,
//! scheduled or drawn.

use serde::{Deserialize, Serialize};

use super::envelope::EnvelopeParameters;
use super::oscillator::Waveform;
use super::topology::{SynthMode, TopologyParams};

/// Master output gain with a tremolo LFO on its gain parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasterBus {
    pub volume: f64,
    /// LFO rate in Hz
    pub lfo_rate: f64,
    /// LFO output scale applied to the master gain parameter
    pub lfo_depth: f64,
}

impl Default for MasterBus {
    fn default() -> Self {
        Self {
            volume: 0.8,
            lfo_rate: 5.0,
            lfo_depth: 10.0,
        }
    }
}

/// Numeric parameters adjustable while notes are playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Attack,
    Decay,
    Sustain,
    Release,
    Partials,
    AmFrequency,
    AmDepth,
    FmFrequency,
    FmIndex,
    LfoRate,
    LfoDepth,
}

impl Param {
    /// Whether changing this parameter reconfigures the master bus
    pub fn affects_master(&self) -> bool {
        matches!(self, Param::LfoRate | Param::LfoDepth)
    }
}

/// Every parameter the engine reads when building and scheduling voices
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SynthParams {
    pub envelope: EnvelopeParameters,
    pub topology: TopologyParams,
    pub waveform: Waveform,
    pub mode: SynthMode,
    pub master: MasterBus,
}

impl SynthParams {
    /// Apply a named update, clamping to the parameter's range. Non-finite
    /// values are ignored.
    pub fn set(&mut self, param: Param, value: f64) {
        if !value.is_finite() {
            return;
        }
        match param {
            Param::Attack => self.envelope.set_attack(value),
            Param::Decay => self.envelope.set_decay(value),
            Param::Sustain => self.envelope.set_sustain(value),
            Param::Release => self.envelope.set_release(value),
            Param::Partials => self.topology.partials = value.round().clamp(1.0, 32.0) as u32,
            Param::AmFrequency => self.topology.am_mod_frequency = value.max(0.1),
            Param::AmDepth => self.topology.am_depth = value.clamp(0.0, 1.0),
            Param::FmFrequency => self.topology.fm_mod_frequency = value.max(0.1),
            Param::FmIndex => self.topology.fm_index = value.max(0.0),
            Param::LfoRate => self.master.lfo_rate = value.max(0.0),
            Param::LfoDepth => self.master.lfo_depth = value.max(0.0),
        }
    }

    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::Attack => self.envelope.attack,
            Param::Decay => self.envelope.decay,
            Param::Sustain => self.envelope.sustain,
            Param::Release => self.envelope.release,
            Param::Partials => self.topology.partials as f64,
            Param::AmFrequency => self.topology.am_mod_frequency,
            Param::AmDepth => self.topology.am_depth,
            Param::FmFrequency => self.topology.fm_mod_frequency,
            Param::FmIndex => self.topology.fm_index,
            Param::LfoRate => self.master.lfo_rate,
            Param::LfoDepth => self.master.lfo_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut params = SynthParams::default();

        params.set(Param::Attack, 0.2);
        assert_eq!(params.get(Param::Attack), 0.2);

        params.set(Param::FmIndex, 250.0);
        assert_eq!(params.get(Param::FmIndex), 250.0);

        params.set(Param::LfoRate, 2.5);
        assert_eq!(params.master.lfo_rate, 2.5);
    }

    #[test]
    fn test_set_clamps() {
        let mut params = SynthParams::default();

        params.set(Param::Partials, 3.6);
        assert_eq!(params.topology.partials, 4);
        params.set(Param::Partials, 0.0);
        assert_eq!(params.topology.partials, 1);

        params.set(Param::AmDepth, 1.7);
        assert_eq!(params.topology.am_depth, 1.0);

        params.set(Param::Sustain, -0.5);
        assert_eq!(params.envelope.sustain, 0.0);

        params.set(Param::Release, 0.0);
        assert_eq!(params.envelope.release, 0.001);
    }

    #[test]
    fn test_set_ignores_non_finite() {
        let mut params = SynthParams::default();
        let sustain = params.envelope.sustain;
        let depth = params.topology.am_depth;

        params.set(Param::Sustain, f64::NAN);
        params.set(Param::AmDepth, f64::INFINITY);
        params.set(Param::Release, f64::NEG_INFINITY);

        assert_eq!(params.envelope.sustain, sustain);
        assert_eq!(params.topology.am_depth, depth);
        assert_eq!(params.envelope.release, SynthParams::default().envelope.release);
    }

    #[test]
    fn test_param_names() {
        let param: Param = serde_yaml::from_str("am_frequency").unwrap();
        assert_eq!(param, Param::AmFrequency);
        assert!(Param::LfoDepth.affects_master());
        assert!(!Param::Attack.affects_master());
    }
}

//! Oscillator waveform shapes
//!
//! The engine never generates samples itself; these shapes are handed to the
//! rendering backend as part of each voice graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// Waveform types understood by the rendering backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            _ => Err(SynthError::InvalidWaveform(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_parse() {
        assert_eq!("sine".parse::<Waveform>(), Ok(Waveform::Sine));
        assert_eq!("Saw".parse::<Waveform>(), Ok(Waveform::Sawtooth));
        assert_eq!(" triangle ".parse::<Waveform>(), Ok(Waveform::Triangle));
    }

    #[test]
    fn test_waveform_parse_unknown() {
        assert_eq!(
            "noise".parse::<Waveform>(),
            Err(SynthError::InvalidWaveform("noise".to_string()))
        );
    }

    #[test]
    fn test_waveform_yaml() {
        let w: Waveform = serde_yaml::from_str("square").unwrap();
        assert_eq!(w, Waveform::Square);
        assert_eq!(w.to_string(), "square");
    }
}

//! Error types for the voice engine

use thiserror::Error;

use crate::synth::NoteKey;

/// Errors surfaced by the voice engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// Requested synthesis mode is not one of additive, am or fm
    #[error("invalid topology '{0}' (expected additive, am or fm)")]
    InvalidTopology(String),

    /// Operation referenced a key with no live voice
    #[error("no live voice for key '{0}'")]
    UnknownVoice(NoteKey),

    /// The rendering backend cannot accept new voices yet
    #[error("rendering backend is not ready")]
    BackendUnavailable,

    /// Note frequency must be positive and finite
    #[error("invalid frequency {0} Hz")]
    InvalidFrequency(f64),

    /// Waveform name is not one of sine, square, sawtooth or triangle
    #[error("unknown waveform '{0}'")]
    InvalidWaveform(String),
}

//! polysynth - Polyphonic voice lifecycle and envelope scheduling
//!
//! Notes become voices: each gets a synthesis graph, an ADSR gain schedule
//! for the rendering backend, a display lane and a share of the summed peak.
//! The same envelope drives a linear visual curve for drawing.

pub mod config;
pub mod engine;
pub mod error;
pub mod synth;
pub mod viz;

pub use config::SynthConfig;
pub use engine::VoiceManager;
pub use error::SynthError;

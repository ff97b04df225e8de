//! A single sounding note

use std::fmt;

use serde::{Deserialize, Serialize};

use super::envelope::{EnvelopeModel, EnvelopeParameters, EnvelopeStage, Timeline};
use super::lane::Lane;
use super::topology::{Topology, VoiceGraph};

/// Opaque note identifier from the input layer, unique while a voice is live
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteKey(String);

impl NoteKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for NoteKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one voice instance; never reused, even for the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One live voice and everything it owns
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    key: NoteKey,
    frequency: f64,
    topology: Topology,
    graph: VoiceGraph,
    lane: Lane,
    timeline: Timeline,
    target_peak: f64,
    phase: f64,
}

impl Voice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: VoiceId,
        key: NoteKey,
        frequency: f64,
        topology: Topology,
        graph: VoiceGraph,
        lane: Lane,
        started_at: f64,
        target_peak: f64,
    ) -> Self {
        Self {
            id,
            key,
            frequency,
            topology,
            graph,
            lane,
            timeline: Timeline::started(started_at),
            target_peak,
            phase: 0.0,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn key(&self) -> &NoteKey {
        &self.key
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn graph(&self) -> &VoiceGraph {
        &self.graph
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    pub fn started_at(&self) -> f64 {
        self.timeline.started_at
    }

    pub fn released_at(&self) -> Option<f64> {
        self.timeline.released_at
    }

    pub fn is_releasing(&self) -> bool {
        self.timeline.released_at.is_some()
    }

    /// Audio stage at `now` under the current parameters
    pub fn stage(&self, params: &EnvelopeParameters, now: f64) -> EnvelopeStage {
        EnvelopeModel::locate(params, &self.timeline, now).stage
    }

    /// Mark the voice released. Returns false if it was already releasing.
    pub fn release(&mut self, at: f64) -> bool {
        if self.timeline.released_at.is_some() {
            return false;
        }
        self.timeline.released_at = Some(at);
        true
    }

    pub fn target_peak(&self) -> f64 {
        self.target_peak
    }

    pub fn set_target_peak(&mut self, peak: f64) {
        self.target_peak = peak;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Advance the visual wave by one display tick
    pub fn advance_phase(&mut self) {
        self.phase += 0.03 + self.frequency / 5000.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::topology::TopologyBuilder;
    use crate::synth::Waveform;

    fn test_voice() -> Voice {
        let topology = Topology::Additive { partials: 2 };
        let graph = TopologyBuilder::build(&topology, 500.0, Waveform::Sine);
        Voice::new(
            VoiceId(7),
            NoteKey::from("Q"),
            500.0,
            topology,
            graph,
            Lane(3),
            1.0,
            0.35,
        )
    }

    #[test]
    fn test_voice_creation() {
        let voice = test_voice();
        assert_eq!(voice.id(), VoiceId(7));
        assert_eq!(voice.key().as_str(), "Q");
        assert_eq!(voice.lane(), Lane(3));
        assert_eq!(voice.graph().oscillator_count(), 2);
        assert!(!voice.is_releasing());
        assert_eq!(voice.phase(), 0.0);
    }

    #[test]
    fn test_voice_release_once() {
        let mut voice = test_voice();
        let params = EnvelopeParameters::default();
        assert_eq!(voice.stage(&params, 1.005), EnvelopeStage::Attack);

        assert!(voice.release(2.0));
        assert!(!voice.release(3.0));
        assert_eq!(voice.released_at(), Some(2.0));
        assert_eq!(voice.stage(&params, 2.1), EnvelopeStage::Release);
    }

    #[test]
    fn test_phase_advance() {
        let mut voice = test_voice();
        voice.advance_phase();
        voice.advance_phase();
        assert!((voice.phase() - 2.0 * (0.03 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(NoteKey::from("90").to_string(), "90");
        assert_eq!(VoiceId(3).to_string(), "v3");
    }
}

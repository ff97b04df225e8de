//! Voice-level models
//!
//! Envelopes, topologies, gain normalisation and lane allocation. Nothing in
//! here talks to a backend; the engine wires these together.

mod envelope;
mod gain;
mod lane;
mod oscillator;
mod params;
mod topology;
mod voice;

pub use envelope::{
    EnvelopeModel, EnvelopeParameters, EnvelopeStage, StagePosition, Timeline, VisualStage,
    ATTACK_FLOOR, RELEASE_FLOOR, RELEASE_TAIL, VISUAL_PEAK,
};
pub use gain::{AutomationPoint, Curve, GainNormalizer, GainSchedule};
pub use lane::{Lane, LaneAllocator, LANE_COUNT};
pub use oscillator::Waveform;
pub use params::{MasterBus, Param, SynthParams};
pub use topology::{
    Connection, GainNode, Input, NodeId, OscillatorNode, SynthMode, Topology, TopologyBuilder,
    TopologyParams, VoiceGraph,
};
pub use voice::{NoteKey, Voice, VoiceId};

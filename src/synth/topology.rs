//! Synthesis topologies and voice graph construction
//!
//! A topology is the wiring of oscillators and gains behind one voice. The
//! builder only describes the graph; the rendering backend instantiates it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::envelope::ATTACK_FLOOR;
use super::oscillator::Waveform;
use crate::error::SynthError;

/// Which topology new voices are built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthMode {
    #[default]
    Additive,
    Am,
    Fm,
}

impl fmt::Display for SynthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SynthMode::Additive => "additive",
            SynthMode::Am => "am",
            SynthMode::Fm => "fm",
        })
    }
}

impl FromStr for SynthMode {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" => Ok(SynthMode::Additive),
            "am" => Ok(SynthMode::Am),
            "fm" => Ok(SynthMode::Fm),
            _ => Err(SynthError::InvalidTopology(s.to_string())),
        }
    }
}

/// A topology together with the parameters it was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Topology {
    /// Harmonic partials at 1/i amplitude
    Additive { partials: u32 },
    /// Carrier with a sine modulating its amplitude
    Am { mod_frequency: f64, depth: f64 },
    /// Carrier with a sine modulating its frequency
    Fm { mod_frequency: f64, index: f64 },
}

impl Topology {
    pub fn mode(&self) -> SynthMode {
        match self {
            Topology::Additive { .. } => SynthMode::Additive,
            Topology::Am { .. } => SynthMode::Am,
            Topology::Fm { .. } => SynthMode::Fm,
        }
    }
}

/// Current per-mode parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyParams {
    pub partials: u32,
    pub am_mod_frequency: f64,
    pub am_depth: f64,
    pub fm_mod_frequency: f64,
    pub fm_index: f64,
}

impl Default for TopologyParams {
    fn default() -> Self {
        Self {
            partials: 4,
            am_mod_frequency: 80.0,
            am_depth: 0.5,
            fm_mod_frequency: 200.0,
            fm_index: 100.0,
        }
    }
}

impl TopologyParams {
    /// Snapshot the parameters relevant to `mode`
    pub fn topology(&self, mode: SynthMode) -> Topology {
        match mode {
            SynthMode::Additive => Topology::Additive {
                partials: self.partials.max(1),
            },
            SynthMode::Am => Topology::Am {
                mod_frequency: self.am_mod_frequency,
                depth: self.am_depth,
            },
            SynthMode::Fm => Topology::Fm {
                mod_frequency: self.fm_mod_frequency,
                index: self.fm_index,
            },
        }
    }
}

/// Node index within one voice graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// An oscillator node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorNode {
    pub id: NodeId,
    pub waveform: Waveform,
    pub frequency: f64,
}

/// A gain node with a static gain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainNode {
    pub id: NodeId,
    pub gain: f64,
}

/// Which input of the destination a connection feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    /// Audio input, summed with other signals
    Signal,
    /// The destination gain node's gain parameter
    Gain,
    /// The destination oscillator's frequency parameter
    Frequency,
}

/// A directed edge between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
    pub input: Input,
}

/// Node graph for one voice, terminating in its output gain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceGraph {
    pub oscillators: Vec<OscillatorNode>,
    pub gains: Vec<GainNode>,
    pub connections: Vec<Connection>,
}

impl VoiceGraph {
    /// The per-voice output gain, driven by envelope automation
    pub const OUTPUT: NodeId = NodeId(0);

    fn new() -> Self {
        Self {
            oscillators: Vec::new(),
            gains: vec![GainNode {
                id: Self::OUTPUT,
                gain: ATTACK_FLOOR,
            }],
            connections: Vec::new(),
        }
    }

    fn next_id(&self) -> NodeId {
        NodeId((self.oscillators.len() + self.gains.len()) as u32)
    }

    fn oscillator(&mut self, waveform: Waveform, frequency: f64) -> NodeId {
        let id = self.next_id();
        self.oscillators.push(OscillatorNode {
            id,
            waveform,
            frequency,
        });
        id
    }

    fn gain(&mut self, gain: f64) -> NodeId {
        let id = self.next_id();
        self.gains.push(GainNode { id, gain });
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId, input: Input) {
        self.connections.push(Connection { from, to, input });
    }

    /// Oscillator whose end-of-life marks the end of the voice
    pub fn primary(&self) -> Option<&OscillatorNode> {
        self.oscillators.first()
    }

    pub fn oscillator_count(&self) -> usize {
        self.oscillators.len()
    }

    /// Gain of the node an oscillator's signal feeds, if it feeds a gain node
    pub fn amplitude_of(&self, oscillator: NodeId) -> Option<f64> {
        let target = self
            .connections
            .iter()
            .find(|c| c.from == oscillator && c.input == Input::Signal)?
            .to;
        self.gains.iter().find(|g| g.id == target).map(|g| g.gain)
    }
}

/// Builds voice graphs for each topology
pub struct TopologyBuilder;

impl TopologyBuilder {
    pub fn build(topology: &Topology, frequency: f64, waveform: Waveform) -> VoiceGraph {
        let mut graph = VoiceGraph::new();

        match *topology {
            Topology::Additive { partials } => {
                for i in 1..=partials.max(1) {
                    let osc = graph.oscillator(waveform, frequency * i as f64);
                    let level = graph.gain(1.0 / i as f64);
                    graph.connect(osc, level, Input::Signal);
                    graph.connect(level, VoiceGraph::OUTPUT, Input::Signal);
                }
            }
            Topology::Am {
                mod_frequency,
                depth,
            } => {
                let carrier = graph.oscillator(waveform, frequency);
                let modulator = graph.oscillator(Waveform::Sine, mod_frequency);
                let carrier_gain = graph.gain(1.0 - depth);
                let mod_gain = graph.gain(depth);

                graph.connect(modulator, mod_gain, Input::Signal);
                graph.connect(mod_gain, carrier_gain, Input::Gain);
                graph.connect(carrier, carrier_gain, Input::Signal);
                graph.connect(carrier_gain, VoiceGraph::OUTPUT, Input::Signal);
            }
            Topology::Fm {
                mod_frequency,
                index,
            } => {
                let carrier = graph.oscillator(waveform, frequency);
                let modulator = graph.oscillator(Waveform::Sine, mod_frequency);
                let mod_gain = graph.gain(index);

                graph.connect(modulator, mod_gain, Input::Signal);
                graph.connect(mod_gain, carrier, Input::Frequency);
                graph.connect(carrier, VoiceGraph::OUTPUT, Input::Signal);
            }
        }

        graph
    }
}

//! Rendering backend interface
//!
//! The engine programs voices and automation; a backend turns them into sound
//! on its own real-time context and reports when a voice's primary oscillator
//! has ended. Those reports arrive through a lock-free queue so they can be
//! posted from any thread and are only acted on by the engine's owner.

use rtrb::{Consumer, Producer, RingBuffer};
use serde::Serialize;

use crate::error::SynthError;
use crate::synth::{GainSchedule, MasterBus, VoiceGraph, VoiceId};

/// Posting side of the completion queue, owned by the backend
pub struct CompletionSender {
    tx: Producer<VoiceId>,
}

impl CompletionSender {
    /// Report that a voice's primary oscillator has ended.
    ///
    /// Returns false if the queue is full; the caller should retry later.
    pub fn notify(&mut self, voice: VoiceId) -> bool {
        match self.tx.push(voice) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(%voice, "completion queue full");
                false
            }
        }
    }
}

/// Draining side of the completion queue, owned by the engine
pub struct CompletionReceiver {
    rx: Consumer<VoiceId>,
}

impl CompletionReceiver {
    pub fn pop(&mut self) -> Option<VoiceId> {
        self.rx.pop().ok()
    }

    /// Number of completions waiting to be drained
    pub fn pending(&self) -> usize {
        self.rx.slots()
    }
}

/// Create a bounded completion queue
pub fn completion_queue(capacity: usize) -> (CompletionSender, CompletionReceiver) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    (CompletionSender { tx }, CompletionReceiver { rx })
}

/// Everything the engine asks of a rendering backend
pub trait RenderBackend {
    /// Hand over the completion queue; called once by the engine
    fn attach(&mut self, completions: CompletionSender);

    /// Whether new voices can be started
    fn is_ready(&self) -> bool {
        true
    }

    /// Configure the master gain and its LFO
    fn configure_master(&mut self, master: &MasterBus);

    /// Instantiate a voice graph, start its oscillators and apply `gain`
    fn start_voice(
        &mut self,
        voice: VoiceId,
        graph: &VoiceGraph,
        gain: &GainSchedule,
    ) -> Result<(), SynthError>;

    /// Apply further automation to a voice's output gain
    fn schedule_gain(&mut self, voice: VoiceId, gain: &GainSchedule);

    /// Stop all of a voice's oscillators at `at`; a completion follows
    fn stop_voice(&mut self, voice: VoiceId, at: f64);

    /// Stop and disconnect a voice immediately, without a completion
    fn kill_voice(&mut self, voice: VoiceId);

    /// Disconnect a voice whose completion has been handled
    fn disconnect_voice(&mut self, voice: VoiceId);

    /// Give timer-driven backends a chance to post due completions
    fn poll(&mut self, _now: f64) {}
}

/// A backend instruction, as recorded by [`TimelineBackend`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BackendCommand {
    Master { master: MasterBus },
    Start { voice: VoiceId, graph: VoiceGraph, gain: GainSchedule },
    Gain { voice: VoiceId, gain: GainSchedule },
    StopAt { voice: VoiceId, at: f64 },
    Kill { voice: VoiceId },
    Disconnect { voice: VoiceId },
}

impl BackendCommand {
    pub fn voice(&self) -> Option<VoiceId> {
        match self {
            BackendCommand::Master { .. } => None,
            BackendCommand::Start { voice, .. }
            | BackendCommand::Gain { voice, .. }
            | BackendCommand::StopAt { voice, .. }
            | BackendCommand::Kill { voice }
            | BackendCommand::Disconnect { voice } => Some(*voice),
        }
    }
}

/// Backend that records instructions and ends voices on a timer.
///
/// Once [`RenderBackend::poll`] sees the clock pass a voice's stop time the
/// voice's completion is posted, as a real backend would on oscillator end.
pub struct TimelineBackend {
    commands: Vec<BackendCommand>,
    pending_stops: Vec<(VoiceId, f64)>,
    completions: Option<CompletionSender>,
    ready: bool,
}

impl TimelineBackend {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            pending_stops: Vec::new(),
            completions: None,
            ready: true,
        }
    }

    /// Simulate a backend that is not (or no longer) available
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Remove and return everything recorded so far
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Commands addressed to `voice`
    pub fn commands_for(&self, voice: VoiceId) -> Vec<&BackendCommand> {
        self.commands
            .iter()
            .filter(|c| c.voice() == Some(voice))
            .collect()
    }

    /// Voices with a stop scheduled but not yet completed
    pub fn pending_stops(&self) -> usize {
        self.pending_stops.len()
    }

    /// Latest scheduled stop time among voices not yet completed
    pub fn last_stop_time(&self) -> Option<f64> {
        self.pending_stops
            .iter()
            .map(|&(_, at)| at)
            .max_by(|a, b| a.total_cmp(b))
    }
}

impl Default for TimelineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for TimelineBackend {
    fn attach(&mut self, completions: CompletionSender) {
        self.completions = Some(completions);
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn configure_master(&mut self, master: &MasterBus) {
        self.commands.push(BackendCommand::Master { master: *master });
    }

    fn start_voice(
        &mut self,
        voice: VoiceId,
        graph: &VoiceGraph,
        gain: &GainSchedule,
    ) -> Result<(), SynthError> {
        if !self.ready {
            return Err(SynthError::BackendUnavailable);
        }
        self.commands.push(BackendCommand::Start {
            voice,
            graph: graph.clone(),
            gain: gain.clone(),
        });
        Ok(())
    }

    fn schedule_gain(&mut self, voice: VoiceId, gain: &GainSchedule) {
        self.commands.push(BackendCommand::Gain {
            voice,
            gain: gain.clone(),
        });
    }

    fn stop_voice(&mut self, voice: VoiceId, at: f64) {
        self.commands.push(BackendCommand::StopAt { voice, at });
        self.pending_stops.retain(|(v, _)| *v != voice);
        self.pending_stops.push((voice, at));
    }

    fn kill_voice(&mut self, voice: VoiceId) {
        self.commands.push(BackendCommand::Kill { voice });
        self.pending_stops.retain(|(v, _)| *v != voice);
    }

    fn disconnect_voice(&mut self, voice: VoiceId) {
        self.commands.push(BackendCommand::Disconnect { voice });
    }

    fn poll(&mut self, now: f64) {
        let Some(completions) = self.completions.as_mut() else {
            return;
        };
        // Anything that cannot be posted stays pending for the next poll
        self.pending_stops
            .retain(|&(voice, at)| at > now || !completions.notify(voice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{Topology, TopologyBuilder, Waveform};

    fn graph() -> VoiceGraph {
        TopologyBuilder::build(&Topology::Additive { partials: 1 }, 440.0, Waveform::Sine)
    }

    #[test]
    fn test_completion_queue() {
        let (mut tx, mut rx) = completion_queue(2);
        assert!(tx.notify(VoiceId(1)));
        assert!(tx.notify(VoiceId(2)));
        assert!(!tx.notify(VoiceId(3)));
        assert_eq!(rx.pending(), 2);
        assert_eq!(rx.pop(), Some(VoiceId(1)));
        assert_eq!(rx.pop(), Some(VoiceId(2)));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_timeline_completes_after_stop_time() {
        let (tx, mut rx) = completion_queue(8);
        let mut backend = TimelineBackend::new();
        backend.attach(tx);

        backend.start_voice(VoiceId(1), &graph(), &GainSchedule::new()).unwrap();
        backend.stop_voice(VoiceId(1), 1.0);

        backend.poll(0.5);
        assert_eq!(rx.pop(), None);

        backend.poll(1.0);
        assert_eq!(rx.pop(), Some(VoiceId(1)));
        assert_eq!(backend.pending_stops(), 0);
    }

    #[test]
    fn test_last_stop_time() {
        let mut backend = TimelineBackend::new();
        assert_eq!(backend.last_stop_time(), None);

        backend.stop_voice(VoiceId(1), 6.5);
        backend.stop_voice(VoiceId(2), 1.2);
        assert_eq!(backend.last_stop_time(), Some(6.5));

        backend.kill_voice(VoiceId(1));
        assert_eq!(backend.last_stop_time(), Some(1.2));
    }

    #[test]
    fn test_kill_cancels_pending_stop() {
        let (tx, mut rx) = completion_queue(8);
        let mut backend = TimelineBackend::new();
        backend.attach(tx);

        backend.stop_voice(VoiceId(4), 1.0);
        backend.kill_voice(VoiceId(4));
        backend.poll(5.0);

        assert_eq!(rx.pop(), None);
        assert_eq!(backend.commands_for(VoiceId(4)).len(), 2);
    }

    #[test]
    fn test_full_queue_retries() {
        let (tx, mut rx) = completion_queue(1);
        let mut backend = TimelineBackend::new();
        backend.attach(tx);

        backend.stop_voice(VoiceId(1), 0.1);
        backend.stop_voice(VoiceId(2), 0.1);
        backend.poll(1.0);
        assert_eq!(backend.pending_stops(), 1);

        assert_eq!(rx.pop(), Some(VoiceId(1)));
        backend.poll(1.0);
        assert_eq!(rx.pop(), Some(VoiceId(2)));
    }

    #[test]
    fn test_not_ready_rejects_start() {
        let mut backend = TimelineBackend::new();
        backend.set_ready(false);
        assert!(!backend.is_ready());
        assert_eq!(
            backend.start_voice(VoiceId(1), &graph(), &GainSchedule::new()),
            Err(SynthError::BackendUnavailable)
        );
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn test_commands_serialize() {
        let mut backend = TimelineBackend::new();
        backend.stop_voice(VoiceId(9), 2.5);
        let json = serde_json::to_string(backend.commands()).unwrap();
        assert_eq!(json, r#"[{"op":"stop_at","voice":9,"at":2.5}]"#);
    }
}

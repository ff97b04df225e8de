//! Voice engine
//!
//! The [`VoiceManager`] owns the live-voice table and is driven from a single
//! thread: note events, parameter changes and display ticks all go through
//! it. Backend completions are queued and applied by [`VoiceManager::pump`].

mod backend;
mod clock;
mod script;

pub use backend::{
    completion_queue, BackendCommand, CompletionReceiver, CompletionSender, RenderBackend,
    TimelineBackend,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use script::{
    plan, Plan, PlanFrame, Rejection, Script, ScriptCursor, ScriptEvent, TimedCommand,
};

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::{EngineConfig, SynthConfig};
use crate::error::SynthError;
use crate::synth::{
    EnvelopeModel, GainNormalizer, LaneAllocator, NoteKey, Param, SynthMode, SynthParams,
    TopologyBuilder, Voice, VoiceId, Waveform,
};
use crate::viz::VoiceVisual;

/// Polyphonic voice lifecycle manager
pub struct VoiceManager<B: RenderBackend, C: Clock> {
    params: SynthParams,
    voices: BTreeMap<NoteKey, Voice>,
    lanes: LaneAllocator,
    normalizer: GainNormalizer,
    backend: B,
    clock: C,
    completions: CompletionReceiver,
    next_id: u64,
}

impl<B: RenderBackend, C: Clock> VoiceManager<B, C> {
    /// Create a manager and hand the backend its completion queue
    pub fn new(params: SynthParams, engine: &EngineConfig, mut backend: B, clock: C) -> Self {
        let (tx, rx) = completion_queue(engine.completion_queue);
        backend.attach(tx);
        backend.configure_master(&params.master);

        Self {
            params,
            voices: BTreeMap::new(),
            lanes: LaneAllocator::new(),
            normalizer: GainNormalizer::new(engine.base_peak, engine.rescale_ramp),
            backend,
            clock,
            completions: rx,
            next_id: 0,
        }
    }

    pub fn from_config(config: &SynthConfig, backend: B, clock: C) -> Self {
        Self::new(SynthParams::from(config), &config.engine, backend, clock)
    }

    /// Start a voice for `key`, replacing any live voice on the same key.
    ///
    /// A replaced voice is cut immediately without a release tail and its
    /// lane passes to the new voice. On error nothing changes: no new voice
    /// exists and any voice already on `key` keeps sounding.
    pub fn note_on(
        &mut self,
        key: impl Into<NoteKey>,
        frequency: f64,
        mode: SynthMode,
    ) -> Result<VoiceId, SynthError> {
        let key = key.into();
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(SynthError::InvalidFrequency(frequency));
        }
        if !self.backend.is_ready() {
            return Err(SynthError::BackendUnavailable);
        }

        self.pump();
        let now = self.clock.now();

        let previous = self.voices.get(&key).map(|v| (v.id(), v.lane()));
        let others = self.voices.len() - usize::from(previous.is_some());

        let topology = self.params.topology.topology(mode);
        let graph = TopologyBuilder::build(&topology, frequency, self.params.waveform);
        let id = VoiceId(self.next_id);
        self.next_id += 1;

        let lane = match previous {
            Some((_, lane)) => lane,
            None => self.lanes.acquire(),
        };
        let peak = self.normalizer.target_peak(others + 1);
        let voice = Voice::new(id, key.clone(), frequency, topology, graph, lane, now, peak);
        let schedule =
            EnvelopeModel::schedule_gain(&self.params.envelope, &voice.timeline(), peak, now);

        if let Err(err) = self.backend.start_voice(id, voice.graph(), &schedule) {
            if previous.is_none() {
                self.lanes.release(lane);
            }
            return Err(err);
        }

        if let Some((old, _)) = previous {
            debug!(%key, voice = %old, "retrigger, cutting previous voice");
            self.backend.kill_voice(old);
        }

        debug!(%key, voice = %id, frequency, %mode, lane = lane.0, "note on");
        self.voices.insert(key, voice);
        self.rescale(now, Some(id));
        Ok(id)
    }

    /// [`Self::note_on`] with the mode given by name
    pub fn note_on_named(
        &mut self,
        key: impl Into<NoteKey>,
        frequency: f64,
        mode: &str,
    ) -> Result<VoiceId, SynthError> {
        let mode: SynthMode = mode.parse()?;
        self.note_on(key, frequency, mode)
    }

    /// Release the voice for `key`.
    ///
    /// Returns false when there is no live voice or it is already releasing;
    /// both are expected under rapid key repeat and change nothing.
    pub fn note_off(&mut self, key: impl Into<NoteKey>) -> bool {
        let key = key.into();
        self.pump();
        let now = self.clock.now();

        let Some(voice) = self.voices.get_mut(&key) else {
            trace!(%key, "note off without live voice");
            return false;
        };
        if !voice.release(now) {
            return false;
        }

        let envelope = &self.params.envelope;
        let schedule =
            EnvelopeModel::schedule_gain(envelope, &voice.timeline(), voice.target_peak(), now);
        let id = voice.id();

        self.backend.schedule_gain(id, &schedule);
        self.backend.stop_voice(id, now + envelope.release_window());
        debug!(%key, voice = %id, "note off");
        true
    }

    /// Release every held voice, returning how many were released
    pub fn release_all(&mut self) -> usize {
        let keys: Vec<NoteKey> = self
            .voices
            .values()
            .filter(|v| !v.is_releasing())
            .map(|v| v.key().clone())
            .collect();
        keys.into_iter().filter(|key| self.note_off(key.clone())).count()
    }

    /// Apply queued backend completions. Returns the number of voices removed.
    pub fn pump(&mut self) -> usize {
        let now = self.clock.now();
        self.backend.poll(now);

        let mut removed = 0;
        while let Some(id) = self.completions.pop() {
            let key = self
                .voices
                .values()
                .find(|v| v.id() == id)
                .map(|v| v.key().clone());
            let Some(key) = key else {
                trace!(voice = %id, "completion for voice no longer live");
                continue;
            };
            if let Some(voice) = self.voices.remove(&key) {
                self.lanes.release(voice.lane());
                self.backend.disconnect_voice(id);
                debug!(%key, voice = %id, "voice ended");
                removed += 1;
            }
        }

        if removed > 0 {
            self.rescale(now, None);
        }
        removed
    }

    /// One display refresh: apply completions, advance wave phases and
    /// return the frame to draw
    pub fn tick(&mut self) -> Vec<VoiceVisual> {
        self.pump();
        for voice in self.voices.values_mut() {
            voice.advance_phase();
        }
        self.snapshot()
    }

    /// Visual state of every live voice at the current time
    pub fn snapshot(&self) -> Vec<VoiceVisual> {
        let now = self.clock.now();
        self.voices
            .values()
            .map(|v| VoiceVisual::capture(v, &self.params.envelope, now))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, key: &NoteKey) -> Result<&Voice, SynthError> {
        self.voices
            .get(key)
            .ok_or_else(|| SynthError::UnknownVoice(key.clone()))
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    /// Lanes not held by any live voice
    pub fn free_lanes(&self) -> usize {
        self.lanes.available()
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    /// Update a named parameter; applies to voices from now on
    pub fn set_param(&mut self, param: Param, value: f64) {
        self.params.set(param, value);
        trace!(?param, value = self.params.get(param), "parameter changed");
        if param.affects_master() {
            self.backend.configure_master(&self.params.master);
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.params.waveform = waveform;
    }

    pub fn set_mode(&mut self, mode: SynthMode) {
        self.params.mode = mode;
    }

    /// Mode used when the input layer does not pick one
    pub fn mode(&self) -> SynthMode {
        self.params.mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn rescale(&mut self, now: f64, fresh: Option<VoiceId>) {
        let schedules = self.normalizer.rescale(
            self.voices.values_mut(),
            &self.params.envelope,
            now,
            fresh,
        );
        if !self.voices.is_empty() {
            debug!(
                voices = self.voices.len(),
                peak = self.normalizer.target_peak(self.voices.len()),
                "rescaled"
            );
        }
        for (id, schedule) in &schedules {
            self.backend.schedule_gain(*id, schedule);
        }
    }
}

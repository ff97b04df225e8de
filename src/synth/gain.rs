//! Gain automation and population-based normalisation
//!
//! Every change to a voice's output gain is expressed as a list of
//! automation points the rendering backend executes on its own clock.

use serde::{Deserialize, Serialize};

use super::envelope::{EnvelopeModel, EnvelopeParameters, EnvelopeStage};
use super::voice::{Voice, VoiceId};

/// Shape of the transition into an automation point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Curve {
    /// Drop every automation point scheduled at or after `time`
    Cancel,
    /// Pin the parameter at its current value; `value` is the model's estimate
    Hold,
    /// Jump to `value` at `time`
    Set,
    /// Exponential ramp ending at `value` at `time`
    Exponential,
    /// Approach `value` from `time` onward with the given time constant
    Target { time_constant: f64 },
}

/// One scheduled parameter change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub time: f64,
    pub value: f64,
    pub curve: Curve,
}

impl AutomationPoint {
    pub fn new(time: f64, value: f64, curve: Curve) -> Self {
        Self { time, value, curve }
    }
}

/// Ordered automation for a voice's output gain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainSchedule {
    pub points: Vec<AutomationPoint>,
}

impl GainSchedule {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Append a point (builder pattern)
    pub fn then(mut self, time: f64, value: f64, curve: Curve) -> Self {
        self.points.push(AutomationPoint::new(time, value, curve));
        self
    }

    /// Final value the schedule settles on
    pub fn final_value(&self) -> Option<f64> {
        self.points
            .iter()
            .rev()
            .find(|p| !matches!(p.curve, Curve::Cancel))
            .map(|p| p.value)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Keeps the summed peak of all live voices within `base_peak`
#[derive(Debug, Clone, Copy)]
pub struct GainNormalizer {
    base_peak: f64,
    ramp: f64,
}

impl GainNormalizer {
    pub fn new(base_peak: f64, ramp: f64) -> Self {
        Self {
            base_peak,
            ramp: ramp.max(0.001),
        }
    }

    pub fn base_peak(&self) -> f64 {
        self.base_peak
    }

    /// Per-voice peak for a population of `count` voices
    pub fn target_peak(&self, count: usize) -> f64 {
        self.base_peak / count.max(1) as f64
    }

    /// Recompute every voice's target peak and build the ramps that move the
    /// backend gains there.
    ///
    /// Releasing voices get their new target recorded but no automation, as
    /// does `fresh` (a voice whose note-on schedule already uses the new peak).
    pub fn rescale<'a, I>(
        &self,
        voices: I,
        params: &EnvelopeParameters,
        now: f64,
        fresh: Option<VoiceId>,
    ) -> Vec<(VoiceId, GainSchedule)>
    where
        I: IntoIterator<Item = &'a mut Voice>,
    {
        let mut voices: Vec<&mut Voice> = voices.into_iter().collect();
        if voices.is_empty() {
            return Vec::new();
        }

        let target = self.target_peak(voices.len());
        let mut schedules = Vec::with_capacity(voices.len());

        for voice in voices.iter_mut() {
            let previous = voice.target_peak();
            voice.set_target_peak(target);

            if Some(voice.id()) == fresh {
                continue;
            }

            let timeline = voice.timeline();
            let position = EnvelopeModel::locate(params, &timeline, now);
            let current = EnvelopeModel::audio_gain(params, &timeline, previous, now);
            let sustain = EnvelopeModel::sustain_gain(params, target);
            let settle = now + self.ramp;

            let schedule = GainSchedule::new()
                .then(now, 0.0, Curve::Cancel)
                .then(now, current, Curve::Hold);

            let schedule = match position.stage {
                EnvelopeStage::Attack => {
                    let peak_at = (timeline.started_at + params.attack).max(settle);
                    let sustain_at =
                        (timeline.started_at + params.attack + params.decay).max(peak_at);
                    schedule
                        .then(peak_at, target, Curve::Exponential)
                        .then(sustain_at, sustain, Curve::Exponential)
                }
                EnvelopeStage::Decay => {
                    let sustain_at =
                        (timeline.started_at + params.attack + params.decay).max(settle);
                    schedule.then(sustain_at, sustain, Curve::Exponential)
                }
                EnvelopeStage::Sustain => schedule.then(settle, sustain, Curve::Exponential),
                EnvelopeStage::Release => continue,
            };

            schedules.push((voice.id(), schedule));
        }

        schedules
    }
}

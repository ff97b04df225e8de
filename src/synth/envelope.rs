//! ADSR envelope model
//!
//! Stage boundaries are computed once, in [`EnvelopeModel::locate`], and both
//! consumers read from it: the audio path turns a stage into exponential gain
//! automation, the visual path into a linear amplitude for drawing. The curve
//! shapes differ but the two can never disagree about which stage a voice is in.
//!
//! Parameters are passed in on every call so that knob changes apply to all
//! voices from the moment they happen.

use serde::{Deserialize, Serialize};

use super::gain::{Curve, GainSchedule};

/// Peak of the visual amplitude curve
pub const VISUAL_PEAK: f64 = 30.0;

/// Starting gain of the attack ramp (exponential ramps cannot start at zero)
pub const ATTACK_FLOOR: f64 = 1e-5;

/// Gain the release curve approaches
pub const RELEASE_FLOOR: f64 = 1e-4;

/// Release window (and oscillator hard stop) as a multiple of `release`
pub const RELEASE_TAIL: f64 = 3.0;

/// Process-wide ADSR parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeParameters {
    /// Attack time in seconds
    pub attack: f64,
    /// Decay time in seconds
    pub decay: f64,
    /// Sustain level (0.0-1.0)
    pub sustain: f64,
    /// Release time in seconds
    pub release: f64,
}

impl Default for EnvelopeParameters {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.08,
            sustain: 0.35,
            release: 0.15,
        }
    }
}

impl EnvelopeParameters {
    /// Create parameters, clamping each to its valid range
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        let mut params = Self::default();
        params.set_attack(attack);
        params.set_decay(decay);
        params.set_sustain(sustain);
        params.set_release(release);
        params
    }

    /// Set attack time in seconds
    pub fn set_attack(&mut self, seconds: f64) {
        self.attack = seconds.max(0.001); // Minimum 1ms
    }

    /// Set decay time in seconds
    pub fn set_decay(&mut self, seconds: f64) {
        self.decay = seconds.max(0.001);
    }

    /// Set sustain level (0.0-1.0)
    pub fn set_sustain(&mut self, level: f64) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Set release time in seconds
    pub fn set_release(&mut self, seconds: f64) {
        self.release = seconds.max(0.001);
    }

    /// Duration of the release tail, after which oscillators are stopped
    pub fn release_window(&self) -> f64 {
        self.release * RELEASE_TAIL
    }

    /// Time constant of the audio release curve
    pub fn release_time_constant(&self) -> f64 {
        self.release / RELEASE_TAIL
    }
}

/// Audio envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Visual envelope stage; `Silent` once the release window has run out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStage {
    Attack,
    Decay,
    Sustain,
    Release,
    Silent,
}

/// Note-on / note-off timestamps of a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub started_at: f64,
    pub released_at: Option<f64>,
}

impl Timeline {
    pub fn started(at: f64) -> Self {
        Self {
            started_at: at,
            released_at: None,
        }
    }

    /// Same timeline with the release removed
    fn held(&self) -> Self {
        Self {
            started_at: self.started_at,
            released_at: None,
        }
    }
}

/// Where a voice sits in its envelope at a given instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagePosition {
    pub stage: EnvelopeStage,
    /// Seconds spent in the current stage
    pub elapsed: f64,
    /// Fraction of the stage completed (0.0-1.0); always 1.0 in sustain
    pub progress: f64,
}

/// Stage computation plus the audio and visual curves built on it
pub struct EnvelopeModel;

impl EnvelopeModel {
    /// Locate the stage of `timeline` at `now`
    pub fn locate(params: &EnvelopeParameters, timeline: &Timeline, now: f64) -> StagePosition {
        if let Some(released_at) = timeline.released_at {
            let elapsed = (now - released_at).max(0.0);
            return StagePosition {
                stage: EnvelopeStage::Release,
                elapsed,
                progress: (elapsed / params.release_window()).min(1.0),
            };
        }

        let elapsed = (now - timeline.started_at).max(0.0);
        if elapsed < params.attack {
            StagePosition {
                stage: EnvelopeStage::Attack,
                elapsed,
                progress: elapsed / params.attack,
            }
        } else if elapsed < params.attack + params.decay {
            let in_decay = elapsed - params.attack;
            StagePosition {
                stage: EnvelopeStage::Decay,
                elapsed: in_decay,
                progress: (in_decay / params.decay).clamp(0.0, 1.0),
            }
        } else {
            StagePosition {
                stage: EnvelopeStage::Sustain,
                elapsed: elapsed - params.attack - params.decay,
                progress: 1.0,
            }
        }
    }

    /// Stage as seen by the renderer
    pub fn visual_stage(params: &EnvelopeParameters, timeline: &Timeline, now: f64) -> VisualStage {
        let position = Self::locate(params, timeline, now);
        match position.stage {
            EnvelopeStage::Attack => VisualStage::Attack,
            EnvelopeStage::Decay => VisualStage::Decay,
            EnvelopeStage::Sustain => VisualStage::Sustain,
            EnvelopeStage::Release if position.progress >= 1.0 => VisualStage::Silent,
            EnvelopeStage::Release => VisualStage::Release,
        }
    }

    /// Linear amplitude for drawing (0 to [`VISUAL_PEAK`])
    pub fn visual_amplitude(params: &EnvelopeParameters, timeline: &Timeline, now: f64) -> f64 {
        let position = Self::locate(params, timeline, now);
        let sustain = VISUAL_PEAK * params.sustain;
        match position.stage {
            EnvelopeStage::Attack => VISUAL_PEAK * position.progress,
            EnvelopeStage::Decay => {
                VISUAL_PEAK * (1.0 - position.progress * (1.0 - params.sustain))
            }
            EnvelopeStage::Sustain => sustain,
            EnvelopeStage::Release => sustain * (1.0 - position.progress),
        }
    }

    /// Sustain gain for a voice peaking at `peak`, kept above the ramp floor
    pub fn sustain_gain(params: &EnvelopeParameters, peak: f64) -> f64 {
        (peak * params.sustain).max(ATTACK_FLOOR)
    }

    /// Gain the backend is expected to be producing at `now`
    pub fn audio_gain(params: &EnvelopeParameters, timeline: &Timeline, peak: f64, now: f64) -> f64 {
        let held = |at: f64| {
            let position = Self::locate(params, &timeline.held(), at);
            match position.stage {
                EnvelopeStage::Attack => exponential(ATTACK_FLOOR, peak, position.progress),
                EnvelopeStage::Decay => {
                    exponential(peak, Self::sustain_gain(params, peak), position.progress)
                }
                _ => Self::sustain_gain(params, peak),
            }
        };

        match timeline.released_at {
            None => held(now),
            Some(released_at) => {
                let start = held(released_at);
                let dt = (now - released_at).max(0.0);
                RELEASE_FLOOR
                    + (start - RELEASE_FLOOR) * (-dt / params.release_time_constant()).exp()
            }
        }
    }

    /// Gain automation for the voice's current lifecycle point.
    ///
    /// A held voice gets the full attack/decay/sustain schedule from its start
    /// time; a released voice gets the release tail from `now`.
    pub fn schedule_gain(
        params: &EnvelopeParameters,
        timeline: &Timeline,
        peak: f64,
        now: f64,
    ) -> GainSchedule {
        match timeline.released_at {
            None => {
                let start = timeline.started_at;
                GainSchedule::new()
                    .then(start, ATTACK_FLOOR, Curve::Set)
                    .then(start + params.attack, peak, Curve::Exponential)
                    .then(
                        start + params.attack + params.decay,
                        Self::sustain_gain(params, peak),
                        Curve::Exponential,
                    )
            }
            Some(_) => {
                let current = Self::audio_gain(params, &timeline.held(), peak, now);
                GainSchedule::new()
                    .then(now, 0.0, Curve::Cancel)
                    .then(now, current, Curve::Hold)
                    .then(
                        now,
                        RELEASE_FLOOR,
                        Curve::Target {
                            time_constant: params.release_time_constant(),
                        },
                    )
            }
        }
    }
}

/// Value of an exponential ramp from `from` to `to` at `progress`
fn exponential(from: f64, to: f64, progress: f64) -> f64 {
    from * (to / from).powf(progress.clamp(0.0, 1.0))
}

//! Timed note scripts
//!
//! A script is a YAML list of note and parameter events. It can be played
//! live against the system clock or planned offline, which records every
//! backend instruction together with the time it was issued.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::backend::{BackendCommand, RenderBackend, TimelineBackend};
use super::clock::{Clock, ManualClock};
use super::VoiceManager;
use crate::config::SynthConfig;
use crate::error::SynthError;
use crate::synth::{NoteKey, Param, SynthMode, Waveform};
use crate::viz::VoiceVisual;

/// Shortest display tick `plan` will step by
const MIN_FRAME_INTERVAL: f64 = 0.001;

/// One scripted input event, `at` seconds after the script starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    NoteOn {
        at: f64,
        key: NoteKey,
        frequency: f64,
        /// Falls back to the engine's current mode
        #[serde(default)]
        mode: Option<SynthMode>,
    },
    NoteOff {
        at: f64,
        key: NoteKey,
    },
    Set {
        at: f64,
        param: Param,
        value: f64,
    },
    Waveform {
        at: f64,
        waveform: Waveform,
    },
    Mode {
        at: f64,
        mode: SynthMode,
    },
    ReleaseAll {
        at: f64,
    },
}

impl ScriptEvent {
    pub fn at(&self) -> f64 {
        match *self {
            ScriptEvent::NoteOn { at, .. }
            | ScriptEvent::NoteOff { at, .. }
            | ScriptEvent::Set { at, .. }
            | ScriptEvent::Waveform { at, .. }
            | ScriptEvent::Mode { at, .. }
            | ScriptEvent::ReleaseAll { at } => at,
        }
    }

    /// Feed this event to a voice manager
    pub fn apply<B: RenderBackend, C: Clock>(
        &self,
        manager: &mut VoiceManager<B, C>,
    ) -> Result<(), SynthError> {
        match self {
            ScriptEvent::NoteOn {
                key,
                frequency,
                mode,
                ..
            } => {
                let mode = mode.unwrap_or_else(|| manager.mode());
                manager.note_on(key.clone(), *frequency, mode)?;
            }
            ScriptEvent::NoteOff { key, .. } => {
                manager.note_off(key.clone());
            }
            ScriptEvent::Set { param, value, .. } => manager.set_param(*param, *value),
            ScriptEvent::Waveform { waveform, .. } => manager.set_waveform(*waveform),
            ScriptEvent::Mode { mode, .. } => manager.set_mode(*mode),
            ScriptEvent::ReleaseAll { .. } => {
                manager.release_all();
            }
        }
        Ok(())
    }
}

/// An ordered list of events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

impl Script {
    /// Load and validate a script file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing script {}", path.display()))
    }

    /// Parse a script, ordering events by time (stable for equal times)
    pub fn parse(yaml: &str) -> Result<Self> {
        let mut script: Script = serde_yaml::from_str(yaml)?;
        for event in &script.events {
            let at = event.at();
            if !at.is_finite() || at < 0.0 {
                bail!("Event time must be a non-negative number, got {}", at);
            }
        }
        script.events.sort_by(|a, b| a.at().total_cmp(&b.at()));
        Ok(script)
    }

    /// Time of the last event
    pub fn end_time(&self) -> f64 {
        self.events.last().map(|e| e.at()).unwrap_or(0.0)
    }

    pub fn cursor(&self) -> ScriptCursor<'_> {
        ScriptCursor {
            events: &self.events,
            next: 0,
        }
    }
}

/// Walks a script in time order
pub struct ScriptCursor<'a> {
    events: &'a [ScriptEvent],
    next: usize,
}

impl<'a> ScriptCursor<'a> {
    /// Time of the next event not yet returned
    pub fn peek_time(&self) -> Option<f64> {
        self.events.get(self.next).map(|e| e.at())
    }

    /// Every remaining event due at or before `now`
    pub fn due(&mut self, now: f64) -> &'a [ScriptEvent] {
        let start = self.next;
        while self.events.get(self.next).is_some_and(|e| e.at() <= now) {
            self.next += 1;
        }
        &self.events[start..self.next]
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.events.len()
    }
}

/// A backend instruction stamped with the engine time it was issued at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCommand {
    pub time: f64,
    pub command: BackendCommand,
}

/// Visual state captured at one display tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanFrame {
    pub time: f64,
    pub voices: Vec<VoiceVisual>,
}

/// An event the engine refused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub time: f64,
    pub error: String,
}

/// Result of running a script offline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub commands: Vec<TimedCommand>,
    pub frames: Vec<PlanFrame>,
    pub rejected: Vec<Rejection>,
    /// Voices still held when the script ended
    pub held: Vec<NoteKey>,
}

impl Plan {
    fn record(&mut self, time: f64, commands: Vec<BackendCommand>) {
        self.commands
            .extend(commands.into_iter().map(|command| TimedCommand { time, command }));
    }
}

/// Run `script` on a manual clock and record what the backend is asked to do.
///
/// With `frame_interval` set, display ticks are interleaved with the events
/// until the last scheduled stop has passed. Intervals below 1 ms are raised
/// to 1 ms.
pub fn plan(config: &SynthConfig, script: &Script, frame_interval: Option<f64>) -> Plan {
    let clock = ManualClock::new();
    let mut manager = VoiceManager::from_config(config, TimelineBackend::new(), clock.clone());
    let mut plan = Plan::default();
    plan.record(clock.now(), manager.backend_mut().take_commands());

    let interval = frame_interval
        .filter(|i| i.is_finite() && *i > 0.0)
        .map(|i| i.max(MIN_FRAME_INTERVAL));
    let mut next_frame = interval.map(|_| 0.0);
    let mut cursor = script.cursor();

    loop {
        let horizon = stop_horizon(script, &manager);
        let event_at = cursor.peek_time();
        let at = match (event_at, next_frame) {
            (Some(e), Some(f)) => e.min(f),
            (Some(e), None) => e,
            (None, Some(f)) if f <= horizon => f,
            _ => break,
        };
        clock.set(at);

        if event_at == Some(at) {
            for event in cursor.due(at) {
                if let Err(err) = event.apply(&mut manager) {
                    warn!(time = at, %err, "script event rejected");
                    plan.rejected.push(Rejection {
                        time: at,
                        error: err.to_string(),
                    });
                }
            }
        } else {
            let voices = manager.tick();
            plan.frames.push(PlanFrame { time: at, voices });
            next_frame = next_frame.zip(interval).map(|(f, i)| f + i);
        }
        plan.record(at, manager.backend_mut().take_commands());
    }

    // Let outstanding releases run out
    clock.set(stop_horizon(script, &manager));
    while manager.pump() > 0 && manager.backend().pending_stops() > 0 {}
    plan.record(clock.now(), manager.backend_mut().take_commands());
    plan.held = manager.voices().map(|v| v.key().clone()).collect();

    plan
}

/// Time by which every scheduled stop has passed, including stops issued
/// under an earlier release setting
fn stop_horizon(script: &Script, manager: &VoiceManager<TimelineBackend, ManualClock>) -> f64 {
    let window_end = script.end_time() + manager.params().envelope.release_window();
    manager
        .backend()
        .last_stop_time()
        .map_or(window_end, |stop| stop.max(window_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::VoiceId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCRIPT: &str = r#"
events:
  - { event: note_off, at: 1.0, key: A }
  - { event: note_on, at: 0.0, key: A, frequency: 261.63 }
  - { event: note_on, at: 0.5, key: B, frequency: 329.63, mode: fm }
  - { event: note_off, at: 1.5, key: B }
"#;

    #[test]
    fn test_parse_sorts_events() {
        let script = Script::parse(SCRIPT).unwrap();
        let times: Vec<f64> = script.events.iter().map(|e| e.at()).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(script.end_time(), 1.5);
        assert_eq!(
            script.events[1],
            ScriptEvent::NoteOn {
                at: 0.5,
                key: NoteKey::from("B"),
                frequency: 329.63,
                mode: Some(SynthMode::Fm),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_events() {
        assert!(Script::parse("events:\n  - { event: note_off, at: -1, key: A }\n").is_err());
        assert!(Script::parse("events:\n  - { event: bend, at: 0 }\n").is_err());
        assert!(Script::parse("events:\n  - { event: set, at: 0, param: cutoff, value: 1 }\n")
            .is_err());
        assert_eq!(Script::parse("{}").unwrap(), Script::default());
    }

    #[test]
    fn test_load_script_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCRIPT.as_bytes()).unwrap();
        let script = Script::load(file.path()).unwrap();
        assert_eq!(script.events.len(), 4);

        let err = Script::load(Path::new("/nonexistent/script.yaml")).unwrap_err();
        assert!(err.to_string().contains("reading script"));
    }

    #[test]
    fn test_cursor_returns_due_events() {
        let script = Script::parse(SCRIPT).unwrap();
        let mut cursor = script.cursor();

        assert_eq!(cursor.due(0.0).len(), 1);
        assert_eq!(cursor.due(0.2).len(), 0);
        assert_eq!(cursor.peek_time(), Some(0.5));
        assert_eq!(cursor.due(1.2).len(), 2);
        assert!(!cursor.is_finished());
        assert_eq!(cursor.due(10.0).len(), 1);
        assert!(cursor.is_finished());
        assert_eq!(cursor.peek_time(), None);
    }

    #[test]
    fn test_apply_uses_engine_mode() {
        let clock = ManualClock::new();
        let mut manager =
            VoiceManager::from_config(&SynthConfig::default(), TimelineBackend::new(), clock);

        ScriptEvent::Mode { at: 0.0, mode: SynthMode::Am }
            .apply(&mut manager)
            .unwrap();
        ScriptEvent::Set { at: 0.0, param: Param::AmDepth, value: 0.25 }
            .apply(&mut manager)
            .unwrap();
        ScriptEvent::NoteOn {
            at: 0.0,
            key: NoteKey::from("A"),
            frequency: 440.0,
            mode: None,
        }
        .apply(&mut manager)
        .unwrap();

        let voice = manager.voice(&NoteKey::from("A")).unwrap();
        assert_eq!(voice.topology().mode(), SynthMode::Am);
        assert_eq!(voice.graph().oscillator_count(), 2);

        let bad = ScriptEvent::NoteOn {
            at: 0.0,
            key: NoteKey::from("B"),
            frequency: -5.0,
            mode: None,
        };
        assert_eq!(
            bad.apply(&mut manager),
            Err(SynthError::InvalidFrequency(-5.0))
        );
    }

    #[test]
    fn test_plan_runs_voices_to_completion() {
        let script = Script::parse(SCRIPT).unwrap();
        let plan = plan(&SynthConfig::default(), &script, None);

        assert!(matches!(
            plan.commands[0].command,
            BackendCommand::Master { .. }
        ));
        assert!(plan.frames.is_empty());
        assert!(plan.rejected.is_empty());
        assert!(plan.held.is_empty());

        for id in [VoiceId(0), VoiceId(1)] {
            assert!(plan
                .commands
                .iter()
                .any(|c| c.command == BackendCommand::Disconnect { voice: id }));
        }

        // B's note-on arrives while A is held and is issued at its event time
        let start_b = plan
            .commands
            .iter()
            .find(|c| matches!(c.command, BackendCommand::Start { voice: VoiceId(1), .. }))
            .unwrap();
        assert_eq!(start_b.time, 0.5);
    }

    #[test]
    fn test_plan_frames() {
        let script = Script::parse(SCRIPT).unwrap();
        let plan = plan(&SynthConfig::default(), &script, Some(0.25));

        let times: Vec<f64> = plan.frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75]);
        assert_eq!(plan.frames[0].voices.len(), 1);
        assert_eq!(plan.frames[3].voices.len(), 2);
        assert_eq!(plan.frames[7].voices.len(), 1);
        assert_eq!(plan.frames[7].voices[0].key, NoteKey::from("B"));
    }

    #[test]
    fn test_plan_waits_for_stops_issued_before_release_change() {
        let script = Script::parse(
            r#"
events:
  - { event: set, at: 0.0, param: release, value: 2.0 }
  - { event: note_on, at: 0.0, key: A, frequency: 261.63 }
  - { event: note_off, at: 0.5, key: A }
  - { event: set, at: 1.0, param: release, value: 0.01 }
"#,
        )
        .unwrap();

        let plan = plan(&SynthConfig::default(), &script, Some(0.5));
        assert!(plan.held.is_empty());

        // Stop was scheduled at 0.5 + 3 * 2.0
        let disconnect = plan
            .commands
            .iter()
            .find(|c| c.command == BackendCommand::Disconnect { voice: VoiceId(0) })
            .unwrap();
        assert!(disconnect.time > 6.4);

        let last_frame = plan.frames.last().unwrap();
        assert!(last_frame.time > 6.0);
        assert!(plan.frames.iter().any(|f| f.time > 5.0 && f.voices.len() == 1));
    }

    #[test]
    fn test_plan_raises_tiny_frame_interval() {
        let script = Script::parse(SCRIPT).unwrap();
        let plan = plan(&SynthConfig::default(), &script, Some(1e-12));

        assert!((plan.frames[1].time - MIN_FRAME_INTERVAL).abs() < 1e-9);
        assert!(plan.frames.len() <= 2000);
        assert!(plan.held.is_empty());
    }

    #[test]
    fn test_plan_reports_rejections_and_held_notes() {
        let script = Script::parse(
            r#"
events:
  - { event: note_on, at: 0.0, key: A, frequency: 0 }
  - { event: note_on, at: 0.1, key: B, frequency: 220 }
"#,
        )
        .unwrap();
        let plan = plan(&SynthConfig::default(), &script, None);

        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].time, 0.0);
        assert_eq!(plan.held, vec![NoteKey::from("B")]);
    }

    #[test]
    fn test_demo_script_plays_out() {
        let script = Script::parse(include_str!("../../demos/arpeggio.yaml")).unwrap();
        let plan = plan(&SynthConfig::default(), &script, Some(0.1));

        assert!(plan.rejected.is_empty());
        assert!(plan.held.is_empty());
        assert!(plan
            .commands
            .iter()
            .any(|c| matches!(c.command, BackendCommand::Kill { .. })));
        assert!(plan.frames.iter().map(|f| f.voices.len()).max().unwrap_or(0) >= 3);
    }

    #[test]
    fn test_plan_serializes() {
        let script = Script::parse(SCRIPT).unwrap();
        let plan = plan(&SynthConfig::default(), &script, Some(0.5));
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["commands"][0]["command"]["op"], "master");
        assert!(json["frames"].as_array().unwrap().len() > 1);
    }
}

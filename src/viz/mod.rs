//! Terminal visualization for polysynth
//!
//! Provides a TUI showing:
//! - One lane per voice with its travelling wave
//! - Envelope stage and key of each voice
//! - Engine status and controls

mod lanes;
mod snapshot;

pub use lanes::{LaneView, PIXELS_PER_COLUMN};
pub use snapshot::{frequency_hue, hsl_to_rgb, VoiceVisual};

use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tracing::{info, warn};

use crate::config::SynthConfig;
use crate::engine::{Clock, Script, SystemClock, TimelineBackend, VoiceManager};
use crate::synth::{SynthParams, VisualStage};

/// Display refresh interval
const FRAME: Duration = Duration::from_millis(16);

/// What the status bar shows
pub struct WatchStatus {
    pub time: f64,
    pub active: usize,
    pub params: SynthParams,
    pub finished: bool,
}

/// Play `script` in real time and draw the voices until the user quits
pub fn run_watch(config: &SynthConfig, script: &Script) -> Result<()> {
    let clock = SystemClock::new();
    let mut manager = VoiceManager::from_config(config, TimelineBackend::new(), clock);
    let mut cursor = script.cursor();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(events = script.events.len(), "watching script");

    // Main loop
    let result = loop {
        let now = manager.clock().now();
        for event in cursor.due(now) {
            if let Err(err) = event.apply(&mut manager) {
                warn!(time = now, %err, "script event rejected");
            }
        }

        let voices = manager.tick();
        // Recorded instructions are not needed live
        manager.backend_mut().take_commands();

        let status = WatchStatus {
            time: now,
            active: manager.active_count(),
            params: *manager.params(),
            finished: cursor.is_finished() && manager.active_count() == 0,
        };

        if let Err(err) = terminal.draw(|f| draw_ui(f, &voices, &status)) {
            break Err(err.into());
        }

        // Handle input
        match poll_key() {
            Ok(Some(Key::Quit)) => break Ok(()),
            Ok(Some(Key::ReleaseAll)) => {
                manager.release_all();
            }
            Ok(None) => {}
            Err(err) => break Err(err),
        }
    };

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

enum Key {
    Quit,
    ReleaseAll,
}

fn poll_key() -> Result<Option<Key>> {
    if !event::poll(FRAME)? {
        return Ok(None);
    }
    let Event::Key(key) = event::read()? else {
        return Ok(None);
    };
    Ok(match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Some(Key::Quit),
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Key::Quit),
        (KeyCode::Char(' '), _) => Some(Key::ReleaseAll),
        _ => None,
    })
}

fn draw_ui(f: &mut Frame, voices: &[VoiceVisual], status: &WatchStatus) {
    let area = f.area();

    // Layout: lanes on top, voice list and status at bottom
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),    // Lanes
            Constraint::Length(3),  // Voices
            Constraint::Length(3),  // Status
        ])
        .split(area);

    let lanes = LaneView::new(voices)
        .block(Block::default().borders(Borders::ALL).title(" Voices "));
    f.render_widget(lanes, chunks[0]);

    draw_voice_list(f, chunks[1], voices);
    draw_status(f, chunks[2], status);
}

fn draw_voice_list(f: &mut Frame, area: Rect, voices: &[VoiceVisual]) {
    let mut spans = vec![Span::raw("  ")];
    for voice in voices {
        let (r, g, b) = hsl_to_rgb(voice.hue, 0.85, 0.6);
        spans.push(Span::styled(
            format!("{} {:.0}Hz {} ", voice.key, voice.frequency, stage_label(voice.stage)),
            Style::default().fg(Color::Rgb(r, g, b)),
        ));
        spans.push(Span::raw(" "));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn draw_status(f: &mut Frame, area: Rect, status: &WatchStatus) {
    let (label, color) = if status.finished {
        ("DONE", Color::Yellow)
    } else {
        ("PLAYING", Color::Green)
    };

    let text = Line::from(vec![
        Span::raw("  Status: "),
        Span::styled(label, Style::default().fg(color)),
        Span::raw(format!(
            "  |  {:.1}s  |  voices: {}  |  {} / {}  |  ",
            status.time, status.active, status.params.mode, status.params.waveform
        )),
        Span::raw("Space: release all  |  q: quit"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn stage_label(stage: VisualStage) -> &'static str {
    match stage {
        VisualStage::Attack => "A",
        VisualStage::Decay => "D",
        VisualStage::Sustain => "S",
        VisualStage::Release => "R",
        VisualStage::Silent => "-",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ManualClock;
    use crate::synth::SynthMode;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_draw_ui() {
        let clock = ManualClock::new();
        let mut manager = VoiceManager::from_config(
            &SynthConfig::default(),
            TimelineBackend::new(),
            clock.clone(),
        );
        manager.note_on("Q", 440.0, SynthMode::Fm).unwrap();
        clock.set(0.5);
        let voices = manager.tick();
        let status = WatchStatus {
            time: 0.5,
            active: manager.active_count(),
            params: *manager.params(),
            finished: false,
        };

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw_ui(f, &voices, &status)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Q 440Hz S"));
        assert!(text.contains("voices: 1"));
        assert!(text.contains("additive / sine"));
        assert!(text.contains("PLAYING"));
        assert!(text.contains("•"));
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(stage_label(VisualStage::Attack), "A");
        assert_eq!(stage_label(VisualStage::Silent), "-");
    }
}

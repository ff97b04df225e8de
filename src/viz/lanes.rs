//! Lane widget for ratatui

use std::f64::consts::TAU;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Widget},
};

use super::snapshot::{hsl_to_rgb, VoiceVisual};
use crate::synth::{VisualStage, LANE_COUNT, VISUAL_PEAK};

/// Horizontal pixels represented by one terminal column
pub const PIXELS_PER_COLUMN: f64 = 8.0;

/// Draws every voice as a travelling wave in its own horizontal lane
pub struct LaneView<'a> {
    voices: &'a [VoiceVisual],
    symbol: &'a str,
    block: Option<Block<'a>>,
}

impl<'a> LaneView<'a> {
    pub fn new(voices: &'a [VoiceVisual]) -> Self {
        Self {
            voices,
            symbol: "•",
            block: None,
        }
    }

    pub fn symbol(mut self, symbol: &'a str) -> Self {
        self.symbol = symbol;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Rows `[top, bottom)` belonging to `lane` within `area`
    fn lane_rows(area: Rect, lane: u8) -> (u16, u16) {
        let lanes = LANE_COUNT as u32;
        let height = area.height as u32;
        let lane = (lane as u32).min(lanes - 1);
        let top = area.y + (lane * height / lanes) as u16;
        let bottom = area.y + ((lane + 1) * height / lanes) as u16;
        (top, bottom.max(top + 1).min(area.y + area.height))
    }

    fn style_for(voice: &VoiceVisual) -> Style {
        let (r, g, b) = hsl_to_rgb(voice.hue, 0.85, 0.6);
        let style = Style::default().fg(Color::Rgb(r, g, b));
        if voice.alpha() < 0.5 {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }

    fn render_voice(&self, voice: &VoiceVisual, area: Rect, buf: &mut Buffer) {
        let (top, bottom) = Self::lane_rows(area, voice.lane.0);
        if top >= bottom {
            return;
        }

        let rows = (bottom - top) as f64;
        let center = top as f64 + (rows - 1.0) / 2.0;
        let half = (rows - 1.0) / 2.0;
        let scale = half * (voice.amplitude / VISUAL_PEAK).clamp(0.0, 1.0);
        let style = Self::style_for(voice);

        for x in 0..area.width {
            let pixel = x as f64 * PIXELS_PER_COLUMN;
            let angle = pixel / voice.wavelength * TAU + voice.phase;
            let y = (center - scale * angle.sin()).round();
            let y = (y as u16).clamp(top, bottom - 1);
            buf.set_string(area.x + x, y, self.symbol, style);
        }
    }
}

impl Widget for LaneView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = match &self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        if inner_area.width == 0 || inner_area.height == 0 {
            return;
        }

        for voice in self.voices {
            if voice.stage == VisualStage::Silent || voice.amplitude <= 0.0 {
                continue;
            }
            self.render_voice(voice, inner_area, buf);
        }
    }
}

//! Read-only per-voice state for renderers

use serde::Serialize;

use crate::synth::{EnvelopeModel, EnvelopeParameters, Lane, NoteKey, VisualStage, Voice};

/// Lowest frequency of the colour ramp
const HUE_MIN_FREQ: f64 = 260.0;
/// Highest frequency of the colour ramp
const HUE_MAX_FREQ: f64 = 990.0;
/// Hue reached at the top of the ramp (red to violet)
const HUE_SPAN: f64 = 280.0;

/// What a renderer needs to draw one voice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceVisual {
    pub key: NoteKey,
    pub frequency: f64,
    /// Colour hue in degrees
    pub hue: f64,
    pub lane: Lane,
    pub stage: VisualStage,
    /// Wave height, 0 to [`crate::synth::VISUAL_PEAK`]
    pub amplitude: f64,
    pub phase: f64,
    /// Wavelength in pixels
    pub wavelength: f64,
}

impl VoiceVisual {
    pub fn capture(voice: &Voice, params: &EnvelopeParameters, now: f64) -> Self {
        let timeline = voice.timeline();
        Self {
            key: voice.key().clone(),
            frequency: voice.frequency(),
            hue: frequency_hue(voice.frequency()),
            lane: voice.lane(),
            stage: EnvelopeModel::visual_stage(params, &timeline, now),
            amplitude: EnvelopeModel::visual_amplitude(params, &timeline, now),
            phase: voice.phase(),
            wavelength: (1200.0 / voice.frequency()) * 200.0,
        }
    }

    /// Opacity used when drawing: fully opaque from amplitude 20 upwards
    pub fn alpha(&self) -> f64 {
        (self.amplitude / 20.0).min(1.0)
    }
}

/// Map a note frequency onto the colour wheel
pub fn frequency_hue(frequency: f64) -> f64 {
    let t = ((frequency - HUE_MIN_FREQ) / (HUE_MAX_FREQ - HUE_MIN_FREQ)).clamp(0.0, 1.0);
    t * HUE_SPAN
}

/// Convert HSL (hue in degrees, saturation and lightness 0-1) to RGB
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_hue() {
        assert_eq!(frequency_hue(100.0), 0.0);
        assert_eq!(frequency_hue(260.0), 0.0);
        assert!((frequency_hue(625.0) - 140.0).abs() < 1e-9);
        assert_eq!(frequency_hue(990.0), 280.0);
        assert_eq!(frequency_hue(5000.0), 280.0);
    }

    #[test]
    fn test_hsl_to_rgb() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }
}

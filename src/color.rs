use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Chart colours
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues. Used
/// for the live orientation channels (yaw / pitch / roll).
pub fn channel_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n.max(1) as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.50);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Soft green fill for tremor-episode bands (drawn below the RMS line).
pub const EPISODE_FILL: Color32 = Color32::from_rgba_premultiplied(10, 59, 28, 70);

/// Maps an episode amplitude to a label colour: low amplitudes stay green,
/// the series maximum lands on red.
#[derive(Debug, Clone, Copy)]
pub struct AmplitudeScale {
    max: f64,
}

impl AmplitudeScale {
    pub fn new(max_amplitude: f64) -> Self {
        AmplitudeScale {
            max: if max_amplitude > 0.0 { max_amplitude } else { 1.0 },
        }
    }

    pub fn color_for(&self, amplitude: f64) -> Color32 {
        let t = (amplitude / self.max).clamp(0.0, 1.0) as f32;
        // Hue 120° (green) down to 0° (red).
        let hsl = Hsl::new(120.0 * (1.0 - t), 0.70, 0.40);
        let rgb: Srgb = hsl.into_color();
        Color32::from_rgb(
            (rgb.red * 255.0) as u8,
            (rgb.green * 255.0) as u8,
            (rgb.blue * 255.0) as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_entries() {
        let colors = channel_palette(3);
        assert_eq!(colors.len(), 3);
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
    }

    #[test]
    fn amplitude_scale_orders_severity() {
        let scale = AmplitudeScale::new(4.0);
        // Max amplitude is redder than a small one.
        let low = scale.color_for(0.2);
        let high = scale.color_for(4.0);
        assert!(high.r() > low.r());
        assert!(low.g() > high.g());
    }

    #[test]
    fn zero_max_does_not_divide_by_zero() {
        let scale = AmplitudeScale::new(0.0);
        let _ = scale.color_for(1.0);
    }
}

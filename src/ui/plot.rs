use std::ops::RangeInclusive;

use chrono::DateTime;
use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    GridMark, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points, Polygon, Text, VLine,
};

use crate::color::{AmplitudeScale, EPISODE_FILL};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Analysis charts
// ---------------------------------------------------------------------------

const RMS_LINE: Color32 = Color32::from_rgb(0x2e, 0x7c, 0xf1);
const PSD_LINE: Color32 = Color32::from_rgb(0x02, 0x84, 0xc7);

/// `HH:MM:SS` tick label for an x value in epoch seconds.
fn clock_label(epoch_seconds: f64) -> String {
    DateTime::from_timestamp_millis((epoch_seconds * 1000.0) as i64)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// PSD vs frequency (Burg), with the dominant-frequency marker. The x range
/// is bounded at Nyquist from the reported sample rate.
pub fn psd_plot(ui: &mut Ui, state: &AppState) {
    let Some(payload) = &state.analysis.payload else {
        return;
    };
    let charts = &payload.charts;
    let f_dom = payload.metrics.dominant_freq_hz;
    let nyquist = (payload.metrics.sample_rate / 2.0).max(1.0);
    let psd_max = charts
        .freq_y
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max)
        .max(0.0);

    ui.heading("PSD vs frequency (Burg)");
    Plot::new("psd_plot")
        .legend(Legend::default())
        .x_axis_label("Frequency (Hz)")
        .y_axis_label("PSD (power)")
        .include_x(0.0)
        .include_x(nyquist)
        .include_y(0.0)
        .include_y(psd_max * 1.15)
        .height(320.0)
        .show(ui, |plot_ui| {
            let points: PlotPoints = charts
                .freq_x
                .iter()
                .zip(charts.freq_y.iter())
                .map(|(&x, &y)| [x, y])
                .collect();
            plot_ui.line(Line::new(points).name("Mean PSD").color(PSD_LINE).width(2.0));

            plot_ui.vline(
                VLine::new(f_dom)
                    .name(format!("Dominant: {f_dom:.2} Hz"))
                    .color(Color32::RED)
                    .style(LineStyle::dashed_loose()),
            );
            plot_ui.points(
                Points::new(vec![[f_dom, psd_max]])
                    .name("Dominant peak")
                    .color(Color32::RED)
                    .radius(4.0),
            );
        });
}

/// RMS energy over time, with tremor-episode bands and amplitude labels.
/// The x axis carries the absolute instants from the time-axis normalizer;
/// tick labels show only the clock part.
pub fn rms_plot(ui: &mut Ui, state: &AppState) {
    let axis = &state.analysis.axis;
    let Some(payload) = &state.analysis.payload else {
        return;
    };
    if axis.is_empty() {
        return;
    }
    let rms = &payload.charts.rms;
    let max_rms = rms.iter().cloned().fold(f64::NEG_INFINITY, f64::max).max(1.0);
    let scale = AmplitudeScale::new(
        state
            .analysis
            .episodes
            .iter()
            .map(|(_, amp)| *amp)
            .fold(0.0, f64::max),
    );

    ui.heading("Tremor energy (RMS) over time");
    Plot::new("rms_plot")
        .x_axis_label("Time")
        .y_axis_label("RMS amplitude (°)")
        .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| clock_label(mark.value))
        .label_formatter(|name, point| {
            format!("{name}\n{}  {:.3}°", clock_label(point.x), point.y)
        })
        .include_y(0.0)
        .height(320.0)
        .show(ui, |plot_ui| {
            // Episode bands go below the line.
            for (span, amplitude) in &state.analysis.episodes {
                let x0 = span.start as f64 / 1000.0;
                let x1 = span.end as f64 / 1000.0;
                let top = max_rms * 1.05;
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(vec![
                        [x0, 0.0],
                        [x1, 0.0],
                        [x1, top],
                        [x0, top],
                    ]))
                    .fill_color(EPISODE_FILL)
                    .stroke(Stroke::NONE)
                    .name("Tremor episode"),
                );
                plot_ui.text(Text::new(
                    PlotPoint::new(x1, max_rms * 0.95),
                    RichText::new(format!("{amplitude:.2}°"))
                        .color(scale.color_for(*amplitude))
                        .size(10.0),
                ));
            }

            let points: PlotPoints = axis
                .iter()
                .zip(rms.iter())
                .map(|(&ms, &y)| [ms as f64 / 1000.0, y])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name("Combined RMS")
                    .color(RMS_LINE)
                    .width(2.0)
                    .fill(0.0),
            );
        });
}

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use plotters::prelude::*;
use plotters::style::Color as _;
use printpdf::image_crate::{DynamicImage, RgbImage};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rect, Rgb,
};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Clinical PDF report
// ---------------------------------------------------------------------------
//
// Two A4 pages: patient data + metrics + observations, then both charts
// rendered off-screen with plotters and embedded as images. Chart rendering
// failures degrade to a note on the page instead of aborting the export.

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;

const CHART_W: u32 = 1000;
const CHART_H: u32 = 500;
const CHART_DPI: f32 = 150.0;

fn navy() -> Color {
    Color::Rgb(Rgb::new(16.0 / 255.0, 44.0 / 255.0, 89.0 / 255.0, None))
}

fn light_blue() -> Color {
    Color::Rgb(Rgb::new(0.88, 0.93, 0.98, None))
}

fn white() -> Color {
    Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.1, 0.1, 0.1, None))
}

/// PDF coordinates grow upwards; layout is easier from the top edge.
fn from_top(mm: f32) -> Mm {
    Mm(PAGE_H - mm)
}

fn filled_rect(layer: &PdfLayerReference, x: f32, top: f32, w: f32, h: f32, color: Color) {
    layer.set_fill_color(color);
    let rect = Rect::new(Mm(x), from_top(top + h), Mm(x + w), from_top(top))
        .with_mode(PaintMode::Fill);
    layer.add_rect(rect);
}

fn header_band(layer: &PdfLayerReference, bold: &IndirectFontRef, subtitle: &str) {
    filled_rect(layer, 0.0, 0.0, PAGE_W, 28.0, navy());
    layer.set_fill_color(white());
    layer.use_text("MotioMetrics", 22.0, Mm(MARGIN), from_top(13.0), bold);
    layer.use_text(subtitle, 11.0, Mm(MARGIN), from_top(21.0), bold);
    layer.set_fill_color(black());
}

/// Greedy word wrap for the observation block. Long single words are kept
/// whole on their own line.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Write the full report for the current analysis to `path`.
pub fn export_pdf(state: &AppState, path: &Path) -> Result<()> {
    let payload = state
        .analysis
        .payload
        .as_ref()
        .ok_or_else(|| anyhow!("no analysed recording to report"))?;

    let (doc, page1, layer1) = PdfDocument::new("MotioMetrics report", Mm(PAGE_W), Mm(PAGE_H), "page 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .context("loading report font")?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .context("loading report font")?;

    // ---- page 1: patient, metrics, observations ----
    let layer = doc.get_page(page1).get_layer(layer1);
    header_band(&layer, &bold, "Clinical Tremor Report");

    let mut y = 40.0;
    layer.use_text("Patient data", 14.0, Mm(MARGIN), from_top(y), &bold);
    y += 8.0;
    let form = &state.form;
    let rows: [(&str, String); 6] = [
        ("Name", form.name.clone()),
        ("History id", form.history_id.clone()),
        ("Age", form.age.clone()),
        ("Gender", form.gender.clone()),
        ("Device position", form.device_position.clone()),
        (
            "Measurement date",
            form.measurement_date.format("%d/%m/%Y").to_string(),
        ),
    ];
    for (label, value) in rows {
        let value = if value.trim().is_empty() { "—".to_string() } else { value };
        layer.use_text(format!("{label}:"), 11.0, Mm(MARGIN), from_top(y), &bold);
        layer.use_text(value, 11.0, Mm(MARGIN + 45.0), from_top(y), &font);
        y += 6.5;
    }
    layer.use_text(
        format!("Report generated: {}", Local::now().format("%d/%m/%Y %H:%M")),
        9.0,
        Mm(MARGIN),
        from_top(y),
        &font,
    );
    y += 12.0;

    // Metrics box
    filled_rect(&layer, MARGIN, y, PAGE_W - 2.0 * MARGIN, 26.0, light_blue());
    layer.set_fill_color(navy());
    layer.use_text("Analysis results", 12.0, Mm(MARGIN + 5.0), from_top(y + 8.0), &bold);
    let metrics = &payload.metrics;
    let verdict = if metrics.tremor_detected {
        "Tremor detected"
    } else {
        "No tremor detected"
    };
    layer.use_text(
        format!(
            "Dominant frequency: {:.2} Hz     PSD peak: {:.2}     {}",
            metrics.dominant_freq_hz, metrics.psd_peak, verdict
        ),
        11.0,
        Mm(MARGIN + 5.0),
        from_top(y + 17.0),
        &font,
    );
    layer.set_fill_color(black());
    y += 34.0;

    // Observations
    layer.use_text("Clinical observations", 14.0, Mm(MARGIN), from_top(y), &bold);
    y += 8.0;
    if state.analysis.observations.is_empty() {
        layer.use_text("None recorded.", 11.0, Mm(MARGIN), from_top(y), &font);
        y += 6.5;
    }
    for obs in &state.analysis.observations {
        if y > PAGE_H - 25.0 {
            break;
        }
        let start = if obs.start.is_empty() { "--:--" } else { &obs.start };
        let end = if obs.end.is_empty() { "--:--" } else { &obs.end };
        layer.use_text(
            format!("[{start} – {end}]"),
            11.0,
            Mm(MARGIN),
            from_top(y),
            &bold,
        );
        for line in wrap(&obs.description, 78) {
            layer.use_text(line, 11.0, Mm(MARGIN + 32.0), from_top(y), &font);
            y += 6.0;
        }
        y += 2.5;
    }

    // ---- page 2: charts ----
    let (page2, layer2) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "page 2");
    let layer = doc.get_page(page2).get_layer(layer2);
    header_band(&layer, &bold, "Signal charts");

    let chart_w_mm = CHART_W as f32 / CHART_DPI * 25.4;
    let chart_h_mm = CHART_H as f32 / CHART_DPI * 25.4;
    let chart_x = (PAGE_W - chart_w_mm) / 2.0;

    let mut top = 40.0;
    for (title, rendered) in [
        ("Tremor energy (RMS) over time", render_rms_chart(state)),
        ("PSD vs frequency (Burg)", render_psd_chart(state)),
    ] {
        layer.use_text(title, 13.0, Mm(MARGIN), from_top(top), &bold);
        top += 6.0;
        match rendered {
            Ok(buffer) => {
                let rgb = RgbImage::from_raw(CHART_W, CHART_H, buffer)
                    .ok_or_else(|| anyhow!("chart buffer has the wrong size"))?;
                let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(rgb));
                image.add_to_layer(
                    layer.clone(),
                    ImageTransform {
                        translate_x: Some(Mm(chart_x)),
                        translate_y: Some(from_top(top + chart_h_mm)),
                        dpi: Some(CHART_DPI),
                        ..Default::default()
                    },
                );
            }
            Err(e) => {
                log::warn!("report chart '{title}' not rendered: {e:#}");
                layer.use_text(
                    "Chart could not be rendered on this system.",
                    10.0,
                    Mm(MARGIN),
                    from_top(top + 8.0),
                    &font,
                );
            }
        }
        top += chart_h_mm + 12.0;
    }

    let file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .context("writing report PDF")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Off-screen chart rendering
// ---------------------------------------------------------------------------

fn clock_label(epoch_seconds: f64) -> String {
    DateTime::from_timestamp_millis((epoch_seconds * 1000.0) as i64)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// RMS over time with episode bands, rendered into a raw RGB buffer.
fn render_rms_chart(state: &AppState) -> Result<Vec<u8>> {
    let payload = state
        .analysis
        .payload
        .as_ref()
        .ok_or_else(|| anyhow!("no payload"))?;
    let axis = &state.analysis.axis;
    let rms = &payload.charts.rms;
    if axis.is_empty() || rms.is_empty() {
        return Err(anyhow!("empty RMS series"));
    }

    let xs: Vec<f64> = axis.iter().map(|&ms| ms as f64 / 1000.0).collect();
    let x_min = xs[0];
    let x_max = *xs.last().unwrap_or(&x_min);
    let y_max = rms.iter().cloned().fold(f64::NEG_INFINITY, f64::max).max(1.0) * 1.1;

    let mut buffer = vec![0u8; (CHART_W * CHART_H * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (CHART_W, CHART_H)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("{e}"))?;
        let mut chart = ChartBuilder::on(&root)
            .margin(14)
            .x_label_area_size(42)
            .y_label_area_size(56)
            .build_cartesian_2d(x_min..x_max.max(x_min + 1.0), 0.0..y_max)
            .map_err(|e| anyhow!("{e}"))?;
        chart
            .configure_mesh()
            .x_label_formatter(&|x| clock_label(*x))
            .y_desc("RMS amplitude (°)")
            .draw()
            .map_err(|e| anyhow!("{e}"))?;

        for (span, amplitude) in &state.analysis.episodes {
            let x0 = span.start as f64 / 1000.0;
            let x1 = span.end as f64 / 1000.0;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x0, 0.0), (x1, y_max)],
                    GREEN.mix(0.25).filled(),
                )))
                .map_err(|e| anyhow!("{e}"))?;
            chart
                .draw_series(std::iter::once(Text::new(
                    format!("{amplitude:.2}°"),
                    (x1, y_max * 0.92),
                    ("sans-serif", 18).into_font().color(&RED),
                )))
                .map_err(|e| anyhow!("{e}"))?;
        }

        chart
            .draw_series(LineSeries::new(
                xs.iter().cloned().zip(rms.iter().cloned()),
                &RGBColor(0x2e, 0x7c, 0xf1),
            ))
            .map_err(|e| anyhow!("{e}"))?;
        root.present().map_err(|e| anyhow!("{e}"))?;
    }
    Ok(buffer)
}

/// PSD vs frequency with the dominant-frequency marker.
fn render_psd_chart(state: &AppState) -> Result<Vec<u8>> {
    let payload = state
        .analysis
        .payload
        .as_ref()
        .ok_or_else(|| anyhow!("no payload"))?;
    let charts = &payload.charts;
    if charts.freq_x.is_empty() || charts.freq_y.is_empty() {
        return Err(anyhow!("empty PSD series"));
    }

    let f_dom = payload.metrics.dominant_freq_hz;
    let nyquist = (payload.metrics.sample_rate / 2.0).max(1.0);
    let y_max = charts
        .freq_y
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max)
        .max(1e-6)
        * 1.15;

    let mut buffer = vec![0u8; (CHART_W * CHART_H * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (CHART_W, CHART_H)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("{e}"))?;
        let mut chart = ChartBuilder::on(&root)
            .margin(14)
            .x_label_area_size(42)
            .y_label_area_size(56)
            .build_cartesian_2d(0.0..nyquist, 0.0..y_max)
            .map_err(|e| anyhow!("{e}"))?;
        chart
            .configure_mesh()
            .x_desc("Frequency (Hz)")
            .y_desc("PSD (power)")
            .draw()
            .map_err(|e| anyhow!("{e}"))?;

        chart
            .draw_series(LineSeries::new(
                charts
                    .freq_x
                    .iter()
                    .cloned()
                    .zip(charts.freq_y.iter().cloned()),
                &RGBColor(0x02, 0x84, 0xc7),
            ))
            .map_err(|e| anyhow!("{e}"))?;
        chart
            .draw_series(LineSeries::new(
                [(f_dom, 0.0), (f_dom, y_max)],
                RED.stroke_width(2),
            ))
            .map_err(|e| anyhow!("{e}"))?;
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{f_dom:.2} Hz"),
                (f_dom, y_max * 0.95),
                ("sans-serif", 18).into_font().color(&RED),
            )))
            .map_err(|e| anyhow!("{e}"))?;
        root.present().map_err(|e| anyhow!("{e}"))?;
    }
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::wrap;

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap("resting tremor in the right hand while drinking", 20);
        assert!(lines.iter().all(|l| l.len() <= 20));
        assert_eq!(lines.join(" "), "resting tremor in the right hand while drinking");
    }

    #[test]
    fn wrap_keeps_long_words_whole() {
        let lines = wrap("antidisestablishmentarianism yes", 10);
        assert_eq!(lines[0], "antidisestablishmentarianism");
        assert_eq!(lines[1], "yes");
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        assert!(wrap("   ", 20).is_empty());
    }
}

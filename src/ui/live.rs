use eframe::egui::{self, Color32, Key, RichText, ScrollArea, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::color::channel_palette;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Live monitor page
// ---------------------------------------------------------------------------

pub fn show(ctx: &egui::Context, state: &mut AppState) {
    egui::SidePanel::right("activity_panel")
        .default_width(280.0)
        .resizable(true)
        .show(ctx, |ui| {
            activity_panel(ui, state);
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        toolbar(ui, state, ctx);
        ui.separator();
        orientation_chart(ui, state);
    });
}

fn toolbar(ui: &mut Ui, state: &mut AppState, ctx: &egui::Context) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Session:");
        ui.add_enabled(
            !state.live.connected && !state.live.busy,
            egui::TextEdit::singleline(&mut state.live.session_name).desired_width(160.0),
        );

        if state.live.busy {
            ui.spinner();
        } else if !state.live.connected {
            if ui.button("🛜 Connect MotioSensor").clicked() {
                let repaint_ctx = ctx.clone();
                state.start_live_session(move || repaint_ctx.request_repaint());
            }
        } else if ui.button("⏹ Stop recording").clicked() {
            let repaint_ctx = ctx.clone();
            state.stop_live_session(move || repaint_ctx.request_repaint());
        }

        if state.live.last_csv.is_some() && !state.live.connected && !state.live.busy {
            if ui.button("Analyse last recording").clicked() {
                let repaint_ctx = ctx.clone();
                state.analyze_last_session(move || repaint_ctx.request_repaint());
            }
        }

        let status_color = if state.live.connected {
            Color32::from_rgb(0x16, 0xa3, 0x4a)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&state.live.status).color(status_color));
    });
}

fn orientation_chart(ui: &mut Ui, state: &AppState) {
    let Some(frame) = &state.live.frame else {
        ui.centered_and_justified(|ui: &mut Ui| {
            if state.live.connected {
                ui.heading("Waiting for sensor data…");
            } else {
                ui.heading("Start a session to stream orientation data");
            }
        });
        return;
    };

    if let Some(stamp) = frame.labels.last() {
        ui.label(RichText::new(format!("Last sample: {stamp}")).weak());
    }

    let colors = channel_palette(3);
    let channels: [(&str, &Vec<f64>); 3] = [
        ("Yaw", &frame.yaw),
        ("Pitch", &frame.pitch),
        ("Roll", &frame.roll),
    ];

    Plot::new("live_ypr")
        .legend(Legend::default())
        .y_axis_label("Orientation (°)")
        .include_y(-180.0)
        .include_y(180.0)
        .show(ui, |plot_ui| {
            for ((name, values), color) in channels.iter().zip(colors) {
                let points: PlotPoints = values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| [i as f64, v])
                    .collect();
                plot_ui.line(Line::new(points).name(*name).color(color).width(2.0));
            }
        });
}

fn activity_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Activities");
    ui.label(RichText::new("Note what the patient is doing; notes are stored with the recording.").weak());
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut state.live.annotation_draft)
                .hint_text("e.g. drinking from a glass")
                .desired_width(ui.available_width() - 50.0),
        );
        let entered = response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter));
        if ui.button("Add").clicked() || entered {
            state.send_annotation();
        }
    });

    ui.add_space(6.0);

    if state.live.annotations.is_empty() {
        ui.label(RichText::new("No activities yet.").weak());
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for annotation in &state.live.annotations {
                ui.horizontal_wrapped(|ui: &mut Ui| {
                    ui.strong(&annotation.at);
                    ui.label(&annotation.description);
                });
            }
        });
}

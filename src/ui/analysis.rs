use eframe::egui::{self, Align2, Color32, Grid, RichText, ScrollArea, Ui};

use crate::state::{AppState, HISTORY_PAGE_STEP};
use crate::timeline::AnchorSpec;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// CSV analysis page
// ---------------------------------------------------------------------------

const GENDER_OPTIONS: &[&str] = &["Female", "Male", "Other"];
const POSITION_OPTIONS: &[&str] = &["Wrist", "Hand", "Forearm", "Ankle"];

pub fn show(ctx: &egui::Context, state: &mut AppState) {
    anchor_prompt(ctx, state);

    egui::SidePanel::left("patient_panel")
        .default_width(330.0)
        .resizable(true)
        .show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    patient_form(ui, state);
                    ui.separator();
                    history_table(ui, state);
                });
        });

    egui::CentralPanel::default().show(ctx, |ui| {
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui: &mut Ui| {
                upload_section(ui, state);
                ui.separator();
                metrics_section(ui, state);
                plot::psd_plot(ui, state);
                plot::rms_plot(ui, state);
                ui.separator();
                observations_section(ui, state);
            });
    });
}

// ---------------------------------------------------------------------------
// Start-time prompt (miniSD recordings carry no wall-clock date)
// ---------------------------------------------------------------------------

fn anchor_prompt(ctx: &egui::Context, state: &mut AppState) {
    if !state.analysis.anchor_prompt_open {
        return;
    }

    egui::Window::new("Recording start time")
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui: &mut Ui| {
            ui.label("Was this recording taken on a miniSD card?");
            ui.label(
                RichText::new(
                    "If so, enter the real start time so the chart shows wall-clock time.",
                )
                .weak(),
            );
            ui.add_space(4.0);
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Start time:");
                ui.add(
                    egui::TextEdit::singleline(&mut state.analysis.anchor_input)
                        .hint_text("HH:MM")
                        .desired_width(60.0),
                );
            });
            ui.add_space(8.0);
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Use this time").clicked() {
                    match AnchorSpec::from_hhmm(&state.analysis.anchor_input) {
                        Some(anchor) => {
                            let repaint_ctx = ctx.clone();
                            state.submit_queued_recording(Some(anchor), move || {
                                repaint_ctx.request_repaint()
                            });
                        }
                        None => {
                            state.status_message =
                                Some("Enter the start time as HH:MM.".to_string());
                        }
                    }
                }
                if ui.button("No start time").clicked() {
                    let repaint_ctx = ctx.clone();
                    state.submit_queued_recording(None, move || repaint_ctx.request_repaint());
                }
                if ui.button("Cancel").clicked() {
                    state.analysis.pending_file = None;
                    state.analysis.anchor_prompt_open = false;
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Upload / metrics
// ---------------------------------------------------------------------------

fn upload_section(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("📂 Open recording (.csv)…").clicked() {
            panels::open_recording_dialog(state);
        }

        if state.analysis.loading {
            ui.spinner();
            ui.label(format!(
                "Analysing {}…",
                state.analysis.source_name.as_deref().unwrap_or("recording")
            ));
        } else if state.analysis.payload.is_some() {
            let mut note = format!(
                "{} analysed successfully",
                state.analysis.source_name.as_deref().unwrap_or("recording")
            );
            if let Some(anchor) = state.analysis.anchor {
                note.push_str(&format!(
                    "  (start: {:02}:{:02})",
                    anchor.hour, anchor.minute
                ));
            }
            ui.label(RichText::new(note).color(Color32::from_rgb(0x16, 0xa3, 0x4a)));
        } else {
            ui.label(RichText::new("Open a recording to analyse it.").weak());
        }
    });
}

fn metrics_section(ui: &mut Ui, state: &AppState) {
    let Some(payload) = &state.analysis.payload else {
        return;
    };
    let metrics = &payload.metrics;

    ui.columns(3, |cols| {
        cols[0].group(|ui: &mut Ui| {
            ui.label("Dominant frequency");
            ui.heading(format!("{:.2} Hz", metrics.dominant_freq_hz));
        });
        cols[1].group(|ui: &mut Ui| {
            ui.label("PSD peak");
            ui.heading(format!("{:.2}", metrics.psd_peak));
        });
        cols[2].group(|ui: &mut Ui| {
            ui.label("Tremor status");
            if metrics.tremor_detected {
                ui.heading(RichText::new("Tremor detected").color(Color32::RED));
            } else {
                ui.heading(
                    RichText::new("No tremor detected").color(Color32::from_rgb(0x16, 0xa3, 0x4a)),
                );
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

fn observations_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Clinical observations");

    ui.horizontal(|ui: &mut Ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.analysis.observation_draft.description)
                .hint_text("Description")
                .desired_width(280.0),
        );
        ui.label("from");
        ui.add(
            egui::TextEdit::singleline(&mut state.analysis.observation_draft.start)
                .hint_text("HH:MM")
                .desired_width(55.0),
        );
        ui.label("to");
        ui.add(
            egui::TextEdit::singleline(&mut state.analysis.observation_draft.end)
                .hint_text("HH:MM")
                .desired_width(55.0),
        );
        if ui.button("Add observation").clicked() {
            state.add_observation();
        }
    });

    if state.analysis.observations.is_empty() {
        ui.label(RichText::new("No observations.").weak());
        return;
    }
    for obs in &state.analysis.observations {
        let start = if obs.start.is_empty() { "--:--" } else { &obs.start };
        let end = if obs.end.is_empty() { "--:--" } else { &obs.end };
        ui.horizontal_wrapped(|ui: &mut Ui| {
            ui.strong(format!("[{start} – {end}]"));
            ui.label(&obs.description);
        });
    }
}

// ---------------------------------------------------------------------------
// Patient form + history
// ---------------------------------------------------------------------------

fn patient_form(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Patient");

    Grid::new("patient_form").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Name");
        ui.text_edit_singleline(&mut state.form.name);
        ui.end_row();

        ui.label("History id");
        ui.text_edit_singleline(&mut state.form.history_id);
        ui.end_row();

        ui.label("Age");
        ui.text_edit_singleline(&mut state.form.age);
        ui.end_row();

        ui.label("Gender");
        egui::ComboBox::from_id_salt("gender")
            .selected_text(if state.form.gender.is_empty() {
                "Select…"
            } else {
                state.form.gender.as_str()
            })
            .show_ui(ui, |ui: &mut Ui| {
                for option in GENDER_OPTIONS {
                    if ui
                        .selectable_label(state.form.gender == *option, *option)
                        .clicked()
                    {
                        state.form.gender = option.to_string();
                    }
                }
            });
        ui.end_row();

        ui.label("Device position");
        egui::ComboBox::from_id_salt("device_position")
            .selected_text(if state.form.device_position.is_empty() {
                "Select…"
            } else {
                state.form.device_position.as_str()
            })
            .show_ui(ui, |ui: &mut Ui| {
                for option in POSITION_OPTIONS {
                    if ui
                        .selectable_label(state.form.device_position == *option, *option)
                        .clicked()
                    {
                        state.form.device_position = option.to_string();
                    }
                }
            });
        ui.end_row();

        ui.label("Measurement date");
        ui.add(egui_extras::DatePickerButton::new(
            &mut state.form.measurement_date,
        ));
        ui.end_row();
    });

    // Autocomplete over known patients, by name or history id.
    let query = state.form.name.trim().to_string();
    let loaded = state
        .current_patient
        .as_deref()
        .and_then(|hid| state.store.find_by_history_id(hid))
        .map(|p| p.name.clone());
    if !query.is_empty() && loaded.as_deref() != Some(query.as_str()) {
        let suggestions: Vec<(String, String)> = state
            .store
            .suggestions(&query, 5)
            .iter()
            .map(|p| (p.name.clone(), p.history_id.clone()))
            .collect();
        for (name, history_id) in suggestions {
            if ui
                .small_button(format!("→ {name} ({history_id})"))
                .clicked()
            {
                state.load_patient(&history_id);
            }
        }
    }

    ui.add_space(4.0);
    if ui.button("💾 Save patient visit").clicked() {
        state.save_patient_visit();
    }
}

fn history_table(ui: &mut Ui, state: &mut AppState) {
    ui.heading("History");

    let rows: Vec<(String, bool, f64, f64, String)> = state
        .current_patient
        .as_deref()
        .and_then(|hid| state.store.find_by_history_id(hid))
        .map(|patient| {
            patient
                .records_newest_first()
                .iter()
                .map(|r| {
                    (
                        r.date.format("%Y-%m-%d").to_string(),
                        r.tremor_detected,
                        r.dominant_freq_hz,
                        r.psd_peak,
                        r.device_position.clone(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        ui.label(RichText::new("No previous records.").weak());
        return;
    }

    Grid::new("history_table")
        .num_columns(5)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            ui.strong("Date");
            ui.strong("Tremor");
            ui.strong("F. dom (Hz)");
            ui.strong("PSD peak");
            ui.strong("Position");
            ui.end_row();

            for (date, tremor, f_dom, psd, position) in rows.iter().take(state.shown_rows) {
                ui.label(date);
                if *tremor {
                    ui.label(RichText::new("Yes").color(Color32::RED).strong());
                } else {
                    ui.label(
                        RichText::new("No")
                            .color(Color32::from_rgb(0x16, 0xa3, 0x4a))
                            .strong(),
                    );
                }
                ui.label(format!("{f_dom:.2}"));
                ui.label(format!("{psd:.2}"));
                ui.label(position);
                ui.end_row();
            }
        });

    ui.horizontal(|ui: &mut Ui| {
        if rows.len() > state.shown_rows {
            if ui.small_button("Show more…").clicked() {
                state.show_more_history();
            }
        }
        if state.shown_rows > HISTORY_PAGE_STEP {
            if ui.small_button("Show less").clicked() {
                state.show_less_history();
            }
        }
    });
}

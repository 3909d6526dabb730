use chrono::Local;
use eframe::egui::{self, Color32, RichText, Ui};

use crate::report;
use crate::state::{AppState, Page};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / page tabs / status line.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open recording…").clicked() {
                open_recording_dialog(state);
                state.page = Page::Analysis;
                ui.close_menu();
            }
            if ui.button("Export PDF report…").clicked() {
                export_report_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if ui
            .selectable_label(state.page == Page::Live, "Live monitor")
            .clicked()
        {
            state.page = Page::Live;
        }
        if ui
            .selectable_label(state.page == Page::Analysis, "CSV analysis")
            .clicked()
        {
            state.page = Page::Analysis;
        }

        ui.separator();

        if let Some(payload) = &state.analysis.payload {
            ui.label(format!(
                "{} · {} samples",
                state.analysis.source_name.as_deref().unwrap_or("recording"),
                payload.charts.rms.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_recording_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open tremor recording")
        .add_filter("CSV recording", &["csv"])
        .pick_file();

    if let Some(path) = file {
        log::info!("queued recording {}", path.display());
        state.queue_recording(path);
    }
}

pub fn export_report_dialog(state: &mut AppState) {
    if state.analysis.payload.is_none() {
        state.status_message = Some("Analyse a recording before exporting a report.".to_string());
        return;
    }

    let patient = if state.form.name.trim().is_empty() {
        "Patient".to_string()
    } else {
        state.form.name.trim().replace(char::is_whitespace, "_")
    };
    let default_name = format!("{}_{}_Motio.pdf", patient, Local::now().format("%d-%m-%Y"));

    let file = rfd::FileDialog::new()
        .set_title("Save clinical report")
        .set_file_name(default_name)
        .add_filter("PDF", &["pdf"])
        .save_file();

    if let Some(path) = file {
        match report::export_pdf(state, &path) {
            Ok(()) => {
                log::info!("report written to {}", path.display());
                state.status_message = Some("Report PDF saved.".to_string());
            }
            Err(e) => {
                log::error!("report export failed: {e:#}");
                state.status_message = Some(format!("Report export failed: {e:#}"));
            }
        }
    }
}

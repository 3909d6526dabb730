mod app;
mod backend;
mod color;
mod patients;
mod report;
mod state;
mod timeline;
mod ui;

use app::MotioMetricsApp;
use backend::client::BackendClient;
use eframe::egui;
use patients::store::PatientStore;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let api_url = backend::api_url();
    log::info!("analysis backend: {api_url}");

    let client = match BackendClient::new(&api_url) {
        Ok(client) => client,
        Err(e) => {
            log::error!("could not initialise HTTP client: {e}");
            return Ok(());
        }
    };

    let store = PatientStore::open_default().unwrap_or_else(|e| {
        log::warn!("patient store unavailable ({e:#}); records will not persist");
        PatientStore::in_memory()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "MotioMetrics – Tremor Monitor",
        options,
        Box::new(|_cc| Ok(Box::new(MotioMetricsApp::new(AppState::new(client, store))))),
    )
}

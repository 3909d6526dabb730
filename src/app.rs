use eframe::egui;

use crate::state::{AppState, Page};
use crate::ui::{analysis, live, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct MotioMetricsApp {
    pub state: AppState,
}

impl MotioMetricsApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for MotioMetricsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Drain worker channels before building any widgets.
        let repaint_ctx = ctx.clone();
        self.state
            .poll_background(move || repaint_ctx.request_repaint());

        // ---- Top panel: page tabs + status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Active page ----
        match self.state.page {
            Page::Live => live::show(ctx, &mut self.state),
            Page::Analysis => analysis::show(ctx, &mut self.state),
        }
    }
}

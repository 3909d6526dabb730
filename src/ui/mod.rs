/// UI layer: one module per page plus shared chrome.
///
/// ```text
///   ┌───────────────────────────────┐
///   │ panels::top_bar  (tabs, File) │
///   ├───────────────┬───────────────┤
///   │ live::show    │ analysis::show│   one active at a time
///   │  (streaming)  │  (CSV upload) │
///   └───────────────┴───────────────┘
///              plot::*  (egui_plot wrappers)
/// ```
pub mod analysis;
pub mod live;
pub mod panels;
pub mod plot;

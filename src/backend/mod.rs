/// Backend access layer: wire types, analysis client, live feed.
///
/// Architecture:
/// ```text
///   recording .csv
///        │
///        ▼
///   ┌──────────┐   POST /api/analizar_datos   ┌──────────────────┐
///   │  client   │ ───────────────────────────▶ │ analysis backend │
///   └──────────┘ ◀─────────────────────────── └──────────────────┘
///        │         AnalysisResponse (JSON)
///        ▼
///   ┌──────────────────┐
///   │ AnalysisResponse  │  metrics + chart series + episodes
///   └──────────────────┘
///
///   ┌──────────┐   websocket frames           ┌──────────────────┐
///   │   live    │ ◀─────────────────────────── │  sensor backend  │
///   └──────────┘   { labels, yaw, pitch, roll }└──────────────────┘
/// ```
pub mod client;
pub mod live;
pub mod types;

/// Default backend base URL; override with `MOTIOMETRICS_API_URL`.
pub const DEFAULT_API_URL: &str = "https://motiometrics-backend.onrender.com";

/// Resolve the backend base URL from the environment.
pub fn api_url() -> String {
    std::env::var("MOTIOMETRICS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

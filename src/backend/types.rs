use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire types — the analysis backend speaks Spanish field names
// ---------------------------------------------------------------------------

/// Full response of `POST /api/analizar_datos`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    #[serde(rename = "metricas")]
    pub metrics: Metrics,
    #[serde(rename = "graficos")]
    pub charts: ChartData,
}

/// Scalar analysis results shown in the metric cards and saved into the
/// patient record.
#[derive(Debug, Clone, Deserialize)]
pub struct Metrics {
    #[serde(rename = "frecuencia_dominante")]
    pub dominant_freq_hz: f64,
    #[serde(rename = "psd_pico")]
    pub psd_peak: f64,
    /// Sample rate of the recording; the PSD x-axis is bounded at `sr / 2`.
    #[serde(rename = "sr")]
    pub sample_rate: f64,
    #[serde(rename = "tiene_temblor", default)]
    pub tremor_detected: bool,
}

/// Series data for the two plots. `timestamps` and `rms` are index-aligned;
/// timestamp format varies by capture source (see `timeline`).
#[derive(Debug, Clone, Deserialize)]
pub struct ChartData {
    #[serde(rename = "tiempo", default)]
    pub timestamps: Vec<String>,
    #[serde(default)]
    pub rms: Vec<f64>,
    #[serde(default)]
    pub freq_x: Vec<f64>,
    #[serde(default)]
    pub freq_y: Vec<f64>,
    #[serde(rename = "episodios", default)]
    pub episodes: Vec<EpisodeWindow>,
}

/// One backend-detected tremor episode: a contiguous time range rendered as
/// a highlighted band, with its mean amplitude in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeWindow {
    #[serde(rename = "inicio")]
    pub start: String,
    #[serde(rename = "fin")]
    pub end: String,
    #[serde(rename = "amplitud")]
    pub amplitude: f64,
}

/// Reply of the session-control endpoint (`/api/leer_datos`).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionReply {
    pub status: String,
    /// Name of the CSV the backend wrote, present after `stop`.
    #[serde(default)]
    pub csv: Option<String>,
}

/// One frame of the live orientation feed. Arrays are index-aligned and
/// cover the backend's rolling window.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveFrame {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub yaw: Vec<f64>,
    #[serde(default)]
    pub pitch: Vec<f64>,
    #[serde(default)]
    pub roll: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_payload() {
        let json = r#"{
            "metricas": {
                "frecuencia_dominante": 5.12,
                "psd_pico": 33.78,
                "sr": 100,
                "tiene_temblor": true
            },
            "graficos": {
                "tiempo": ["08:31:20", "08:31:20.500"],
                "rms": [0.4, 1.2],
                "freq_x": [0.0, 1.0],
                "freq_y": [0.1, 0.9],
                "episodios": [
                    {"inicio": "08:31:20", "fin": "08:31:50", "amplitud": 2.15}
                ]
            }
        }"#;

        let resp: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.metrics.dominant_freq_hz, 5.12);
        assert_eq!(resp.metrics.sample_rate, 100.0);
        assert!(resp.metrics.tremor_detected);
        assert_eq!(resp.charts.timestamps.len(), 2);
        assert_eq!(resp.charts.episodes[0].end, "08:31:50");
        assert_eq!(resp.charts.episodes[0].amplitude, 2.15);
    }

    #[test]
    fn missing_optional_sections_default_to_empty() {
        let json = r#"{
            "metricas": {"frecuencia_dominante": 0.0, "psd_pico": 0.0, "sr": 50},
            "graficos": {}
        }"#;
        let resp: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.metrics.tremor_detected);
        assert!(resp.charts.timestamps.is_empty());
        assert!(resp.charts.episodes.is_empty());
    }

    #[test]
    fn deserializes_live_frame() {
        let json = r#"{"labels": ["08:31:20"], "yaw": [1.5], "pitch": [-2.0], "roll": [0.25]}"#;
        let frame: LiveFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.labels.len(), 1);
        assert_eq!(frame.roll[0], 0.25);
    }
}

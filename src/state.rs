use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

use chrono::{Local, NaiveDate};

use crate::backend::client::{BackendClient, ClientError};
use crate::backend::live::{LiveEvent, LiveFeed};
use crate::backend::types::{AnalysisResponse, LiveFrame};
use crate::patients::model::VisitRecord;
use crate::patients::store::{Demographics, PatientStore};
use crate::timeline::{map_episode, resolve_axis, AnchorSpec, EpisodeSpan, EpochMs, RawSample};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------
//
// One owner for everything the UI mutates: current page, cached analysis
// payload, live session, patient form, history pagination. Background work
// (upload, session control, websocket feed) reports back over mpsc channels
// drained once per frame by `poll_background`.

/// History table page size: initial rows and "show more" step.
pub const HISTORY_PAGE_STEP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Live,
    Analysis,
}

/// A clinician-entered observation attached to the current analysis.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub description: String,
    /// Free-text "HH:MM" bounds; empty shows as "--:--".
    pub start: String,
    pub end: String,
}

/// An activity note taken during a live session, shown newest-first.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub at: String,
    pub description: String,
}

/// Patient form fields. Age stays a string until save so partial input
/// doesn't fight the text field.
#[derive(Debug, Clone)]
pub struct PatientForm {
    pub name: String,
    pub history_id: String,
    pub age: String,
    pub gender: String,
    pub device_position: String,
    pub measurement_date: NaiveDate,
}

impl Default for PatientForm {
    fn default() -> Self {
        PatientForm {
            name: String::new(),
            history_id: String::new(),
            age: String::new(),
            gender: String::new(),
            device_position: String::new(),
            measurement_date: Local::now().date_naive(),
        }
    }
}

/// Outcome of a background session-control call.
#[derive(Debug)]
enum ControlEvent {
    Started,
    Stopped(Option<String>),
    Downloaded(PathBuf),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Analysis view state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AnalysisState {
    /// Last backend response (None until a recording was analysed).
    pub payload: Option<AnalysisResponse>,
    pub source_name: Option<String>,

    /// Recording waiting for the start-time question to be answered.
    pub pending_file: Option<PathBuf>,
    pub anchor_prompt_open: bool,
    pub anchor_input: String,
    /// Anchor the current payload was resolved with.
    pub anchor: Option<AnchorSpec>,

    pub loading: bool,

    /// Chart axis: one absolute instant per RMS sample.
    pub axis: Vec<EpochMs>,
    /// Episode bands mapped onto `axis`, with their amplitudes.
    pub episodes: Vec<(EpisodeSpan, f64)>,

    pub observations: Vec<Observation>,
    pub observation_draft: Observation,

    result_rx: Option<Receiver<Result<AnalysisResponse, ClientError>>>,
}

// ---------------------------------------------------------------------------
// Live view state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct LiveState {
    pub session_name: String,
    pub connected: bool,
    /// A control call is in flight; buttons disable while true.
    pub busy: bool,
    pub status: String,
    pub frame: Option<LiveFrame>,
    pub annotations: Vec<Annotation>,
    pub annotation_draft: String,
    /// CSV the backend wrote for the last stopped session.
    pub last_csv: Option<String>,

    feed: Option<LiveFeed>,
    feed_rx: Option<Receiver<LiveEvent>>,
    control_rx: Option<Receiver<ControlEvent>>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub page: Page,
    pub client: BackendClient,
    pub store: PatientStore,

    pub analysis: AnalysisState,
    pub live: LiveState,

    pub form: PatientForm,
    /// History id of the patient whose records the table shows.
    pub current_patient: Option<String>,
    pub shown_rows: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(client: BackendClient, store: PatientStore) -> Self {
        AppState {
            page: Page::Live,
            client,
            store,
            analysis: AnalysisState::default(),
            live: LiveState {
                session_name: "Paciente_01".to_string(),
                ..LiveState::default()
            },
            form: PatientForm::default(),
            current_patient: None,
            shown_rows: HISTORY_PAGE_STEP,
            status_message: None,
        }
    }

    // -- background plumbing -------------------------------------------------

    /// Drain all worker channels. Called once per frame before rendering.
    pub fn poll_background(&mut self, repaint: impl Fn() + Clone + Send + 'static) {
        // Analysis results
        if let Some(rx) = &self.analysis.result_rx {
            let results: Vec<_> = rx.try_iter().collect();
            if !results.is_empty() {
                self.analysis.result_rx = None;
                for result in results {
                    match result {
                        Ok(response) => self.ingest_analysis(response),
                        Err(e) => {
                            log::error!("analysis failed: {e}");
                            self.clear_analysis();
                            self.status_message = Some(format!("Analysis failed: {e}"));
                        }
                    }
                }
            }
        }

        // Live feed frames
        if let Some(rx) = &self.live.feed_rx {
            let events: Vec<_> = rx.try_iter().collect();
            for event in events {
                match event {
                    LiveEvent::Connected => {
                        self.live.connected = true;
                        self.live.status = "Connected (real time)".to_string();
                    }
                    LiveEvent::Frame(frame) => self.live.frame = Some(frame),
                    LiveEvent::Disconnected(reason) => {
                        self.live.connected = false;
                        self.live.feed = None;
                        self.live.feed_rx = None;
                        self.live.status = match reason {
                            Some(r) => format!("Disconnected: {r}"),
                            None => "Disconnected".to_string(),
                        };
                        break;
                    }
                }
            }
        }

        // Session control outcomes
        if let Some(rx) = &self.live.control_rx {
            let events: Vec<_> = rx.try_iter().collect();
            if !events.is_empty() {
                self.live.control_rx = None;
                self.live.busy = false;
                for event in events {
                    match event {
                        ControlEvent::Started => {
                            self.live.status = "Session started, waiting for data…".to_string();
                            self.open_feed(repaint.clone());
                        }
                        ControlEvent::Stopped(csv) => {
                            self.live.status = match &csv {
                                Some(name) => format!("Session stopped, recording {name}"),
                                None => "Session stopped".to_string(),
                            };
                            self.live.last_csv = csv;
                        }
                        ControlEvent::Downloaded(path) => {
                            self.page = Page::Analysis;
                            self.queue_recording(path);
                        }
                        ControlEvent::Failed(msg) => {
                            log::error!("session control failed: {msg}");
                            self.status_message = Some(msg);
                        }
                    }
                }
            }
        }
    }

    // -- analysis flow -------------------------------------------------------

    /// A recording was picked; open the start-time prompt before uploading.
    pub fn queue_recording(&mut self, path: PathBuf) {
        self.analysis.pending_file = Some(path);
        self.analysis.anchor_prompt_open = true;
        self.analysis.anchor_input.clear();
        self.status_message = None;
    }

    /// Answer the start-time prompt and upload the queued recording on a
    /// worker thread.
    pub fn submit_queued_recording(
        &mut self,
        anchor: Option<AnchorSpec>,
        repaint: impl Fn() + Send + 'static,
    ) {
        let Some(path) = self.analysis.pending_file.take() else {
            return;
        };
        self.analysis.anchor_prompt_open = false;
        self.analysis.anchor = anchor;
        self.analysis.source_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());
        self.analysis.loading = true;

        let (tx, rx) = channel();
        self.analysis.result_rx = Some(rx);
        let client = self.client.clone();
        std::thread::spawn(move || {
            let result = client.analyze_recording(&path);
            let _ = tx.send(result);
            repaint();
        });
    }

    /// Ingest a backend response: run the time-axis normalizer once and cache
    /// the chart-ready axis and episode spans alongside the payload.
    fn ingest_analysis(&mut self, response: AnalysisResponse) {
        let samples: Vec<RawSample> = response
            .charts
            .timestamps
            .iter()
            .zip(response.charts.rms.iter())
            .map(|(t, &v)| RawSample {
                timestamp: t.clone(),
                value: v,
            })
            .collect();

        self.analysis.axis = resolve_axis(&samples, self.analysis.anchor);
        self.analysis.episodes = response
            .charts
            .episodes
            .iter()
            .map(|ep| (map_episode(ep, &samples, self.analysis.anchor), ep.amplitude))
            .collect();

        log::info!(
            "analysis ingested: {} samples, {} episodes, tremor={}",
            samples.len(),
            self.analysis.episodes.len(),
            response.metrics.tremor_detected
        );

        self.analysis.payload = Some(response);
        self.analysis.loading = false;
        self.status_message = None;
    }

    /// Drop the current results (upload failure, or a new file incoming).
    pub fn clear_analysis(&mut self) {
        self.analysis.payload = None;
        self.analysis.axis.clear();
        self.analysis.episodes.clear();
        self.analysis.loading = false;
    }

    pub fn add_observation(&mut self) {
        let draft = std::mem::take(&mut self.analysis.observation_draft);
        if draft.description.trim().is_empty() {
            self.status_message = Some("Write a description for the observation.".to_string());
            self.analysis.observation_draft = draft;
            return;
        }
        self.analysis.observations.push(draft);
    }

    // -- patient records -----------------------------------------------------

    /// Validate the form and append a visit record built from the current
    /// analysis. Problems land in `status_message`, nothing panics.
    pub fn save_patient_visit(&mut self) {
        let Some(payload) = &self.analysis.payload else {
            self.status_message =
                Some("Analyse a recording first, then save the patient visit.".to_string());
            return;
        };

        let name = self.form.name.trim().to_string();
        let history_id = self.form.history_id.trim().to_string();
        let age: Option<u32> = self.form.age.trim().parse().ok();
        if name.is_empty()
            || history_id.is_empty()
            || age.is_none()
            || self.form.gender.is_empty()
            || self.form.device_position.is_empty()
        {
            self.status_message = Some("Complete all patient fields.".to_string());
            return;
        }

        let record = VisitRecord {
            date: self.form.measurement_date,
            tremor_detected: payload.metrics.tremor_detected,
            dominant_freq_hz: payload.metrics.dominant_freq_hz,
            psd_peak: payload.metrics.psd_peak,
            device_position: self.form.device_position.clone(),
        };
        let who = Demographics {
            name,
            history_id,
            age: age.unwrap_or(0),
            gender: self.form.gender.clone(),
        };

        match self.store.save_visit(who, record) {
            Ok(history_id) => {
                self.current_patient = Some(history_id);
                self.shown_rows = HISTORY_PAGE_STEP;
                self.status_message = Some("Patient visit saved.".to_string());
            }
            Err(e) => {
                log::error!("saving patient visit: {e:#}");
                self.status_message = Some(format!("Could not save: {e:#}"));
            }
        }
    }

    /// Fill the form from a known patient (autocomplete selection).
    pub fn load_patient(&mut self, history_id: &str) {
        let Some(patient) = self.store.find_by_history_id(history_id) else {
            return;
        };
        self.form.name = patient.name.clone();
        self.form.history_id = patient.history_id.clone();
        self.form.age = patient.age.to_string();
        self.form.gender = patient.gender.clone();
        self.current_patient = Some(patient.history_id.clone());
        self.shown_rows = HISTORY_PAGE_STEP;
    }

    pub fn show_more_history(&mut self) {
        self.shown_rows += HISTORY_PAGE_STEP;
    }

    pub fn show_less_history(&mut self) {
        self.shown_rows = HISTORY_PAGE_STEP;
    }

    // -- live session --------------------------------------------------------

    pub fn start_live_session(&mut self, repaint: impl Fn() + Clone + Send + 'static) {
        if self.live.busy || self.live.connected {
            return;
        }
        self.live.busy = true;
        self.live.status = "Starting session…".to_string();
        self.live.frame = None;
        self.live.annotations.clear();

        let (tx, rx) = channel();
        self.live.control_rx = Some(rx);
        let client = self.client.clone();
        let session = self.live.session_name.clone();
        std::thread::spawn(move || {
            let event = match client.start_session(&session) {
                Ok(_) => ControlEvent::Started,
                Err(e) => ControlEvent::Failed(format!("Could not start session: {e}")),
            };
            let _ = tx.send(event);
            repaint();
        });
    }

    fn open_feed(&mut self, repaint: impl Fn() + Send + 'static) {
        let (tx, rx) = channel();
        self.live.feed_rx = Some(rx);
        self.live.feed = Some(LiveFeed::connect(self.client.base_url(), tx, repaint));
    }

    pub fn stop_live_session(&mut self, repaint: impl Fn() + Clone + Send + 'static) {
        if let Some(feed) = self.live.feed.take() {
            feed.stop();
        }
        self.live.feed_rx = None;
        self.live.connected = false;
        self.live.busy = true;
        self.live.status = "Stopping session…".to_string();

        let (tx, rx) = channel();
        self.live.control_rx = Some(rx);
        let client = self.client.clone();
        std::thread::spawn(move || {
            let event = match client.stop_session() {
                Ok(reply) => ControlEvent::Stopped(reply.csv),
                Err(e) => ControlEvent::Failed(format!("Could not stop session: {e}")),
            };
            let _ = tx.send(event);
            repaint();
        });
    }

    /// Send the annotation draft to the backend and list it locally right
    /// away; a lost POST only costs the backend-side copy.
    pub fn send_annotation(&mut self) {
        let description = self.live.annotation_draft.trim().to_string();
        if description.is_empty() {
            return;
        }
        self.live.annotation_draft.clear();
        self.live.annotations.insert(
            0,
            Annotation {
                at: Local::now().format("%H:%M:%S").to_string(),
                description: description.clone(),
            },
        );

        let client = self.client.clone();
        std::thread::spawn(move || {
            if let Err(e) = client.annotate(&description) {
                log::error!("annotation not delivered: {e}");
            }
        });
    }

    /// Pull the last stopped session's CSV from the backend and queue it for
    /// analysis.
    pub fn analyze_last_session(&mut self, repaint: impl Fn() + Clone + Send + 'static) {
        let Some(csv) = self.live.last_csv.clone() else {
            return;
        };
        self.live.busy = true;
        self.live.status = format!("Downloading {csv}…");

        let (tx, rx) = channel();
        self.live.control_rx = Some(rx);
        let client = self.client.clone();
        std::thread::spawn(move || {
            let event = match client.download_recording(&csv) {
                Ok(path) => ControlEvent::Downloaded(path),
                Err(e) => ControlEvent::Failed(format!("Could not fetch recording: {e}")),
            };
            let _ = tx.send(event);
            repaint();
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::derive_elapsed;

    fn test_state() -> AppState {
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        AppState::new(client, PatientStore::in_memory())
    }

    fn sample_response() -> AnalysisResponse {
        serde_json::from_str(
            r#"{
                "metricas": {"frecuencia_dominante": 5.1, "psd_pico": 20.0, "sr": 100, "tiene_temblor": true},
                "graficos": {
                    "tiempo": ["08:31:20", "08:31:21.500", "08:31:23"],
                    "rms": [0.5, 2.0, 1.0],
                    "freq_x": [0.0], "freq_y": [0.0],
                    "episodios": [{"inicio": "08:31:20", "fin": "08:31:23", "amplitud": 1.7}]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn ingest_caches_aligned_axis_and_episodes() {
        let mut state = test_state();
        state.analysis.anchor = Some(AnchorSpec { hour: 9, minute: 0 });
        state.ingest_analysis(sample_response());

        let axis = state.analysis.axis.clone();
        assert_eq!(axis.len(), 3);

        let samples: Vec<RawSample> = ["08:31:20", "08:31:21.500", "08:31:23"]
            .iter()
            .map(|t| RawSample {
                timestamp: t.to_string(),
                value: 0.0,
            })
            .collect();
        let elapsed = derive_elapsed(&samples);
        for (i, e) in elapsed.iter().enumerate() {
            assert_eq!(axis[i] - axis[0], *e);
        }

        // Episode spanning the whole series maps onto the axis endpoints.
        let (span, amplitude) = state.analysis.episodes[0];
        assert_eq!(span.start, axis[0]);
        assert_eq!(span.end, axis[2]);
        assert_eq!(amplitude, 1.7);
        assert!(!state.analysis.loading);
    }

    #[test]
    fn clear_analysis_resets_chart_state() {
        let mut state = test_state();
        state.ingest_analysis(sample_response());
        state.clear_analysis();
        assert!(state.analysis.payload.is_none());
        assert!(state.analysis.axis.is_empty());
        assert!(state.analysis.episodes.is_empty());
    }

    #[test]
    fn history_pagination_steps_and_resets() {
        let mut state = test_state();
        assert_eq!(state.shown_rows, 5);
        state.show_more_history();
        state.show_more_history();
        assert_eq!(state.shown_rows, 15);
        state.show_less_history();
        assert_eq!(state.shown_rows, 5);
    }

    #[test]
    fn saving_visit_requires_an_analysis() {
        let mut state = test_state();
        state.save_patient_visit();
        assert!(state.analysis.payload.is_none());
        assert!(state.status_message.as_deref().unwrap_or("").contains("Analyse"));
        assert!(state.store.patients().is_empty());
    }

    #[test]
    fn saving_visit_with_complete_form_records_the_metrics() {
        let mut state = test_state();
        state.ingest_analysis(sample_response());
        state.form.name = "Juan Pérez".to_string();
        state.form.history_id = "H-42".to_string();
        state.form.age = "68".to_string();
        state.form.gender = "M".to_string();
        state.form.device_position = "Wrist".to_string();

        state.save_patient_visit();

        let patient = state.store.find_by_history_id("H-42").expect("saved");
        assert_eq!(patient.records.len(), 1);
        assert!(patient.records[0].tremor_detected);
        assert_eq!(patient.records[0].dominant_freq_hz, 5.1);
        assert_eq!(state.current_patient.as_deref(), Some("H-42"));
    }

    #[test]
    fn incomplete_form_is_rejected() {
        let mut state = test_state();
        state.ingest_analysis(sample_response());
        state.form.name = "Juan".to_string();
        // Missing history id / age / gender / position.
        state.save_patient_visit();
        assert!(state.store.patients().is_empty());
        assert!(state.status_message.as_deref().unwrap_or("").contains("Complete"));
    }

    #[test]
    fn observation_draft_requires_description() {
        let mut state = test_state();
        state.analysis.observation_draft.start = "09:00".to_string();
        state.add_observation();
        assert!(state.analysis.observations.is_empty());

        state.analysis.observation_draft.description = "Resting tremor, right hand".to_string();
        state.add_observation();
        assert_eq!(state.analysis.observations.len(), 1);
    }
}

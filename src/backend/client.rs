use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde_json::json;
use thiserror::Error;

use super::types::{AnalysisResponse, SessionReply};

// ---------------------------------------------------------------------------
// Blocking backend client
// ---------------------------------------------------------------------------
//
// All calls block and are expected to run on a worker thread; the UI thread
// only ever touches the mpsc receivers (see `state`).

/// Analysis requests can sit behind a cold-started backend, so the budget is
/// generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("not a usable CSV recording: {0}")]
    InvalidCsv(String),
    #[error("could not read recording: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(BackendClient {
            base_url: base_url.into(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a CSV recording for spectral analysis.
    pub fn analyze_recording(&self, path: &Path) -> Result<AnalysisResponse, ClientError> {
        validate_recording(path)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording.csv")
            .to_string();
        let bytes = std::fs::read(path)?;

        log::info!("uploading {file_name} ({} bytes) for analysis", bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/analizar_datos", self.base_url))
            .multipart(form)
            .send()?
            .error_for_status()?;

        Ok(response.json()?)
    }

    /// Start a recording session on the backend; the sensor pushes into it.
    pub fn start_session(&self, session_name: &str) -> Result<SessionReply, ClientError> {
        self.control(json!({ "action": "start", "nombre_sesion": session_name }))
    }

    /// Stop the current session. The reply names the CSV the backend wrote.
    pub fn stop_session(&self) -> Result<SessionReply, ClientError> {
        self.control(json!({ "action": "stop" }))
    }

    /// Attach a timestamped activity annotation to the running session.
    pub fn annotate(&self, description: &str) -> Result<SessionReply, ClientError> {
        self.control(json!({ "action": "anotacion", "descripcion": description }))
    }

    /// Fetch a session recording the backend wrote, into the temp dir, and
    /// return its local path (ready to feed back into `analyze_recording`).
    pub fn download_recording(&self, csv_name: &str) -> Result<std::path::PathBuf, ClientError> {
        let response = self
            .http
            .get(format!("{}/grabaciones_vivo/{}", self.base_url, csv_name))
            .send()?
            .error_for_status()?;
        let bytes = response.bytes()?;

        let path = std::env::temp_dir().join(csv_name);
        std::fs::write(&path, &bytes)?;
        log::info!("downloaded {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    fn control(&self, body: serde_json::Value) -> Result<SessionReply, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/leer_datos", self.base_url))
            .json(&body)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

/// Cheap pre-upload sanity check: the file must be a CSV with a header row
/// and at least one data record. Saves a round trip for obviously wrong
/// picks (the backend would reject them anyway).
fn validate_recording(path: &Path) -> Result<(), ClientError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "csv" {
        return Err(ClientError::InvalidCsv(format!(
            "expected a .csv file, got {:?}",
            path.file_name().unwrap_or_default()
        )));
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| ClientError::InvalidCsv(e.to_string()))?;
    match reader.records().next() {
        Some(Ok(_)) => Ok(()),
        Some(Err(e)) => Err(ClientError::InvalidCsv(e.to_string())),
        None => Err(ClientError::InvalidCsv("file has no data rows".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_non_csv_extension() {
        let err = validate_recording(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidCsv(_)));
    }

    #[test]
    fn rejects_headers_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Timestamp,Yaw,Pitch,Roll").unwrap();
        assert!(matches!(
            validate_recording(&path),
            Err(ClientError::InvalidCsv(_))
        ));
    }

    #[test]
    fn accepts_recording_with_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Timestamp,Yaw,Pitch,Roll").unwrap();
        writeln!(f, "08:31:20.000,1.0,2.0,3.0").unwrap();
        assert!(validate_recording(&path).is_ok());
    }
}

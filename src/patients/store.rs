use std::path::PathBuf;

use anyhow::{Context, Result};

use super::model::{generate_id, Patient, VisitRecord};

// ---------------------------------------------------------------------------
// JSON-backed patient store
// ---------------------------------------------------------------------------

/// Demographics taken from the patient form when saving a visit.
#[derive(Debug, Clone)]
pub struct Demographics {
    pub name: String,
    pub history_id: String,
    pub age: u32,
    pub gender: String,
}

/// The whole registry lives in memory and is rewritten to disk on every
/// mutation. Fine for the scale at hand (one clinic, one machine).
pub struct PatientStore {
    path: Option<PathBuf>,
    patients: Vec<Patient>,
}

impl PatientStore {
    /// Open the store at the platform data directory, creating it on first
    /// run.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_local_dir()
            .context("no local data directory on this platform")?
            .join("motiometrics");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        Self::open(dir.join("patients.json"))
    }

    /// Open a store at an explicit path, loading existing content if any.
    pub fn open(path: PathBuf) -> Result<Self> {
        let patients = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).context("parsing patient registry")?
        } else {
            Vec::new()
        };
        log::info!(
            "patient store at {} ({} patients)",
            path.display(),
            patients.len()
        );
        Ok(PatientStore {
            path: Some(path),
            patients,
        })
    }

    /// Volatile store used when no data directory is available; saves are
    /// kept for the session only.
    pub fn in_memory() -> Self {
        PatientStore {
            path: None,
            patients: Vec::new(),
        }
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn find_by_history_id(&self, history_id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.history_id == history_id)
    }

    /// Up to `limit` patients whose name or history id contains `query`
    /// (case-insensitive). An empty query returns the first `limit` entries,
    /// for the autocomplete dropdown.
    pub fn suggestions(&self, query: &str, limit: usize) -> Vec<&Patient> {
        let needle = query.trim().to_lowercase();
        self.patients
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.history_id.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect()
    }

    /// Append a visit to the patient with the given history id, creating the
    /// patient if unknown. Demographics are refreshed on every save (the form
    /// is the source of truth). Returns the history id of the saved patient.
    pub fn save_visit(&mut self, who: Demographics, record: VisitRecord) -> Result<String> {
        match self
            .patients
            .iter_mut()
            .find(|p| p.history_id == who.history_id)
        {
            Some(patient) => {
                patient.name = who.name;
                patient.age = who.age;
                patient.gender = who.gender;
                patient.records.push(record);
            }
            None => {
                self.patients.push(Patient {
                    id: generate_id(),
                    name: who.name,
                    history_id: who.history_id.clone(),
                    age: who.age,
                    gender: who.gender,
                    records: vec![record],
                });
            }
        }
        self.persist()?;
        Ok(who.history_id)
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            log::warn!("in-memory patient store: skipping persist");
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.patients)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn demographics(name: &str, history_id: &str) -> Demographics {
        Demographics {
            name: name.to_string(),
            history_id: history_id.to_string(),
            age: 68,
            gender: "M".to_string(),
        }
    }

    fn record(day: u32) -> VisitRecord {
        VisitRecord {
            date: NaiveDate::from_ymd_opt(2025, 8, day).unwrap(),
            tremor_detected: true,
            dominant_freq_hz: 5.1,
            psd_peak: 22.4,
            device_position: "Hand".to_string(),
        }
    }

    #[test]
    fn save_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PatientStore::open(dir.path().join("patients.json")).unwrap();

        store.save_visit(demographics("Juan Pérez", "H-42"), record(1)).unwrap();
        assert_eq!(store.patients().len(), 1);
        assert_eq!(store.find_by_history_id("H-42").unwrap().records.len(), 1);

        // Same history id: demographics refresh, record appends.
        store.save_visit(demographics("Juan Perez", "H-42"), record(2)).unwrap();
        let patient = store.find_by_history_id("H-42").unwrap();
        assert_eq!(store.patients().len(), 1);
        assert_eq!(patient.records.len(), 2);
        assert_eq!(patient.name, "Juan Perez");

        // Different history id: new patient.
        store.save_visit(demographics("Ana López", "H-7"), record(3)).unwrap();
        assert_eq!(store.patients().len(), 2);
    }

    #[test]
    fn reload_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.json");

        let mut store = PatientStore::open(path.clone()).unwrap();
        store.save_visit(demographics("Juan Pérez", "H-42"), record(1)).unwrap();
        drop(store);

        let reloaded = PatientStore::open(path).unwrap();
        assert_eq!(reloaded.patients().len(), 1);
        assert_eq!(reloaded.find_by_history_id("H-42").unwrap().records[0], record(1));
    }

    #[test]
    fn suggestions_match_name_or_history_id_up_to_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PatientStore::open(dir.path().join("patients.json")).unwrap();
        for i in 0..8 {
            store
                .save_visit(demographics(&format!("Paciente {i}"), &format!("H-{i}")), record(1))
                .unwrap();
        }

        assert_eq!(store.suggestions("", 5).len(), 5);
        assert_eq!(store.suggestions("paciente", 5).len(), 5);
        assert_eq!(store.suggestions("H-3", 5).len(), 1);
        assert!(store.suggestions("nadie", 5).is_empty());
    }

    #[test]
    fn in_memory_store_accepts_saves() {
        let mut store = PatientStore::in_memory();
        store.save_visit(demographics("Juan", "H-1"), record(1)).unwrap();
        assert_eq!(store.patients().len(), 1);
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Patient and visit records
// ---------------------------------------------------------------------------

/// One analysed measurement attached to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitRecord {
    pub date: NaiveDate,
    pub tremor_detected: bool,
    pub dominant_freq_hz: f64,
    pub psd_peak: f64,
    /// Where the sensor was worn (wrist, hand, ...), free text from the form.
    pub device_position: String,
}

/// A patient with their accumulated visit history. `history_id` is the
/// clinical history number and acts as the upsert key; `id` is an opaque
/// internal identifier assigned on first save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub history_id: String,
    pub age: u32,
    pub gender: String,
    pub records: Vec<VisitRecord>,
}

impl Patient {
    /// Records sorted newest-first for the history table.
    pub fn records_newest_first(&self) -> Vec<&VisitRecord> {
        let mut sorted: Vec<&VisitRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }
}

/// Opaque id for a newly created patient, derived from the wall clock.
pub fn generate_id() -> String {
    format!("p-{:x}", chrono::Local::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(y: i32, m: u32, d: u32) -> VisitRecord {
        VisitRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            tremor_detected: false,
            dominant_freq_hz: 4.5,
            psd_peak: 10.0,
            device_position: "Wrist".to_string(),
        }
    }

    #[test]
    fn history_is_sorted_newest_first() {
        let patient = Patient {
            id: "p-1".to_string(),
            name: "Ada".to_string(),
            history_id: "H-001".to_string(),
            age: 71,
            gender: "F".to_string(),
            records: vec![record(2025, 1, 10), record(2025, 6, 2), record(2024, 11, 30)],
        };
        let dates: Vec<NaiveDate> = patient
            .records_newest_first()
            .iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
            ]
        );
    }
}

// src/recording.rs - Landmark recordings for offline replay
use crate::error::{Result, TrackingError};
use crate::landmarks::{LandmarkFrame, LandmarkPoint, PoseLandmark};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// One landmark of one frame. Rows sharing a timestamp form a frame.
#[derive(Debug, Deserialize)]
struct LandmarkRecord {
    timestamp_ms: u64,
    landmark: String,
    x: f64,
    y: f64,
    z: f64,
    visibility: f64,
}

pub fn load_recording(path: impl AsRef<Path>) -> Result<Vec<LandmarkFrame>> {
    let file = File::open(path.as_ref())?;
    read_recording(file)
}

/// Parses `timestamp_ms,landmark,x,y,z,visibility` rows, grouped by timestamp in
/// ascending order. Landmarks absent from a frame stay invisible.
pub fn read_recording<R: Read>(reader: R) -> Result<Vec<LandmarkFrame>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut frames: Vec<LandmarkFrame> = Vec::new();
    for (line, row) in csv_reader.deserialize::<LandmarkRecord>().enumerate() {
        let record = row?;
        let landmark = PoseLandmark::from_name(&record.landmark).ok_or_else(|| {
            TrackingError::Recording(format!(
                "row {}: unknown landmark '{}'",
                line + 1,
                record.landmark
            ))
        })?;
        let timestamp = Duration::from_millis(record.timestamp_ms);
        let point = LandmarkPoint::new(record.x, record.y, record.z, record.visibility);

        match frames.last().map(|frame| frame.timestamp) {
            Some(last) if last == timestamp => {
                if let Some(frame) = frames.last_mut() {
                    frame.set(landmark, point);
                }
            }
            Some(last) if last > timestamp => {
                return Err(TrackingError::Recording(format!(
                    "row {}: timestamp {} ms goes backwards",
                    line + 1,
                    record.timestamp_ms
                )));
            }
            _ => frames.push(LandmarkFrame::new(timestamp).with(landmark, point)),
        }
    }

    tracing::debug!(frames = frames.len(), "recording loaded");
    Ok(frames)
}

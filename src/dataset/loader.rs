use crate::dataset::{Column, Reading, TimeSeriesStore};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};
use tracing::{debug, info};

pub const DATE_COLUMN: &str = "Date";
pub const TIME_COLUMN: &str = "Time";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset: {0}")]
    Read(#[from] std::io::Error),
    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset is missing required column `{0}`")]
    MissingColumn(String),
    #[error("invalid row at line {line}: {source}")]
    Row {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("unparsable date/time at line {line}: `{value}`")]
    Timestamp { line: u64, value: String },
    #[error("non-finite value in `{column}` at line {line}")]
    NonFinite { line: u64, column: &'static str },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "S1_Temp")]
    s1_temp: f64,
    #[serde(rename = "S2_Temp")]
    s2_temp: f64,
    #[serde(rename = "S3_Temp")]
    s3_temp: f64,
    #[serde(rename = "S4_Temp")]
    s4_temp: f64,
    #[serde(rename = "S1_Light")]
    s1_light: f64,
    #[serde(rename = "S2_Light")]
    s2_light: f64,
    #[serde(rename = "S3_Light")]
    s3_light: f64,
    #[serde(rename = "S4_Light")]
    s4_light: f64,
    #[serde(rename = "S1_Sound")]
    s1_sound: f64,
    #[serde(rename = "S2_Sound")]
    s2_sound: f64,
    #[serde(rename = "S3_Sound")]
    s3_sound: f64,
    #[serde(rename = "S4_Sound")]
    s4_sound: f64,
    #[serde(rename = "S5_CO2")]
    co2: f64,
    #[serde(rename = "S6_PIR")]
    s6_pir: u8,
    #[serde(rename = "S7_PIR")]
    s7_pir: u8,
    #[serde(rename = "Room_Occupancy_Count")]
    occupancy: u32,
}

impl RawRecord {
    /// Header of the first numeric field holding `inf`, `-inf` or `NaN`.
    fn first_non_finite(&self) -> Option<&'static str> {
        [
            (Column::S1Temp, self.s1_temp),
            (Column::S2Temp, self.s2_temp),
            (Column::S3Temp, self.s3_temp),
            (Column::S4Temp, self.s4_temp),
            (Column::S1Light, self.s1_light),
            (Column::S2Light, self.s2_light),
            (Column::S3Light, self.s3_light),
            (Column::S4Light, self.s4_light),
            (Column::S1Sound, self.s1_sound),
            (Column::S2Sound, self.s2_sound),
            (Column::S3Sound, self.s3_sound),
            (Column::S4Sound, self.s4_sound),
            (Column::S5Co2, self.co2),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(column, _)| column.header())
    }

    fn into_reading(self, timestamp: PrimitiveDateTime) -> Reading {
        Reading {
            position: 0,
            timestamp,
            temperature: [self.s1_temp, self.s2_temp, self.s3_temp, self.s4_temp],
            light: [self.s1_light, self.s2_light, self.s3_light, self.s4_light],
            sound: [self.s1_sound, self.s2_sound, self.s3_sound, self.s4_sound],
            co2: self.co2,
            pir: [self.s6_pir, self.s7_pir],
            occupancy: self.occupancy,
        }
    }
}

pub fn load_from_path(
    path: impl AsRef<Path>,
    max_rows: Option<usize>,
) -> Result<TimeSeriesStore, LoadError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let store = load_from_reader(file, max_rows)?;
    info!(
        path = %path.display(),
        rows = store.len(),
        "Dataset loaded"
    );
    Ok(store)
}

/// Parse a headed CSV source into a sorted store. Any bad row aborts the whole load.
pub fn load_from_reader<R: Read>(
    reader: R,
    max_rows: Option<usize>,
) -> Result<TimeSeriesStore, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let required = [DATE_COLUMN, TIME_COLUMN]
        .into_iter()
        .chain(Column::ALL.iter().map(|column| column.header()));
    for name in required {
        if !headers.iter().any(|header| header == name) {
            return Err(LoadError::MissingColumn(name.to_string()));
        }
    }

    let mut readings = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let raw: RawRecord = record
            .deserialize(Some(&headers))
            .map_err(|source| LoadError::Row { line, source })?;
        if let Some(column) = raw.first_non_finite() {
            return Err(LoadError::NonFinite { line, column });
        }
        let timestamp = parse_timestamp(&raw.date, &raw.time).ok_or_else(|| {
            LoadError::Timestamp {
                line,
                value: format!("{} {}", raw.date, raw.time),
            }
        })?;
        readings.push(raw.into_reading(timestamp));
    }

    debug!(rows = readings.len(), max_rows = ?max_rows, "Parsed dataset rows");
    Ok(TimeSeriesStore::from_readings(readings, max_rows))
}

/// Combine the dataset's separate date and time fields into one instant.
pub fn parse_timestamp(date: &str, time: &str) -> Option<PrimitiveDateTime> {
    let date = Date::parse(date, format_description!("[year]/[month]/[day]"))
        .or_else(|_| Date::parse(date, format_description!("[year]-[month]-[day]")))
        .ok()?;
    let time = Time::parse(time, format_description!("[hour]:[minute]:[second]")).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

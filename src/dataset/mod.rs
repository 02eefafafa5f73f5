use serde::{Deserialize, Serialize};
use std::fmt;
use time::PrimitiveDateTime;

pub mod loader;

pub use loader::{LoadError, load_from_path, load_from_reader};

pub const TEMPERATURE_NODES: usize = 4;
pub const LIGHT_NODES: usize = 4;
pub const SOUND_NODES: usize = 4;
pub const PIR_NODES: usize = 2;

/// One row of the occupancy dataset after sorting and re-indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Dense 0-based position in the sorted store.
    pub position: usize,
    pub timestamp: PrimitiveDateTime,
    pub temperature: [f64; TEMPERATURE_NODES],
    pub light: [f64; LIGHT_NODES],
    pub sound: [f64; SOUND_NODES],
    pub co2: f64,
    pub pir: [u8; PIR_NODES],
    pub occupancy: u32,
}

impl Reading {
    pub fn value(&self, column: Column) -> f64 {
        match column {
            Column::S1Temp => self.temperature[0],
            Column::S2Temp => self.temperature[1],
            Column::S3Temp => self.temperature[2],
            Column::S4Temp => self.temperature[3],
            Column::S1Light => self.light[0],
            Column::S2Light => self.light[1],
            Column::S3Light => self.light[2],
            Column::S4Light => self.light[3],
            Column::S1Sound => self.sound[0],
            Column::S2Sound => self.sound[1],
            Column::S3Sound => self.sound[2],
            Column::S4Sound => self.sound[3],
            Column::S5Co2 => self.co2,
            Column::S6Pir => f64::from(self.pir[0]),
            Column::S7Pir => f64::from(self.pir[1]),
            Column::RoomOccupancyCount => f64::from(self.occupancy),
        }
    }
}

/// Numeric field of a [`Reading`], spelled the way the dataset header spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "S1_Temp")]
    S1Temp,
    #[serde(rename = "S2_Temp")]
    S2Temp,
    #[serde(rename = "S3_Temp")]
    S3Temp,
    #[serde(rename = "S4_Temp")]
    S4Temp,
    #[serde(rename = "S1_Light")]
    S1Light,
    #[serde(rename = "S2_Light")]
    S2Light,
    #[serde(rename = "S3_Light")]
    S3Light,
    #[serde(rename = "S4_Light")]
    S4Light,
    #[serde(rename = "S1_Sound")]
    S1Sound,
    #[serde(rename = "S2_Sound")]
    S2Sound,
    #[serde(rename = "S3_Sound")]
    S3Sound,
    #[serde(rename = "S4_Sound")]
    S4Sound,
    #[serde(rename = "S5_CO2")]
    S5Co2,
    #[serde(rename = "S6_PIR")]
    S6Pir,
    #[serde(rename = "S7_PIR")]
    S7Pir,
    #[serde(rename = "Room_Occupancy_Count")]
    RoomOccupancyCount,
}

impl Column {
    pub const ALL: [Column; 16] = [
        Column::S1Temp,
        Column::S2Temp,
        Column::S3Temp,
        Column::S4Temp,
        Column::S1Light,
        Column::S2Light,
        Column::S3Light,
        Column::S4Light,
        Column::S1Sound,
        Column::S2Sound,
        Column::S3Sound,
        Column::S4Sound,
        Column::S5Co2,
        Column::S6Pir,
        Column::S7Pir,
        Column::RoomOccupancyCount,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::S1Temp => "S1_Temp",
            Column::S2Temp => "S2_Temp",
            Column::S3Temp => "S3_Temp",
            Column::S4Temp => "S4_Temp",
            Column::S1Light => "S1_Light",
            Column::S2Light => "S2_Light",
            Column::S3Light => "S3_Light",
            Column::S4Light => "S4_Light",
            Column::S1Sound => "S1_Sound",
            Column::S2Sound => "S2_Sound",
            Column::S3Sound => "S3_Sound",
            Column::S4Sound => "S4_Sound",
            Column::S5Co2 => "S5_CO2",
            Column::S6Pir => "S6_PIR",
            Column::S7Pir => "S7_PIR",
            Column::RoomOccupancyCount => "Room_Occupancy_Count",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Closed interval of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

/// Closed interval of store positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub min: usize,
    pub max: usize,
}

impl IndexRange {
    pub fn clamp(&self, position: i64) -> usize {
        let min = i64::try_from(self.min).unwrap_or(i64::MAX);
        let max = i64::try_from(self.max).unwrap_or(i64::MAX);
        // `min <= max` holds for every range the store hands out.
        let clamped = position.max(min).min(max);
        usize::try_from(clamped).unwrap_or(self.min)
    }
}

/// Time-ordered readings, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesStore {
    readings: Vec<Reading>,
}

impl TimeSeriesStore {
    /// Sorts by timestamp (stable), keeps at most `max_rows`, and reassigns positions.
    pub fn from_readings(mut readings: Vec<Reading>, max_rows: Option<usize>) -> Self {
        readings.sort_by_key(|reading| reading.timestamp);
        if let Some(max_rows) = max_rows {
            readings.truncate(max_rows);
        }
        for (position, reading) in readings.iter_mut().enumerate() {
            reading.position = position;
        }
        Self { readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn at(&self, position: usize) -> Option<&Reading> {
        self.readings.get(position)
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Readings in `[start, end]`, clipped to the valid position range.
    pub fn slice(&self, start: usize, end: usize) -> &[Reading] {
        let Some(last) = self.readings.len().checked_sub(1) else {
            return &[];
        };
        let end = end.min(last);
        if start > end {
            return &[];
        }
        &self.readings[start..=end]
    }

    pub fn time_span(&self) -> Option<TimeRange> {
        let first = self.readings.first()?;
        let last = self.readings.last()?;
        Some(TimeRange {
            start: first.timestamp,
            end: last.timestamp,
        })
    }

    pub fn full_index_range(&self) -> Option<IndexRange> {
        let last = self.readings.len().checked_sub(1)?;
        Some(IndexRange { min: 0, max: last })
    }

    /// First position at or after `range.start` and last position at or before `range.end`.
    pub fn index_range_within(&self, range: TimeRange) -> Option<IndexRange> {
        let min = self
            .readings
            .iter()
            .position(|reading| reading.timestamp >= range.start)?;
        let max = self
            .readings
            .iter()
            .rposition(|reading| reading.timestamp <= range.end)?;
        if min > max {
            return None;
        }
        Some(IndexRange { min, max })
    }
}

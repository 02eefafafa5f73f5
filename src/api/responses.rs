use serde::Serialize;

/// Point-in-time readout for the time slider.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SnapshotResponse {
    pub index: usize,
    pub current_time: String,
    pub true_count: u32,
    pub s6_pir: u8,
    pub s7_pir: u8,
    pub avg_temp: f64,
    pub avg_light: f64,
    pub avg_sound: f64,
    pub co2: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataErrorResponse {
    pub error_code: DataErrorCode,
    pub error_message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataErrorCode {
    InvalidTime,
    NoData,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LatencySummaryResponse {
    pub transitions: usize,
    pub reference_channel: String,
    pub visible_range: Option<VisibleRangeResponse>,
    pub channels: Vec<ChannelSummaryResponse>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct VisibleRangeResponse {
    pub min_index: usize,
    pub max_index: usize,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ChannelSummaryResponse {
    pub name: String,
    pub column: String,
    pub rule: String,
    pub detected: usize,
    pub undetected: usize,
    /// `null` when the channel detected nothing.
    pub mean_latency_seconds: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Ko,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub rows: usize,
    pub transitions: usize,
}

use crate::api::responses::{
    ChannelSummaryResponse, DataErrorCode, DataErrorResponse, HealthStatus,
    HealthSuccessResponse, LatencySummaryResponse, SnapshotResponse, VisibleRangeResponse,
};
use crate::dataset::Reading;
use crate::state::DashboardContext;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use time::PrimitiveDateTime;
use time::macros::format_description;
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
/// The snapshot's light average covers the first three nodes only.
const SNAPSHOT_LIGHT_NODES: usize = 3;

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

fn format_timestamp(timestamp: PrimitiveDateTime) -> Result<String, TimestampError> {
    timestamp
        .format(format_description!(
            "[year repr:last_two]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .map_err(TimestampError::Format)
}

pub async fn get_index(State(context): State<Arc<DashboardContext>>) -> Html<String> {
    Html(context.index_html().to_owned())
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub time: Option<String>,
}

pub enum DataResponse {
    Success(SnapshotResponse),
    Error {
        status: StatusCode,
        body: DataErrorResponse,
    },
}

impl IntoResponse for DataResponse {
    fn into_response(self) -> Response {
        match self {
            DataResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            DataResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_data(
    State(context): State<Arc<DashboardContext>>,
    Query(query): Query<DataQuery>,
) -> impl IntoResponse {
    build_data_response(&context, query.time.as_deref())
}

fn build_data_response(context: &DashboardContext, raw_time: Option<&str>) -> DataResponse {
    let Some(position) = raw_time.and_then(parse_position) else {
        warn!(time = ?raw_time, "Rejected /get_data request with invalid time");
        return DataResponse::Error {
            status: StatusCode::BAD_REQUEST,
            body: DataErrorResponse {
                error_code: DataErrorCode::InvalidTime,
                error_message: "time must be an integer position".to_string(),
            },
        };
    };

    let Some(range) = context.visible_range() else {
        return DataResponse::Error {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: DataErrorResponse {
                error_code: DataErrorCode::NoData,
                error_message: "No readings loaded".to_string(),
            },
        };
    };

    let index = range.clamp(position);
    let Some(reading) = context.store().at(index) else {
        return data_internal_error("clamped index outside store");
    };

    match snapshot(reading) {
        Ok(body) => DataResponse::Success(body),
        Err(err) => data_internal_error(&err.to_string()),
    }
}

/// Integer positions, saturating on overflow so oversized values still clamp.
fn parse_position(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(position) = raw.parse::<i64>() {
        return Some(position);
    }
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

fn snapshot(reading: &Reading) -> Result<SnapshotResponse, TimestampError> {
    Ok(SnapshotResponse {
        index: reading.position,
        current_time: format_timestamp(reading.timestamp)?,
        true_count: reading.occupancy,
        s6_pir: reading.pir[0],
        s7_pir: reading.pir[1],
        avg_temp: mean(&reading.temperature),
        avg_light: mean(&reading.light[..SNAPSHOT_LIGHT_NODES]),
        avg_sound: mean(&reading.sound),
        co2: reading.co2,
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn data_internal_error(message: &str) -> DataResponse {
    error!(message = message, "Internal error while handling /get_data");
    DataResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: DataErrorResponse {
            error_code: DataErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
        },
    }
}

pub enum LatencySummary {
    Success(LatencySummaryResponse),
    Error {
        status: StatusCode,
        body: DataErrorResponse,
    },
}

impl IntoResponse for LatencySummary {
    fn into_response(self) -> Response {
        match self {
            LatencySummary::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            LatencySummary::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_latency_summary(
    State(context): State<Arc<DashboardContext>>,
) -> impl IntoResponse {
    build_latency_summary(&context)
}

fn build_latency_summary(context: &DashboardContext) -> LatencySummary {
    let report = context.report();

    let visible_range = match context.visible_range() {
        Some(range) => {
            let bounds = context
                .store()
                .at(range.min)
                .zip(context.store().at(range.max));
            let Some((first, last)) = bounds else {
                return summary_internal_error("visible range outside store");
            };
            match (
                format_timestamp(first.timestamp),
                format_timestamp(last.timestamp),
            ) {
                (Ok(start), Ok(end)) => Some(VisibleRangeResponse {
                    min_index: range.min,
                    max_index: range.max,
                    start,
                    end,
                }),
                _ => return summary_internal_error("timestamp formatting failure"),
            }
        }
        None => None,
    };

    let channels = report
        .channels()
        .iter()
        .map(|channel| ChannelSummaryResponse {
            name: channel.name().to_string(),
            column: channel.config().column.to_string(),
            rule: channel.config().rule.kind().to_string(),
            detected: channel.detected(),
            undetected: channel.undetected(),
            mean_latency_seconds: channel.mean(),
        })
        .collect();

    LatencySummary::Success(LatencySummaryResponse {
        transitions: report.events().len(),
        reference_channel: context.reference_channel().to_string(),
        visible_range,
        channels,
    })
}

fn summary_internal_error(message: &str) -> LatencySummary {
    error!(message = message, "Internal error while handling /api/latency");
    LatencySummary::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: DataErrorResponse {
            error_code: DataErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
        },
    }
}

pub struct HealthResponse {
    status: StatusCode,
    body: HealthSuccessResponse,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub async fn get_health(State(context): State<Arc<DashboardContext>>) -> impl IntoResponse {
    build_health_response(&context)
}

fn build_health_response(context: &DashboardContext) -> HealthResponse {
    let rows = context.store().len();
    let transitions = context.report().events().len();
    let reference_detected = context
        .report()
        .channel(context.reference_channel())
        .is_some_and(|channel| channel.detected() > 0);

    let status = if rows == 0 {
        HealthStatus::Ko
    } else if transitions == 0 || !reference_detected {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };
    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
    };

    HealthResponse {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            rows,
            transitions,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TimeSeriesStore;
    use crate::dataset::fixtures::store_with_occupancy;
    use crate::error::AppError;
    use crate::state::fixtures::settings;

    fn context(occupancy: &[u32], pir: &[u8]) -> Result<DashboardContext, AppError> {
        let mut readings = store_with_occupancy(occupancy, 30);
        for (reading, value) in readings.iter_mut().zip(pir) {
            reading.pir[0] = *value;
        }
        readings[0].temperature = [20.0, 21.0, 22.0, 23.0];
        readings[0].light = [30.0, 60.0, 90.0, 1000.0];
        DashboardContext::build(TimeSeriesStore::from_readings(readings, None), settings())
    }

    fn ten_rows_without_motion() -> Result<DashboardContext, AppError> {
        context(&[0, 0, 1, 1, 1, 0, 0, 2, 2, 0], &[0; 10])
    }

    #[test]
    fn out_of_range_time_clamps_to_last_valid_index() -> Result<(), AppError> {
        let context = ten_rows_without_motion()?;

        let response = build_data_response(&context, Some("999999"));

        match response {
            DataResponse::Success(body) => {
                assert_eq!(body.index, 9);
                assert_eq!(body.true_count, 0);
                assert_eq!(body.current_time, "17-12-22 10:54:11");
            }
            DataResponse::Error { status, .. } => {
                panic!("expected success response, got error: {status}");
            }
        }
        Ok(())
    }

    #[test]
    fn negative_and_overflowing_times_are_clamped() -> Result<(), AppError> {
        let context = ten_rows_without_motion()?;

        let low = build_data_response(&context, Some("-5"));
        let huge = build_data_response(&context, Some("99999999999999999999999"));

        assert!(matches!(low, DataResponse::Success(ref body) if body.index == 0));
        assert!(matches!(huge, DataResponse::Success(ref body) if body.index == 9));
        Ok(())
    }

    #[test]
    fn time_is_clamped_into_the_reference_detection_range() -> Result<(), AppError> {
        let context = context(&[0, 0, 1, 1, 1, 0, 0, 0], &[0, 0, 1, 1, 1, 0, 0, 0])?;

        let low = build_data_response(&context, Some("0"));
        let high = build_data_response(&context, Some("7"));

        assert!(matches!(low, DataResponse::Success(ref body) if body.index == 2));
        assert!(matches!(high, DataResponse::Success(ref body) if body.index == 5));
        Ok(())
    }

    #[test]
    fn snapshot_averages_nodes() -> Result<(), AppError> {
        let context = ten_rows_without_motion()?;

        let response = build_data_response(&context, Some("0"));

        let DataResponse::Success(body) = response else {
            panic!("expected success response");
        };
        assert_eq!(body.avg_temp, 21.5);
        assert_eq!(body.avg_light, 60.0);
        assert_eq!(body.co2, 390.0);
        assert_eq!(body.current_time, "17-12-22 10:49:41");
        Ok(())
    }

    #[test]
    fn non_numeric_time_is_a_client_error() -> Result<(), AppError> {
        let context = ten_rows_without_motion()?;

        for raw in [Some("soon"), Some("4.5"), Some(""), Some("-"), None] {
            match build_data_response(&context, raw) {
                DataResponse::Error { status, body } => {
                    assert_eq!(status, StatusCode::BAD_REQUEST);
                    assert_eq!(body.error_code, DataErrorCode::InvalidTime);
                }
                DataResponse::Success(_) => panic!("expected client error for {raw:?}"),
            }
        }
        Ok(())
    }

    #[test]
    fn empty_dataset_reports_no_data() -> Result<(), AppError> {
        let context = DashboardContext::build(TimeSeriesStore::default(), settings())?;

        match build_data_response(&context, Some("3")) {
            DataResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body.error_code, DataErrorCode::NoData);
            }
            DataResponse::Success(_) => panic!("expected no data response"),
        }
        Ok(())
    }

    #[test]
    fn latency_summary_reports_means_and_missing_data() -> Result<(), AppError> {
        let context = context(&[0, 0, 1, 1, 1, 0, 0, 0], &[0, 0, 1, 1, 1, 0, 0, 0])?;

        let LatencySummary::Success(body) = build_latency_summary(&context) else {
            panic!("expected success summary");
        };

        assert_eq!(body.transitions, 2);
        assert_eq!(body.reference_channel, "PIR");
        let pir = &body.channels[0];
        assert_eq!(pir.name, "PIR");
        assert_eq!(pir.column, "S6_PIR");
        assert_eq!(pir.rule, "edge_change");
        assert_eq!(pir.detected, 2);
        assert_eq!(pir.mean_latency_seconds, Some(0.0));
        let co2 = &body.channels[3];
        assert_eq!(co2.detected, 0);
        assert_eq!(co2.undetected, 2);
        assert_eq!(co2.mean_latency_seconds, None);
        assert_eq!(
            body.visible_range,
            Some(VisibleRangeResponse {
                min_index: 2,
                max_index: 5,
                start: "17-12-22 10:50:41".to_string(),
                end: "17-12-22 10:52:11".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn health_reflects_dataset_and_detections() -> Result<(), AppError> {
        let healthy = context(&[0, 0, 1, 1, 1, 0, 0, 0], &[0, 0, 1, 1, 1, 0, 0, 0])?;
        let quiet = ten_rows_without_motion()?;
        let empty = DashboardContext::build(TimeSeriesStore::default(), settings())?;

        let ok = build_health_response(&healthy);
        let degraded = build_health_response(&quiet);
        let ko = build_health_response(&empty);

        assert_eq!((ok.status, ok.body.status), (StatusCode::OK, HealthStatus::Ok));
        assert_eq!(
            (degraded.status, degraded.body.status),
            (StatusCode::OK, HealthStatus::Degraded)
        );
        assert_eq!(
            (ko.status, ko.body.status),
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Ko)
        );
        Ok(())
    }
}

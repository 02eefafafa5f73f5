use crate::dataset::TimeSeriesStore;
use crate::error::AppError;
use tracing::{info, warn};

pub mod channel;
pub mod latency;
pub mod report;
pub mod transitions;
pub mod window;

pub use channel::{ChannelConfig, CrossingRule, default_channels};
pub use latency::{LatencyEstimator, LatencyOutcome};
pub use report::{ChannelLatencies, LatencyReport, LatencyView, build_report};
pub use transitions::{TransitionEvent, detect_transitions};

/// Fewer than two readings means no transition can exist.
pub fn check_dataset(store: &TimeSeriesStore) -> Result<(), AppError> {
    if store.len() < 2 {
        return Err(AppError::EmptyDataset { rows: store.len() });
    }
    Ok(())
}

/// Detect transitions and estimate every configured channel, logging a summary.
pub fn run_pipeline(store: &TimeSeriesStore, channels: &[ChannelConfig]) -> LatencyReport {
    if let Err(err) = check_dataset(store) {
        warn!(error = %err, "Latency report will be empty");
    }

    let report = build_report(store, channels);
    if report.events().is_empty() {
        warn!(rows = store.len(), "No occupancy transitions found");
    } else {
        info!(transitions = report.events().len(), "Occupancy transitions detected");
    }

    for channel in report.channels() {
        match channel.mean() {
            Some(mean) => info!(
                channel = channel.name(),
                rule = channel.config().rule.kind(),
                detected = channel.detected(),
                undetected = channel.undetected(),
                mean_latency_seconds = mean,
                "Channel latency computed"
            ),
            None => warn!(
                channel = channel.name(),
                rule = channel.config().rule.kind(),
                undetected = channel.undetected(),
                "Channel has no detected latencies"
            ),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::store_with_occupancy;

    #[test]
    fn check_dataset_rejects_tiny_stores() {
        let single = TimeSeriesStore::from_readings(store_with_occupancy(&[0], 1), None);
        let pair = TimeSeriesStore::from_readings(store_with_occupancy(&[0, 1], 1), None);

        assert!(matches!(
            check_dataset(&TimeSeriesStore::default()),
            Err(AppError::EmptyDataset { rows: 0 })
        ));
        assert!(matches!(
            check_dataset(&single),
            Err(AppError::EmptyDataset { rows: 1 })
        ));
        assert!(check_dataset(&pair).is_ok());
    }

    #[test]
    fn pipeline_degrades_to_empty_report_on_empty_store() {
        let report = run_pipeline(&TimeSeriesStore::default(), &default_channels());

        assert!(report.events().is_empty());
        assert_eq!(report.channels().len(), 4);
        assert!(report.channels().iter().all(|c| c.mean().is_none()));
    }
}

use crate::dataset::TimeSeriesStore;
use crate::dataset::TimeRange;
use crate::estimation::channel::ChannelConfig;
use crate::estimation::latency::{LatencyEstimator, LatencyOutcome};
use crate::estimation::transitions::{TransitionEvent, detect_transitions};
use time::{Duration, PrimitiveDateTime};

/// Detected latencies for one channel, in event order.
///
/// `latencies[i]` was detected at `detected_at[i]`; both vectors are only ever
/// appended together.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelLatencies {
    config: ChannelConfig,
    latencies: Vec<f64>,
    detected_at: Vec<PrimitiveDateTime>,
    undetected: usize,
}

/// Borrowed, possibly truncated view over a channel's samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyView<'a> {
    pub latencies: &'a [f64],
    pub detected_at: &'a [PrimitiveDateTime],
}

impl LatencyView<'_> {
    pub fn len(&self) -> usize {
        self.latencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty()
    }

    pub fn time_range(&self) -> Option<TimeRange> {
        Some(TimeRange {
            start: *self.detected_at.first()?,
            end: *self.detected_at.last()?,
        })
    }
}

impl ChannelLatencies {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            latencies: Vec::new(),
            detected_at: Vec::new(),
            undetected: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn record(&mut self, event: &TransitionEvent, outcome: LatencyOutcome) {
        match outcome {
            LatencyOutcome::Detected { seconds, .. } => {
                self.latencies.push(seconds);
                self.detected_at
                    .push(event.timestamp + Duration::seconds_f64(seconds));
            }
            LatencyOutcome::Undetected => self.undetected += 1,
        }
    }

    pub fn latencies(&self) -> &[f64] {
        &self.latencies
    }

    pub fn detected_at(&self) -> &[PrimitiveDateTime] {
        &self.detected_at
    }

    pub fn detected(&self) -> usize {
        self.latencies.len()
    }

    pub fn undetected(&self) -> usize {
        self.undetected
    }

    /// Mean detected latency in seconds; `None` when nothing was detected.
    pub fn mean(&self) -> Option<f64> {
        if self.latencies.is_empty() {
            return None;
        }
        Some(self.latencies.iter().sum::<f64>() / self.latencies.len() as f64)
    }

    /// The first `limit` samples, or all of them when `limit` is `None`.
    pub fn truncated(&self, limit: Option<usize>) -> LatencyView<'_> {
        let len = limit.map_or(self.latencies.len(), |limit| {
            limit.min(self.latencies.len())
        });
        LatencyView {
            latencies: &self.latencies[..len],
            detected_at: &self.detected_at[..len],
        }
    }
}

/// Per-channel latency collections plus the transitions they were derived from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LatencyReport {
    events: Vec<TransitionEvent>,
    channels: Vec<ChannelLatencies>,
}

impl LatencyReport {
    pub fn events(&self) -> &[TransitionEvent] {
        &self.events
    }

    pub fn channels(&self) -> &[ChannelLatencies] {
        &self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelLatencies> {
        self.channels.iter().find(|channel| channel.name() == name)
    }

    /// `[first, last]` detection instants of `reference`, within its first `limit` samples.
    pub fn visible_time_range(&self, reference: &str, limit: Option<usize>) -> Option<TimeRange> {
        self.channel(reference)?.truncated(limit).time_range()
    }
}

/// Evaluate every channel against every transition, in chronological order.
pub fn build_report(store: &TimeSeriesStore, channels: &[ChannelConfig]) -> LatencyReport {
    let events = detect_transitions(store);
    let estimator = LatencyEstimator::new(store);
    let mut collections: Vec<ChannelLatencies> =
        channels.iter().cloned().map(ChannelLatencies::new).collect();

    for event in &events {
        for collection in &mut collections {
            let outcome = estimator.estimate(event, collection.config());
            collection.record(event, outcome);
        }
    }

    LatencyReport {
        events,
        channels: collections,
    }
}

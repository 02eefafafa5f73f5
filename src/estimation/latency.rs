use crate::dataset::TimeSeriesStore;
use crate::estimation::channel::{ChannelConfig, CrossingRule};
use crate::estimation::transitions::TransitionEvent;
use crate::estimation::window::{Selection, Window, search};

/// Result of searching one channel around one transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyOutcome {
    Detected { position: usize, seconds: f64 },
    /// No qualifying reading in the window. Not an error and never zero.
    Undetected,
}

impl LatencyOutcome {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            LatencyOutcome::Detected { seconds, .. } => Some(*seconds),
            LatencyOutcome::Undetected => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, LatencyOutcome::Detected { .. })
    }
}

/// Evaluates the configured crossing rules against a loaded store.
#[derive(Debug, Clone, Copy)]
pub struct LatencyEstimator<'a> {
    store: &'a TimeSeriesStore,
}

impl<'a> LatencyEstimator<'a> {
    pub fn new(store: &'a TimeSeriesStore) -> Self {
        Self { store }
    }

    /// The window `channel` searches around `event`, clipped to the store.
    pub fn window_for(&self, event: &TransitionEvent, channel: &ChannelConfig) -> Option<Window> {
        let (before, after) = match channel.rule {
            CrossingRule::EdgeChange { half_width } => (half_width, half_width),
            CrossingRule::Threshold { forward, .. } => (0, forward),
        };
        Window::around(event.position, before, after, self.store.len())
    }

    pub fn estimate(&self, event: &TransitionEvent, channel: &ChannelConfig) -> LatencyOutcome {
        let Some(window) = self.window_for(event, channel) else {
            return LatencyOutcome::Undetected;
        };
        let column = channel.column;

        let found = match channel.rule {
            CrossingRule::EdgeChange { .. } => search(
                self.store,
                window,
                Selection::ClosestTo(event.timestamp),
                |reading, previous| {
                    previous.is_some_and(|previous| reading.value(column) != previous.value(column))
                },
            ),
            CrossingRule::Threshold { threshold, .. } => {
                search(self.store, window, Selection::First, |reading, _| {
                    reading.value(column) > threshold
                })
            }
        };

        let Some(reading) = found.and_then(|position| self.store.at(position)) else {
            return LatencyOutcome::Undetected;
        };

        let elapsed = (reading.timestamp - event.timestamp).as_seconds_f64();
        let seconds = match channel.rule {
            // Motion sensors may fire slightly before the recorded transition.
            CrossingRule::EdgeChange { .. } => elapsed.abs(),
            CrossingRule::Threshold { .. } => elapsed,
        };

        LatencyOutcome::Detected {
            position: reading.position,
            seconds,
        }
    }
}

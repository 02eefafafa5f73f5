use crate::dataset::TimeSeriesStore;
use time::PrimitiveDateTime;

/// A position where the ground-truth occupancy differs from the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub position: usize,
    pub timestamp: PrimitiveDateTime,
    pub from: u32,
    pub to: u32,
}

/// Single forward pass; position 0 never produces an event.
pub fn detect_transitions(store: &TimeSeriesStore) -> Vec<TransitionEvent> {
    store
        .readings()
        .windows(2)
        .filter(|pair| pair[0].occupancy != pair[1].occupancy)
        .map(|pair| TransitionEvent {
            position: pair[1].position,
            timestamp: pair[1].timestamp,
            from: pair[0].occupancy,
            to: pair[1].occupancy,
        })
        .collect()
}

//! Windowed search over the time-series store.
//!
//! Both crossing rules reduce to the same primitive: walk a clipped, inclusive
//! window of positions, test each reading against a predicate, and pick one
//! match according to a [`Selection`] policy.

use crate::dataset::{Reading, TimeSeriesStore};
use std::ops::RangeInclusive;
use time::PrimitiveDateTime;

/// Inclusive range of store positions searched for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// `[center - before, center + after]` clipped to `[0, len - 1]`.
    ///
    /// Returns `None` when `center` is not a valid position of a store of `len` readings.
    pub fn around(center: usize, before: usize, after: usize, len: usize) -> Option<Self> {
        if center >= len {
            return None;
        }
        Some(Self {
            start: center.saturating_sub(before),
            end: center.saturating_add(after).min(len - 1),
        })
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.start..=self.end).contains(&position)
    }

    pub fn positions(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Which match to keep when several positions satisfy the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Lowest position in the window.
    First,
    /// Smallest absolute time distance to the instant; ties go to the lowest position.
    ClosestTo(PrimitiveDateTime),
}

/// Search `window` for a reading satisfying `predicate` and return its position.
///
/// The predicate also receives the reading's predecessor *inside the window*, so
/// the first position of the window is always tested with `None`.
pub fn search<P>(
    store: &TimeSeriesStore,
    window: Window,
    selection: Selection,
    mut predicate: P,
) -> Option<usize>
where
    P: FnMut(&Reading, Option<&Reading>) -> bool,
{
    let mut previous: Option<&Reading> = None;
    let mut best: Option<(usize, time::Duration)> = None;

    for reading in store.slice(window.start, window.end) {
        let matched = predicate(reading, previous);
        previous = Some(reading);
        if !matched {
            continue;
        }

        match selection {
            Selection::First => return Some(reading.position),
            Selection::ClosestTo(target) => {
                let distance = (reading.timestamp - target).abs();
                if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                    best = Some((reading.position, distance));
                }
            }
        }
    }

    best.map(|(position, _)| position)
}

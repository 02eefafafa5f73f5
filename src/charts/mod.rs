//! Static dashboard charts.
//!
//! Every chart is rasterized once at startup, PNG-encoded, and kept as a base64
//! string so the page can inline it as a `data:` URI.

use crate::dataset::{Column, TimeSeriesStore};
use crate::estimation::LatencyReport;
use base64::Engine;
use image::Rgb;
use thiserror::Error;
use time::PrimitiveDateTime;
use tracing::debug;

pub mod canvas;

use canvas::{BLACK, Canvas, MARKER_GREY, Scale};

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
];
const LIGHT_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const CO2_COLOR: Rgb<u8> = Rgb([139, 0, 0]);

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("failed to encode chart: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    /// Charted detections per channel in the latency timeline.
    pub display_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub id: &'static str,
    pub title: String,
    pub png_base64: String,
}

pub fn color_for(index: usize) -> Rgb<u8> {
    PALETTE[index % PALETTE.len()]
}

/// Render the full dashboard chart set in display order.
pub fn render_dashboard(
    store: &TimeSeriesStore,
    report: &LatencyReport,
    options: &ChartOptions,
) -> Result<Vec<RenderedChart>, ChartError> {
    let axis = TimeAxis::for_store(store);
    let charts = vec![
        finish(
            "pir_vs_occ",
            "PIR Activation vs Ground Truth",
            pir_vs_occupancy(store, &axis, options),
        )?,
        finish(
            "latency_timeline",
            "Sensor Detection Latencies Over Time",
            latency_timeline(report, &axis, options),
        )?,
        finish(
            "latency_comparison",
            "Mean Detection Latency by Sensor Type",
            latency_comparison(report, options),
        )?,
        finish(
            "co2_vs_occ",
            "CO\u{2082} Levels vs Room Occupancy Over Time",
            channel_vs_occupancy(store, &axis, Column::S5Co2, CO2_COLOR, options),
        )?,
        finish(
            "light_vs_occ",
            "Light Levels vs Room Occupancy Over Time",
            channel_vs_occupancy(store, &axis, Column::S1Light, LIGHT_COLOR, options),
        )?,
    ];
    debug!(count = charts.len(), "Dashboard charts rendered");
    Ok(charts)
}

fn finish(id: &'static str, title: &str, canvas: Canvas) -> Result<RenderedChart, ChartError> {
    let png = canvas.encode_png()?;
    Ok(RenderedChart {
        id,
        title: title.to_string(),
        png_base64: base64::engine::general_purpose::STANDARD.encode(png),
    })
}

/// Seconds since the first reading; every chart shares the store's full span.
struct TimeAxis {
    origin: Option<PrimitiveDateTime>,
    scale: Scale,
}

impl TimeAxis {
    fn for_store(store: &TimeSeriesStore) -> Self {
        match store.time_span() {
            Some(span) => {
                let end = (span.end - span.start).as_seconds_f64();
                Self {
                    origin: Some(span.start),
                    scale: Scale::from_values([0.0, end]).unwrap_or(Scale::UNIT),
                }
            }
            None => Self {
                origin: None,
                scale: Scale::UNIT,
            },
        }
    }

    fn offset(&self, timestamp: PrimitiveDateTime) -> f64 {
        self.origin
            .map_or(0.0, |origin| (timestamp - origin).as_seconds_f64())
    }
}

fn occupancy_series(store: &TimeSeriesStore, axis: &TimeAxis) -> Vec<(f64, f64)> {
    store
        .readings()
        .iter()
        .map(|r| (axis.offset(r.timestamp), f64::from(r.occupancy)))
        .collect()
}

fn column_series(store: &TimeSeriesStore, axis: &TimeAxis, column: Column) -> Vec<(f64, f64)> {
    store
        .readings()
        .iter()
        .map(|r| (axis.offset(r.timestamp), r.value(column)))
        .collect()
}

fn pir_vs_occupancy(store: &TimeSeriesStore, axis: &TimeAxis, options: &ChartOptions) -> Canvas {
    let mut canvas = Canvas::new(options.width, options.height);
    let occupancy = occupancy_series(store, axis);
    let y = Scale::from_values(occupancy.iter().map(|(_, count)| *count))
        .unwrap_or(Scale::UNIT)
        .including(0.0)
        .including(1.0)
        .with_headroom(0.05);

    canvas.step_line(&occupancy, &axis.scale, &y, BLACK);
    for (index, column) in [Column::S6Pir, Column::S7Pir].into_iter().enumerate() {
        let series = column_series(store, axis, column);
        canvas.step_line(&series, &axis.scale, &y, color_for(index));
    }
    canvas
}

/// Channel on the primary axis, occupancy on an independent secondary axis.
fn channel_vs_occupancy(
    store: &TimeSeriesStore,
    axis: &TimeAxis,
    column: Column,
    color: Rgb<u8>,
    options: &ChartOptions,
) -> Canvas {
    let mut canvas = Canvas::new(options.width, options.height);
    let values = column_series(store, axis, column);
    let primary = Scale::from_values(values.iter().map(|(_, v)| *v)).unwrap_or(Scale::UNIT);
    let occupancy = occupancy_series(store, axis);
    let secondary = Scale::from_values(occupancy.iter().map(|(_, count)| *count))
        .unwrap_or(Scale::UNIT)
        .including(0.0);

    canvas.polyline(&values, &axis.scale, &primary, color);
    canvas.step_line(&occupancy, &axis.scale, &secondary, BLACK);
    canvas
}

fn latency_timeline(report: &LatencyReport, axis: &TimeAxis, options: &ChartOptions) -> Canvas {
    let mut canvas = Canvas::new(options.width, options.height);

    let series: Vec<Vec<(f64, f64)>> = report
        .channels()
        .iter()
        .map(|channel| {
            let view = channel.truncated(options.display_limit);
            view.detected_at
                .iter()
                .zip(view.latencies)
                .map(|(at, latency)| (axis.offset(*at), *latency))
                .collect()
        })
        .collect();
    let y = Scale::from_values(series.iter().flatten().map(|(_, latency)| *latency))
        .unwrap_or(Scale::UNIT)
        .including(0.0)
        .with_headroom(0.05);

    for event in report.events() {
        canvas.vline(&axis.scale, axis.offset(event.timestamp), MARKER_GREY);
    }
    for (index, points) in series.iter().enumerate() {
        canvas.polyline(points, &axis.scale, &y, color_for(index));
        canvas.markers(points, &axis.scale, &y, color_for(index));
    }
    canvas
}

/// Channels without detections get no bar.
fn latency_comparison(report: &LatencyReport, options: &ChartOptions) -> Canvas {
    let mut canvas = Canvas::new(options.width, options.height);
    let means: Vec<Option<f64>> = report.channels().iter().map(|c| c.mean()).collect();
    let y = Scale::from_values(means.iter().flatten().copied())
        .unwrap_or(Scale::UNIT)
        .including(0.0)
        .with_headroom(0.1);

    for (index, mean) in means.iter().enumerate() {
        if let Some(mean) = mean {
            canvas.bar(index, means.len(), *mean, &y, color_for(index));
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::store_with_occupancy;
    use crate::estimation::{build_report, default_channels};

    const SMALL: ChartOptions = ChartOptions {
        width: 120,
        height: 60,
        display_limit: None,
    };

    #[test]
    fn renders_every_dashboard_chart_as_base64_png() -> Result<(), ChartError> {
        let mut readings = store_with_occupancy(&[0, 0, 1, 1, 2, 0], 30);
        readings[2].pir[0] = 1;
        readings[3].light[0] = 80.0;
        let store = TimeSeriesStore::from_readings(readings, None);
        let report = build_report(&store, &default_channels());

        let charts = render_dashboard(&store, &report, &SMALL)?;

        let ids: Vec<&str> = charts.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                "pir_vs_occ",
                "latency_timeline",
                "latency_comparison",
                "co2_vs_occ",
                "light_vs_occ"
            ]
        );
        for chart in &charts {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(&chart.png_base64)
                .expect("valid base64");
            assert_eq!(&bytes[..4], b"\x89PNG");
        }
        Ok(())
    }

    #[test]
    fn empty_inputs_still_render() -> Result<(), ChartError> {
        let store = TimeSeriesStore::default();
        let report = LatencyReport::default();

        let charts = render_dashboard(&store, &report, &SMALL)?;

        assert_eq!(charts.len(), 5);
        Ok(())
    }

    #[test]
    fn comparison_skips_channels_without_data() {
        let store = TimeSeriesStore::from_readings(store_with_occupancy(&[0, 1], 30), None);
        let report = build_report(&store, &default_channels());
        let empty = Canvas::new(SMALL.width, SMALL.height);

        let canvas = latency_comparison(&report, &SMALL);

        // Nothing was detected, so no bars were drawn.
        for x in 0..SMALL.width {
            for y in 0..SMALL.height {
                assert_eq!(canvas.pixel(x, y), empty.pixel(x, y));
            }
        }
    }
}

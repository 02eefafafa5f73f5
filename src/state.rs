use crate::charts::{ChartOptions, RenderedChart, render_dashboard};
use crate::config::Config;
use crate::dataset::{IndexRange, TimeSeriesStore};
use crate::error::AppError;
use crate::estimation::{ChannelConfig, LatencyReport, run_pipeline};
use std::fmt::Write as _;
use tracing::{info, warn};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Settings the context needs beyond the dataset itself.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub title: String,
    pub channels: Vec<ChannelConfig>,
    pub reference_channel: String,
    pub charts: ChartOptions,
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Self {
        let (width, height) = config.chart_size();
        Self {
            title: config.app.name.clone(),
            channels: config.channels(),
            reference_channel: config.reference_channel().to_string(),
            charts: ChartOptions {
                width,
                height,
                display_limit: config.display_limit(),
            },
        }
    }
}

/// Everything the HTTP layer serves, computed once before the server starts.
#[derive(Debug)]
pub struct DashboardContext {
    store: TimeSeriesStore,
    report: LatencyReport,
    charts: Vec<RenderedChart>,
    visible: Option<IndexRange>,
    reference_channel: String,
    index_html: String,
}

impl DashboardContext {
    pub fn build(store: TimeSeriesStore, settings: DashboardSettings) -> Result<Self, AppError> {
        let report = run_pipeline(&store, &settings.channels);
        let visible = visible_index_range(
            &store,
            &report,
            &settings.reference_channel,
            settings.charts.display_limit,
        );
        match visible {
            Some(range) => info!(
                min_index = range.min,
                max_index = range.max,
                "Slider range resolved"
            ),
            None => warn!("Dataset is empty; slider range unavailable"),
        }

        let charts = render_dashboard(&store, &report, &settings.charts)?;
        info!(count = charts.len(), "Charts rendered");
        let index_html = render_index(&settings.title, &charts, visible);

        Ok(Self {
            store,
            report,
            charts,
            visible,
            reference_channel: settings.reference_channel,
            index_html,
        })
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn report(&self) -> &LatencyReport {
        &self.report
    }

    pub fn charts(&self) -> &[RenderedChart] {
        &self.charts
    }

    /// Positions the slider may select; `None` only for an empty dataset.
    pub fn visible_range(&self) -> Option<IndexRange> {
        self.visible
    }

    pub fn reference_channel(&self) -> &str {
        &self.reference_channel
    }

    pub fn index_html(&self) -> &str {
        &self.index_html
    }
}

/// Slider bounds from the reference channel's detections, else the whole store.
pub fn visible_index_range(
    store: &TimeSeriesStore,
    report: &LatencyReport,
    reference: &str,
    display_limit: Option<usize>,
) -> Option<IndexRange> {
    let from_detections = report
        .visible_time_range(reference, display_limit)
        .and_then(|range| store.index_range_within(range));
    if from_detections.is_none() && !store.is_empty() {
        warn!(
            channel = reference,
            "Reference channel has no detections; using full dataset range"
        );
    }
    from_detections.or_else(|| store.full_index_range())
}

fn render_index(title: &str, charts: &[RenderedChart], visible: Option<IndexRange>) -> String {
    let mut figures = String::new();
    for chart in charts {
        let _ = write!(
            figures,
            "<figure id=\"{id}\"><figcaption>{title}</figcaption>\
             <img alt=\"{title}\" src=\"data:image/png;base64,{png}\"></figure>\n",
            id = chart.id,
            title = escape_html(&chart.title),
            png = chart.png_base64,
        );
    }
    let range = visible.unwrap_or(IndexRange { min: 0, max: 0 });

    INDEX_TEMPLATE
        .replace("{{title}}", &escape_html(title))
        .replace("{{min_index}}", &range.min.to_string())
        .replace("{{max_index}}", &range.max.to_string())
        .replace("{{charts}}", &figures)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}


#[cfg(test)]
mod tests {
    use super::fixtures::settings;
    use super::*;
    use crate::dataset::Reading;
    use crate::dataset::fixtures::store_with_occupancy;

    fn pir_store(occupancy: &[u32], pir: &[u8]) -> TimeSeriesStore {
        let mut readings: Vec<Reading> = store_with_occupancy(occupancy, 30);
        for (reading, value) in readings.iter_mut().zip(pir) {
            reading.pir[0] = *value;
        }
        TimeSeriesStore::from_readings(readings, None)
    }

    #[test]
    fn slider_range_follows_reference_detections() -> Result<(), AppError> {
        let store = pir_store(&[0, 0, 1, 1, 1, 0, 0, 0], &[0, 0, 1, 1, 1, 0, 0, 0]);

        let context = DashboardContext::build(store, settings())?;

        assert_eq!(context.visible_range(), Some(IndexRange { min: 2, max: 5 }));
        Ok(())
    }

    #[test]
    fn slider_range_falls_back_to_full_store_without_detections() -> Result<(), AppError> {
        let store = pir_store(&[0, 1, 1, 0], &[0, 0, 0, 0]);

        let context = DashboardContext::build(store, settings())?;

        assert_eq!(context.visible_range(), Some(IndexRange { min: 0, max: 3 }));
        Ok(())
    }

    #[test]
    fn empty_store_builds_without_a_range() -> Result<(), AppError> {
        let context = DashboardContext::build(TimeSeriesStore::default(), settings())?;

        assert_eq!(context.visible_range(), None);
        assert!(context.index_html().contains("max=\"0\""));
        Ok(())
    }

    #[test]
    fn index_page_embeds_charts_and_slider_bounds() -> Result<(), AppError> {
        let store = pir_store(&[0, 0, 1, 1, 1, 0, 0, 0], &[0, 0, 1, 1, 1, 0, 0, 0]);

        let context = DashboardContext::build(store, settings())?;
        let html = context.index_html();

        assert_eq!(html.matches("data:image/png;base64,").count(), 5);
        assert!(html.contains("min=\"2\""));
        assert!(html.contains("max=\"5\""));
        assert!(!html.contains("{{"));
        Ok(())
    }

    #[test]
    fn titles_are_escaped() {
        assert_eq!(escape_html("CO2 <ppm> & \"q\""), "CO2 &lt;ppm&gt; &amp; &quot;q&quot;");
    }
}

//! Static HTML/SVG graph.
//!
//! Draws the min/max/mean of each bucket as three lines with a legend, axis
//! labels and a hover tooltip per bucket. The artifact is a pure function of
//! its input series, and it is replaced atomically so a browser never loads a
//! half-written file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use askama::Template;
use chrono::{DateTime, Utc};
use strum_macros::{AsRefStr, Display};

use crate::config::DEFAULT_BUCKET;
use crate::render::{BucketStats, RenderError, aggregate};
use crate::storage::Sample;

/// Graph title, also used as the document title.
pub const TITLE: &str = "Ping graph";
const X_LABEL: &str = "date/time";
const Y_LABEL: &str = "ping value (ms)";

const TOOLTIP_TIME_FORMAT: &str = "%F %T";
const AXIS_TIME_FORMAT: &str = "%m/%d %H:%M:%S";

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 90.0;
const X_TICKS: usize = 6;
const Y_TICKS: usize = 5;

/// The three aggregate series drawn per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Series {
    Min,
    Max,
    Mean,
}

impl Series {
    /// Draw order.
    pub const ALL: [Series; 3] = [Series::Min, Series::Max, Series::Mean];

    /// Line color.
    pub fn color(self) -> &'static str {
        match self {
            Self::Min => "blue",
            Self::Max => "red",
            Self::Mean => "green",
        }
    }

    fn value(self, bucket: &BucketStats) -> f64 {
        match self {
            Self::Min => bucket.min,
            Self::Max => bucket.max,
            Self::Mean => bucket.mean,
        }
    }
}

/// Outcome of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    /// Artifact path.
    pub path: PathBuf,
    /// Samples handed to the renderer.
    pub samples: usize,
    /// Buckets drawn.
    pub buckets: usize,
}

// =============================================================================
// Template
// =============================================================================

struct LineView {
    name: String,
    color: &'static str,
    /// One polyline per run of adjacent buckets.
    segments: Vec<String>,
}

struct TickView {
    pos: String,
    label: String,
}

struct ColumnView {
    x: String,
    width: String,
    tooltip: String,
}

struct LegendView {
    name: String,
    color: &'static str,
    y: String,
}

#[derive(Template)]
#[template(path = "graph.html")]
struct GraphTemplate<'a> {
    title: &'a str,
    x_label: &'a str,
    y_label: &'a str,
    width: f64,
    height: f64,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    x_label_y: f64,
    y_label_x: f64,
    mid_x: f64,
    mid_y: f64,
    lines: Vec<LineView>,
    x_ticks: Vec<TickView>,
    y_ticks: Vec<TickView>,
    columns: Vec<ColumnView>,
    legend: Vec<LegendView>,
}

/// Linear mapping from data space to the plot area.
struct Scale {
    t0_ms: i64,
    span_ms: f64,
    y_max: f64,
}

impl Scale {
    fn new(buckets: &[BucketStats], width: Duration) -> Self {
        let width_ms = i64::try_from(width.as_millis()).unwrap_or(i64::MAX).max(1);
        let t0_ms = buckets.first().map_or(0, |b| b.start.timestamp_millis());
        let t1_ms = buckets
            .last()
            .map_or(t0_ms, |b| b.start.timestamp_millis())
            .saturating_add(width_ms);

        let peak = buckets.iter().map(|b| b.max).fold(0.0_f64, f64::max);
        let y_max = if peak > 0.0 { peak * 1.1 } else { 1.0 };

        Self {
            t0_ms,
            span_ms: (t1_ms - t0_ms).max(1) as f64,
            y_max,
        }
    }

    fn plot_width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height() -> f64 {
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn x_ms(&self, ms: i64) -> f64 {
        MARGIN_LEFT + (ms - self.t0_ms) as f64 / self.span_ms * Self::plot_width()
    }

    fn x(&self, ts: DateTime<Utc>) -> f64 {
        self.x_ms(ts.timestamp_millis())
    }

    fn y(&self, value: f64) -> f64 {
        MARGIN_TOP + Self::plot_height() - value / self.y_max * Self::plot_height()
    }
}

fn tooltip(bucket: &BucketStats) -> String {
    let mut text = format!("time: {}", bucket.start.format(TOOLTIP_TIME_FORMAT));
    for series in Series::ALL {
        text.push_str(&format!("\n{}: {:.3}", series, series.value(bucket)));
    }
    text
}

/// Split buckets wherever a bucket without data leaves a hole.
fn contiguous_runs(buckets: &[BucketStats], width: Duration) -> Vec<&[BucketStats]> {
    let width_ms = i64::try_from(width.as_millis()).unwrap_or(i64::MAX);
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..buckets.len() {
        let gap = buckets[i].start.timestamp_millis() - buckets[i - 1].start.timestamp_millis();
        if gap > width_ms {
            runs.push(&buckets[start..i]);
            start = i;
        }
    }
    if start < buckets.len() {
        runs.push(&buckets[start..]);
    }
    runs
}

fn build_template(buckets: &[BucketStats], width: Duration) -> GraphTemplate<'static> {
    let scale = Scale::new(buckets, width);

    let runs = contiguous_runs(buckets, width);
    let lines = Series::ALL
        .iter()
        .map(|series| LineView {
            name: series.to_string(),
            color: series.color(),
            segments: runs
                .iter()
                .map(|run| {
                    run.iter()
                        .map(|b| format!("{:.1},{:.1}", scale.x(b.start), scale.y(series.value(b))))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect(),
        })
        .collect();

    let x_ticks = if buckets.is_empty() {
        Vec::new()
    } else {
        (0..X_TICKS)
            .map(|i| {
                let ms = scale.t0_ms + (scale.span_ms * i as f64 / (X_TICKS - 1) as f64) as i64;
                let label = DateTime::from_timestamp_millis(ms)
                    .map(|ts| ts.format(AXIS_TIME_FORMAT).to_string())
                    .unwrap_or_default();
                TickView {
                    pos: format!("{:.1}", scale.x_ms(ms)),
                    label,
                }
            })
            .collect()
    };

    let y_ticks = (0..=Y_TICKS)
        .map(|i| {
            let value = scale.y_max * i as f64 / Y_TICKS as f64;
            TickView {
                pos: format!("{:.1}", scale.y(value)),
                label: format!("{value:.1}"),
            }
        })
        .collect();

    let column_width = (width.as_millis() as f64 / scale.span_ms * Scale::plot_width()).max(1.0);
    let columns = buckets
        .iter()
        .map(|b| ColumnView {
            x: format!("{:.1}", scale.x(b.start)),
            width: format!("{column_width:.1}"),
            tooltip: tooltip(b),
        })
        .collect();

    let legend = Series::ALL
        .iter()
        .enumerate()
        .map(|(i, series)| LegendView {
            name: series.to_string(),
            color: series.color(),
            y: format!("{:.1}", MARGIN_TOP + 14.0 + 18.0 * i as f64),
        })
        .collect();

    GraphTemplate {
        title: TITLE,
        x_label: X_LABEL,
        y_label: Y_LABEL,
        width: WIDTH,
        height: HEIGHT,
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        right: WIDTH - MARGIN_RIGHT,
        bottom: HEIGHT - MARGIN_BOTTOM,
        x_label_y: HEIGHT - 20.0,
        y_label_x: 20.0,
        mid_x: MARGIN_LEFT + Scale::plot_width() / 2.0,
        mid_y: MARGIN_TOP + Scale::plot_height() / 2.0,
        lines,
        x_ticks,
        y_ticks,
        columns,
        legend,
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Renders a series into the graph artifact.
#[derive(Debug, Clone)]
pub struct GraphRenderer {
    output: PathBuf,
    bucket: Duration,
}

impl GraphRenderer {
    /// Create a renderer writing to `output` with 5-minute buckets.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            bucket: DEFAULT_BUCKET,
        }
    }

    /// Set the bucket width.
    pub fn with_bucket(mut self, bucket: Duration) -> Self {
        self.bucket = bucket;
        self
    }

    /// Artifact path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Bucket width.
    pub fn bucket(&self) -> Duration {
        self.bucket
    }

    /// Render the artifact to a string.
    ///
    /// Returns the HTML and the number of buckets drawn.
    pub fn render_html<'a>(
        &self,
        series: impl IntoIterator<Item = &'a Sample>,
    ) -> Result<(String, usize), RenderError> {
        let buckets = aggregate(series, self.bucket);
        let html = build_template(&buckets, self.bucket).render()?;
        Ok((html, buckets.len()))
    }

    /// Render an ordered series and replace the artifact.
    pub fn render<'a>(
        &self,
        series: impl IntoIterator<Item = &'a Sample>,
    ) -> Result<RenderSummary, RenderError> {
        let series: Vec<&Sample> = series.into_iter().collect();
        let (html, buckets) = self.render_html(series.iter().copied())?;

        if let Some(parent) = self.output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut staging = self.output.clone().into_os_string();
        staging.push(".tmp");
        std::fs::write(&staging, html)?;
        std::fs::rename(&staging, &self.output)?;

        tracing::debug!(
            path = %self.output.display(),
            samples = series.len(),
            buckets,
            "Graph rendered"
        );

        Ok(RenderSummary {
            path: self.output.clone(),
            samples: series.len(),
            buckets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_100 + secs, 0).unwrap()
    }

    fn scenario() -> Vec<Sample> {
        vec![
            Sample::success(at(10), 12.5),
            Sample::failure(at(20)),
            Sample::success(at(30), 15.0),
        ]
    }

    #[test]
    fn test_series_names() {
        let names: Vec<&str> = Series::ALL.iter().map(|s| s.as_ref()).collect();
        assert_eq!(names, vec!["min", "max", "mean"]);
        assert_eq!(Series::Mean.color(), "green");
    }

    #[test]
    fn test_tooltip_has_three_decimals() {
        let bucket = aggregate(&scenario(), DEFAULT_BUCKET)[0];
        let text = tooltip(&bucket);

        assert!(text.starts_with("time: 2023-11-14 22:15:00"));
        assert!(text.contains("min: 12.500"));
        assert!(text.contains("max: 15.000"));
        assert!(text.contains("mean: 13.750"));
    }

    #[test]
    fn test_render_html_contains_labels_and_series() {
        let renderer = GraphRenderer::new("unused.html");
        let (html, buckets) = renderer.render_html(&scenario()).unwrap();

        assert_eq!(buckets, 1);
        assert!(html.contains("<title>Ping graph</title>"));
        assert!(html.contains("date"));
        assert!(html.contains("ping value (ms)"));
        for series in Series::ALL {
            assert!(html.contains(&format!("stroke=\"{}\"", series.color())));
        }
        assert_eq!(html.matches("class=\"hover\"").count(), 1);
    }

    #[test]
    fn test_outage_breaks_lines() {
        // Buckets at 0-10s and 20-30s; the empty 10-20s bucket splits each line
        let renderer = GraphRenderer::new("unused.html").with_bucket(Duration::from_secs(10));
        let series = vec![
            Sample::success(at(0), 1.0),
            Sample::failure(at(10)),
            Sample::success(at(20), 2.0),
            Sample::success(at(30), 3.0),
        ];

        let (html, buckets) = renderer.render_html(&series).unwrap();
        assert_eq!(buckets, 3);
        assert_eq!(html.matches("<polyline").count(), 2 * Series::ALL.len());

        let (html, _) = renderer.render_html(&series[2..]).unwrap();
        assert_eq!(html.matches("<polyline").count(), Series::ALL.len());
    }

    #[test]
    fn test_legend_toggles_series() {
        let renderer = GraphRenderer::new("unused.html");
        let (html, _) = renderer.render_html(&scenario()).unwrap();

        for series in Series::ALL {
            assert!(html.contains(&format!(
                "class=\"legend-item\" data-series=\"{series}\""
            )));
        }
        assert!(html.contains("<script>"));
        assert!(html.contains("addEventListener('click'"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = GraphRenderer::new("unused.html");
        let series = scenario();

        let (first, _) = renderer.render_html(&series).unwrap();
        let (second, _) = renderer.render_html(&series).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_empty_series_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("graph").join("ping.html");
        let renderer = GraphRenderer::new(&output);

        let summary = renderer.render(&Vec::<Sample>::new()).unwrap();
        assert_eq!(summary.buckets, 0);
        assert_eq!(summary.samples, 0);

        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains("Ping graph"));
        assert_eq!(html.matches("class=\"hover\"").count(), 0);
    }

    #[test]
    fn test_render_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ping.html");
        let renderer = GraphRenderer::new(&output).with_bucket(Duration::from_secs(10));

        renderer.render(&Vec::<Sample>::new()).unwrap();
        let summary = renderer.render(&scenario()).unwrap();
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.buckets, 2);

        let html = std::fs::read_to_string(&output).unwrap();
        assert_eq!(html.matches("class=\"hover\"").count(), 2);
        assert!(!dir.path().join("ping.html.tmp").exists());
    }
}

//! # Briefcast Chart
//!
//! Chart rendering for published posts. Rendering is an external
//! service call (Chart.js config in, PNG out); this crate owns the
//! degradation ladder: a spec with fewer than two data points — or any
//! render failure — falls back to a title-only placeholder image, and a
//! failed placeholder falls back to no image at all. The absence of an
//! image is never a run failure.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use briefcast_core::Result;
use briefcast_core::config::ChartsConfig;
use briefcast_core::error::BriefcastError;
use briefcast_core::types::{ChartKind, ChartSpec};

/// Renders a chart specification into an image file, or signals failure.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, spec: &ChartSpec) -> Result<PathBuf>;
    async fn render_placeholder(&self, title: &str) -> Result<PathBuf>;
}

/// Render with the full fallback ladder. Always attempted — charting is
/// mandatory for every post, but never fatal.
pub async fn render_chart(renderer: &dyn ChartRenderer, spec: &ChartSpec) -> Option<PathBuf> {
    if spec.points.len() < 2 {
        tracing::warn!("Not enough data points for chart, rendering placeholder");
        return render_placeholder_or_none(renderer, &spec.title).await;
    }
    match renderer.render(spec).await {
        Ok(path) => {
            tracing::info!("Chart rendered: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("Chart render failed ({e}), rendering placeholder");
            render_placeholder_or_none(renderer, &spec.title).await
        }
    }
}

async fn render_placeholder_or_none(renderer: &dyn ChartRenderer, title: &str) -> Option<PathBuf> {
    let title = if title.is_empty() {
        "Market Overview"
    } else {
        title
    };
    match renderer.render_placeholder(title).await {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Placeholder render also failed, posting without image: {e}");
            None
        }
    }
}

/// Chart renderer backed by an external render service that accepts a
/// Chart.js configuration and returns PNG bytes.
pub struct QuickChartRenderer {
    render_url: String,
    output_dir: PathBuf,
    timeout: Duration,
    client: reqwest::Client,
}

impl QuickChartRenderer {
    pub fn new(config: &ChartsConfig) -> Self {
        let output_dir = PathBuf::from(shellexpand::tilde(&config.output_dir).into_owned());
        Self {
            render_url: config.render_url.clone(),
            output_dir,
            timeout: Duration::from_secs(config.timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    async fn render_config(&self, chart_config: Value) -> Result<PathBuf> {
        let body = json!({
            "chart": chart_config,
            "width": 1200,
            "height": 675,
            "format": "png",
            "backgroundColor": "#0f0f0f",
        });

        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(&self.render_url).json(&body).send(),
        )
        .await
        .map_err(|_| BriefcastError::render("Render service timed out"))?
        .map_err(|e| BriefcastError::render(format!("Render request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BriefcastError::render(format!(
                "Render service returned {status}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BriefcastError::render(format!("Render read failed: {e}")))?;

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(chart_filename());
        std::fs::write(&path, &bytes)?;
        Ok(path)
    }
}

#[async_trait]
impl ChartRenderer for QuickChartRenderer {
    async fn render(&self, spec: &ChartSpec) -> Result<PathBuf> {
        self.render_config(chart_config(spec)).await
    }

    async fn render_placeholder(&self, title: &str) -> Result<PathBuf> {
        self.render_config(placeholder_config(title)).await
    }
}

fn chart_filename() -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    // uuid suffix keeps concurrent tenant renders from colliding
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("chart_{stamp}_{}.png", &suffix[..8])
}

/// Dark-theme categorical palette.
const PALETTE: [&str; 12] = [
    "#6366f1", "#8b5cf6", "#a78bfa", "#c4b5fd", "#818cf8", "#7c3aed", "#5b21b6", "#4f46e5",
    "#ec4899", "#f59e0b", "#10b981", "#06b6d4",
];

/// Build the Chart.js configuration for a populated spec.
fn chart_config(spec: &ChartSpec) -> Value {
    // Formatted values ride along in the axis labels so the render
    // service needs no plugin support.
    let labels: Vec<String> = spec
        .points
        .iter()
        .map(|p| format!("{} ({})", p.label, format_value(p.value)))
        .collect();
    let values: Vec<f64> = spec.points.iter().map(|p| p.value).collect();

    let dataset = match spec.kind {
        ChartKind::Line => json!({
            "label": spec.title,
            "data": values,
            "borderColor": "#6366f1",
            "backgroundColor": "rgba(99,102,241,0.1)",
            "pointBackgroundColor": "#8b5cf6",
            "fill": true,
        }),
        ChartKind::Bar | ChartKind::Comparison => json!({
            "label": spec.title,
            "data": values,
            "backgroundColor": &PALETTE[..labels.len().min(PALETTE.len())],
        }),
    };

    let chart_type = match spec.kind {
        ChartKind::Line => "line",
        ChartKind::Bar | ChartKind::Comparison => "bar",
    };

    json!({
        "type": chart_type,
        "data": { "labels": labels, "datasets": [dataset] },
        "options": {
            "plugins": {
                "title": {
                    "display": true,
                    "text": spec.title,
                    "color": "#ffffff",
                    "font": { "size": 22 },
                },
                "legend": { "display": false },
            },
            "scales": {
                "x": { "ticks": { "color": "#e0e0e0" }, "grid": { "color": "#1a1a2e" } },
                "y": { "ticks": { "color": "#e0e0e0" }, "grid": { "color": "#1a1a2e" } },
            },
        },
    })
}

/// Title-only placeholder configuration.
fn placeholder_config(title: &str) -> Value {
    json!({
        "type": "bar",
        "data": { "labels": [], "datasets": [] },
        "options": {
            "plugins": {
                "title": {
                    "display": true,
                    "text": title,
                    "color": "#ffffff",
                    "font": { "size": 28 },
                },
                "legend": { "display": false },
            },
            "scales": {
                "x": { "display": false },
                "y": { "display": false },
            },
        },
    })
}

/// Format large values as currency-style labels (1_200_000_000 → "$1.2B").
pub fn format_value(v: f64) -> String {
    let abs = v.abs();
    if abs >= 1_000_000_000.0 {
        format!("${:.1}B", v / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("${:.1}M", v / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("${:.0}K", v / 1_000.0)
    } else {
        format!("${v:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefcast_core::types::DataPoint;

    fn spec(points: usize) -> ChartSpec {
        ChartSpec {
            kind: ChartKind::Bar,
            title: "Funding Rounds".into(),
            points: (0..points)
                .map(|i| DataPoint {
                    label: format!("p{i}"),
                    value: i as f64 * 1_000_000.0,
                })
                .collect(),
        }
    }

    struct RecordingRenderer {
        fail_render: bool,
        fail_placeholder: bool,
    }

    #[async_trait]
    impl ChartRenderer for RecordingRenderer {
        async fn render(&self, _spec: &ChartSpec) -> Result<PathBuf> {
            if self.fail_render {
                Err(BriefcastError::render("boom"))
            } else {
                Ok(PathBuf::from("/tmp/chart.png"))
            }
        }
        async fn render_placeholder(&self, title: &str) -> Result<PathBuf> {
            if self.fail_placeholder {
                Err(BriefcastError::render("boom"))
            } else {
                Ok(PathBuf::from(format!("/tmp/placeholder-{title}.png")))
            }
        }
    }

    #[tokio::test]
    async fn test_too_few_points_uses_placeholder() {
        let renderer = RecordingRenderer {
            fail_render: false,
            fail_placeholder: false,
        };
        let path = render_chart(&renderer, &spec(1)).await.unwrap();
        assert!(path.to_string_lossy().contains("placeholder"));
    }

    #[tokio::test]
    async fn test_render_failure_falls_back() {
        let renderer = RecordingRenderer {
            fail_render: true,
            fail_placeholder: false,
        };
        let path = render_chart(&renderer, &spec(3)).await.unwrap();
        assert!(path.to_string_lossy().contains("placeholder"));
    }

    #[tokio::test]
    async fn test_double_failure_yields_no_image() {
        let renderer = RecordingRenderer {
            fail_render: true,
            fail_placeholder: true,
        };
        assert!(render_chart(&renderer, &spec(3)).await.is_none());
    }

    #[tokio::test]
    async fn test_enough_points_renders_directly() {
        let renderer = RecordingRenderer {
            fail_render: false,
            fail_placeholder: false,
        };
        let path = render_chart(&renderer, &spec(3)).await.unwrap();
        assert_eq!(path, PathBuf::from("/tmp/chart.png"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1_200_000_000.0), "$1.2B");
        assert_eq!(format_value(45_000_000.0), "$45.0M");
        assert_eq!(format_value(980_000.0), "$980K");
        assert_eq!(format_value(42.0), "$42");
    }

    #[test]
    fn test_chart_config_shape() {
        let config = chart_config(&spec(3));
        assert_eq!(config["type"], "bar");
        assert_eq!(config["data"]["labels"].as_array().unwrap().len(), 3);
    }
}

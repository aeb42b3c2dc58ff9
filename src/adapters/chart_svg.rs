//! SVG chart of portfolio value against the buy-and-hold baseline.

use crate::domain::backtest::{BacktestResult, CurvePoint};
use crate::domain::error::SmacrossError;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 640.0;
const PADDING: f64 = 60.0;

const PORTFOLIO_COLOR: &str = "#1f77b4";
const BASELINE_COLOR: &str = "green";

pub struct SvgChartAdapter {
    pub baseline_label: String,
}

impl SvgChartAdapter {
    pub fn new(baseline_label: impl Into<String>) -> Self {
        Self {
            baseline_label: baseline_label.into(),
        }
    }
}

impl ReportPort for SvgChartAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), SmacrossError> {
        let svg = render_chart(
            &result.portfolio_curve(),
            &result.baseline_curve(),
            &self.baseline_label,
        );
        fs::write(output_path, svg).map_err(|e| SmacrossError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })
    }
}

/// Both curves share one y-scale so the magnitudes compare directly.
pub fn render_chart(
    portfolio: &[CurvePoint],
    baseline: &[CurvePoint],
    baseline_label: &str,
) -> String {
    let values = portfolio
        .iter()
        .chain(baseline)
        .map(|p| p.value)
        .filter(|v| v.is_finite());
    let (min_value, max_value) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{:.0}" y="30" text-anchor="middle" font-family="sans-serif" font-size="18">Portfolio Value</text>
<line x1="{PADDING:.0}" y1="{:.0}" x2="{:.0}" y2="{:.0}" stroke="black"/>
<line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{:.0}" stroke="black"/>
"#,
        WIDTH / 2.0,
        HEIGHT - PADDING,
        WIDTH - PADDING,
        HEIGHT - PADDING,
        HEIGHT - PADDING,
    );

    if !min_value.is_finite() {
        svg.push_str(
            r#"<text x="480" y="320" text-anchor="middle" font-family="sans-serif">No data available.</text>"#,
        );
        svg.push_str("\n</svg>\n");
        return svg;
    }

    svg.push_str(&axis_labels(portfolio, min_value, max_value));
    svg.push_str(&polyline(portfolio, min_value, max_value, PORTFOLIO_COLOR));
    svg.push_str(&polyline(baseline, min_value, max_value, BASELINE_COLOR));
    svg.push_str(&format!(
        r#"<g font-family="sans-serif" font-size="13">
<line x1="{x0:.0}" y1="{y0:.0}" x2="{x1:.0}" y2="{y0:.0}" stroke="{PORTFOLIO_COLOR}" stroke-width="2"/>
<text x="{tx:.0}" y="{ty0:.0}">Portfolio Value</text>
<line x1="{x0:.0}" y1="{y1:.0}" x2="{x1:.0}" y2="{y1:.0}" stroke="{BASELINE_COLOR}" stroke-width="2"/>
<text x="{tx:.0}" y="{ty1:.0}">{label}</text>
</g>
"#,
        x0 = PADDING + 15.0,
        x1 = PADDING + 45.0,
        tx = PADDING + 52.0,
        y0 = PADDING + 15.0,
        ty0 = PADDING + 19.0,
        y1 = PADDING + 35.0,
        ty1 = PADDING + 39.0,
        label = escape(baseline_label),
    ));
    svg.push_str("</svg>\n");
    svg
}

fn scale(min_value: f64, max_value: f64) -> f64 {
    let range = max_value - min_value;
    if range > 0.0 {
        (HEIGHT - 2.0 * PADDING) / range
    } else {
        1.0
    }
}

fn polyline(curve: &[CurvePoint], min_value: f64, max_value: f64, color: &str) -> String {
    if curve.is_empty() {
        return String::new();
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let scale_y = scale(min_value, max_value);
    let scale_x = if curve.len() > 1 {
        plot_width / (curve.len() - 1) as f64
    } else {
        0.0
    };

    let points: Vec<String> = curve
        .iter()
        .enumerate()
        .filter(|(_, p)| p.value.is_finite())
        .map(|(i, p)| {
            let x = PADDING + i as f64 * scale_x;
            let y = HEIGHT - PADDING - (p.value - min_value) * scale_y;
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    format!(
        "<polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
        points.join(" ")
    )
}

fn axis_labels(curve: &[CurvePoint], min_value: f64, max_value: f64) -> String {
    let mut out = format!(
        "<g font-family=\"sans-serif\" font-size=\"11\">\n<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\">{:.2}</text>\n<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\">{:.2}</text>\n",
        PADDING - 5.0,
        HEIGHT - PADDING,
        min_value,
        PADDING - 5.0,
        PADDING + 4.0,
        max_value,
    );
    if let (Some(first), Some(last)) = (curve.first(), curve.last()) {
        out.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\">{}</text>\n<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\">{}</text>\n",
            PADDING,
            HEIGHT - PADDING + 18.0,
            first.date,
            WIDTH - PADDING,
            HEIGHT - PADDING + 18.0,
            last.date,
        ));
    }
    out.push_str("</g>\n");
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

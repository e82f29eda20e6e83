//! Daily consumption chart as a standalone SVG document

use crate::billing::convert::reading_kwh;
use crate::types::{ConsumptionReading, FuelType};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Write as _;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

const PALETTE: [&str; 4] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"];

/// Readings of one meter point, drawn as their own line
#[derive(Debug, Clone, Copy)]
pub struct ChartSeries<'a> {
    pub label: &'a str,
    pub readings: &'a [ConsumptionReading],
}

/// Render a line chart of kWh per day, one line per series on a shared day axis
pub fn render_consumption_svg(fuel: FuelType, series: &[ChartSeries<'_>]) -> String {
    let days: BTreeSet<DateTime<Utc>> = series
        .iter()
        .flat_map(|s| s.readings.iter().map(|r| r.interval_start))
        .collect();
    let days: Vec<DateTime<Utc>> = days.into_iter().collect();

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let max = series
        .iter()
        .flat_map(|s| s.readings.iter().map(reading_kwh))
        .fold(0.0_f64, f64::max);
    let y_max = if max > 0.0 { max } else { 1.0 };
    let x_of = |at: DateTime<Utc>| {
        let i = days.partition_point(|d| *d < at);
        if days.len() > 1 {
            MARGIN_LEFT + plot_w / (days.len() - 1) as f64 * i as f64
        } else {
            MARGIN_LEFT + plot_w / 2.0
        }
    };
    let y_of = |kwh: f64| MARGIN_TOP + plot_h - (kwh / y_max) * plot_h;

    let axis_y = MARGIN_TOP + plot_h;
    let mut svg = String::new();
    // Writing into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="18">{} Consumption</text>"#,
        WIDTH / 2.0,
        fuel.label()
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="black"/>"#,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = axis_y
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
        l = MARGIN_LEFT,
        b = axis_y,
        r = WIDTH - MARGIN_RIGHT
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end" font-size="12">{:.1} kWh</text>"#,
        MARGIN_LEFT - 6.0,
        MARGIN_TOP + 4.0,
        y_max
    );

    if let (Some(first), Some(last)) = (days.first(), days.last()) {
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="12">{}</text>"#,
            MARGIN_LEFT,
            axis_y + 20.0,
            first.format("%Y-%m-%d")
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" font-size="12">{}</text>"#,
            WIDTH - MARGIN_RIGHT,
            axis_y + 20.0,
            last.format("%Y-%m-%d")
        );
    }

    let drawn: Vec<&ChartSeries<'_>> = series.iter().filter(|s| !s.readings.is_empty()).collect();
    for (n, line) in drawn.iter().enumerate() {
        let colour = PALETTE[n % PALETTE.len()];
        let mut sorted: Vec<&ConsumptionReading> = line.readings.iter().collect();
        sorted.sort_by_key(|r| r.interval_start);
        let points: Vec<(f64, f64)> = sorted
            .iter()
            .map(|r| (x_of(r.interval_start), y_of(reading_kwh(r))))
            .collect();

        let path = points
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"/>"#,
            colour, path
        );
        for (x, y) in &points {
            let _ = writeln!(
                svg,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
                x, y, colour
            );
        }
        if drawn.len() > 1 {
            let _ = writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="end" font-size="12" fill="{}">{}</text>"#,
                WIDTH - MARGIN_RIGHT,
                MARGIN_TOP + 14.0 * (n as f64 + 1.0),
                colour,
                escape(line.label)
            );
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

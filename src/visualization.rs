/// Visualization module: static dashboard page.
///
/// Produces a self-contained HTML string with inline SVG:
/// - Metric cards for the key numbers
/// - Bar charts (single series, grouped, or faceted by a column)
/// - A line chart for the monthly ad-spend trend
/// - Plain tables for the remaining summaries
///
/// This module only extracts values from the finished summary frames and
/// lays them out; it performs no aggregation.
use std::collections::BTreeMap;
use std::fmt::{self, Write as FmtWrite};

use chrono::NaiveDate;
use polars::datatypes::AnyValue;
use polars::prelude::*;

use crate::error::DashboardError;
use crate::schema::{ad_budget, summary, transactions};
use crate::view::ViewModel;

const PALETTE: [&str; 8] = [
    "#4c78a8", "#f58518", "#54a24b", "#e45756", "#72b7b2", "#eeca3b", "#b279a2", "#9d755d",
];

const EMPTY_NOTE: &str = "No data for the current filters.";

// ── Config ──────────────────────────────────────────────────────────────────

/// Configuration for the dashboard page.
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    pub title: String,
    /// Pixel width of full-width charts
    pub chart_width: u32,
    /// Pixel height of every chart's plot area
    pub chart_height: u32,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            title: "UAE Sales & Loyalty Dashboard".to_string(),
            chart_width: 900,
            chart_height: 320,
        }
    }
}

// ── Intermediate data structures ────────────────────────────────────────────

struct Bar {
    group: String,
    series: Option<String>,
    value: f64,
}

struct LineSeries {
    name: String,
    /// (month, value)
    points: Vec<(NaiveDate, f64)>,
}

// ── Data extraction ─────────────────────────────────────────────────────────

fn str_values(df: &DataFrame, column: &str) -> Result<Vec<String>, DashboardError> {
    let values = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(values
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect())
}

fn f64_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, DashboardError> {
    let values = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(values
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}

fn extract_bars(
    df: &DataFrame,
    group_col: &str,
    series_col: Option<&str>,
    value_col: &str,
) -> Result<Vec<Bar>, DashboardError> {
    let groups = str_values(df, group_col)?;
    let values = f64_values(df, value_col)?;
    let series: Vec<Option<String>> = match series_col {
        Some(c) => str_values(df, c)?.into_iter().map(Some).collect(),
        None => vec![None; groups.len()],
    };

    Ok(groups
        .into_iter()
        .zip(series)
        .zip(values)
        .map(|((group, series), value)| Bar { group, series, value })
        .collect())
}

fn extract_ad_lines(trend: &DataFrame) -> Result<Vec<LineSeries>, DashboardError> {
    let months = trend
        .column(ad_budget::MONTH)?
        .as_materialized_series()
        .date()?;
    let categories = str_values(trend, ad_budget::CATEGORY)?;
    let spend = f64_values(trend, ad_budget::AD_SPEND_UAE_AED)?;

    let mut by_category: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for ((month, category), value) in months.as_date_iter().zip(categories).zip(spend) {
        if let Some(month) = month {
            by_category.entry(category).or_default().push((month, value));
        }
    }

    Ok(by_category
        .into_iter()
        .map(|(name, mut points)| {
            points.sort_by_key(|p| p.0);
            LineSeries { name, points }
        })
        .collect())
}

/// First-seen order of the distinct values.
fn ordered_unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

// ── HTML generation ─────────────────────────────────────────────────────────

/// Main entry point: renders the whole dashboard page.
pub fn render_html(view: &ViewModel, config: &HtmlConfig) -> Result<String, DashboardError> {
    let mut body = String::new();

    body.push_str(&filters_html(view));
    body.push_str(&metrics_html(view).map_err(fmt_err)?);

    // ── Category ────────────────────────────────────────────────────────
    let bars = extract_bars(
        &view.category_sales,
        transactions::CATEGORY,
        None,
        transactions::TOTAL_AMOUNT_AED,
    )?;
    body.push_str(&section(
        "Sales by Category",
        &bar_chart_svg(&bars, config.chart_width, config.chart_height, "Sales (AED)")
            .map_err(fmt_err)?,
    ));

    // ── Demographics, one facet per gender ──────────────────────────────
    let bars = extract_bars(
        &view.age_gender_sales,
        summary::AGE_GROUP,
        Some(transactions::GENDER),
        transactions::TOTAL_AMOUNT_AED,
    )?;
    let genders = ordered_unique(bars.iter().filter_map(|b| b.series.as_deref()));
    let mut facets = String::new();
    if genders.is_empty() {
        facets.push_str(&empty_note());
    }
    let facet_width = (config.chart_width / genders.len().max(1) as u32).max(200);
    for (i, gender) in genders.iter().enumerate() {
        let facet: Vec<Bar> = bars
            .iter()
            .filter(|b| b.series.as_deref() == Some(gender.as_str()))
            .map(|b| Bar {
                group: b.group.clone(),
                series: None,
                value: b.value,
            })
            .collect();
        write!(
            facets,
            r#"<div class="facet"><div class="facet-title">{}</div>{}</div>"#,
            escape_html(gender),
            bar_chart_colored(
                &facet,
                facet_width,
                config.chart_height,
                "Sales (AED)",
                PALETTE[i % PALETTE.len()],
            )
            .map_err(fmt_err)?,
        )
        .map_err(fmt_err)?;
    }
    body.push_str(&section(
        "Sales by Age Group and Gender",
        &format!(r#"<div class="facets">{facets}</div>"#),
    ));

    // ── Loyalty ─────────────────────────────────────────────────────────
    body.push_str(&section(
        "Loyalty Program Impact",
        &table_html(&view.loyalty_impact)?,
    ));

    let bars = extract_bars(
        &view.points_by_tier,
        transactions::CARD_TIER,
        Some(summary::TYPE),
        summary::VALUE,
    )?;
    body.push_str(&section(
        "Points Earned vs Redeemed",
        &bar_chart_svg(&bars, config.chart_width, config.chart_height, "Points")
            .map_err(fmt_err)?,
    ));

    // ── Offers ──────────────────────────────────────────────────────────
    body.push_str(&section(
        "Offer Effect on Average Transaction",
        &table_html(&view.offer_effect)?,
    ));

    // ── Advertising ─────────────────────────────────────────────────────
    let lines = extract_ad_lines(&view.ad_spend_trend)?;
    body.push_str(&section(
        "Advertising Spend (monthly sample)",
        &format!(
            "{}{}",
            table_html(&view.ad_spend_sample)?,
            line_chart_svg(&lines, config.chart_width, config.chart_height, "Ad spend (AED)")
                .map_err(fmt_err)?
        ),
    ));

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{ font-family: sans-serif; margin: 24px; color: #212529; background: #fff; }}
  h1 {{ font-size: 24px; margin-bottom: 4px; }}
  h2 {{ font-size: 18px; margin: 28px 0 8px; }}
  .subtitle {{ color: #495057; margin-bottom: 16px; }}
  .filters {{ font-size: 13px; color: #495057; border: 1px solid #dee2e6; border-radius: 4px; padding: 8px 12px; }}
  .filters dt {{ font-weight: 600; float: left; clear: left; width: 140px; }}
  .filters dd {{ margin-left: 150px; }}
  .metrics {{ display: flex; gap: 12px; margin-top: 16px; }}
  .metric {{ flex: 1; border: 1px solid #dee2e6; border-radius: 4px; padding: 12px; }}
  .metric-label {{ font-size: 12px; color: #868e96; }}
  .metric-value {{ font-size: 22px; font-weight: 600; }}
  .facets {{ display: flex; flex-wrap: wrap; gap: 12px; }}
  .facet-title {{ font-size: 13px; font-weight: 600; text-align: center; }}
  table {{ border-collapse: collapse; font-size: 13px; margin-bottom: 12px; }}
  th, td {{ border: 1px solid #dee2e6; padding: 4px 10px; text-align: right; }}
  th {{ background: #f8f9fa; }}
  .axis-label {{ font-size: 11px; fill: #495057; }}
  .tick {{ font-size: 10px; fill: #868e96; }}
  .empty {{ color: #868e96; font-style: italic; }}
  footer {{ margin-top: 32px; font-size: 12px; color: #868e96; border-top: 1px solid #dee2e6; padding-top: 8px; }}
</style>
</head>
<body>
<h1>{title}</h1>
<div class="subtitle">Sales by demographics, categories, and loyalty program impact.</div>
{body}
<footer>Use the filters to explore different slices of the data.</footer>
</body>
</html>
"##,
        title = escape_html(&config.title),
        body = body,
    ))
}

fn section(title: &str, content: &str) -> String {
    format!("<section><h2>{}</h2>{}</section>\n", escape_html(title), content)
}

fn empty_note() -> String {
    format!(r#"<div class="empty">{EMPTY_NOTE}</div>"#)
}

fn fmt_err(e: fmt::Error) -> DashboardError {
    DashboardError::Render(e.to_string())
}

fn filters_html(view: &ViewModel) -> String {
    let spec = &view.spec;
    let dates = view
        .applied_dates
        .map(|d| format!("{} to {}", d.start, d.end))
        .unwrap_or_else(|| "n/a".to_string());
    let list = |values: &[String]| {
        if values.is_empty() {
            "(none)".to_string()
        } else {
            escape_html(&values.join(", "))
        }
    };

    format!(
        r#"<dl class="filters">
<dt>Date range</dt><dd>{dates}</dd>
<dt>Age range</dt><dd>{} to {}</dd>
<dt>Gender</dt><dd>{}</dd>
<dt>Locations</dt><dd>{}</dd>
<dt>Categories</dt><dd>{}</dd>
<dt>Loyalty membership</dt><dd>{}</dd>
<dt>Selected rows</dt><dd>{}</dd>
</dl>
"#,
        spec.age_range.0,
        spec.age_range.1,
        list(&spec.genders),
        list(&spec.locations),
        list(&spec.categories),
        spec.loyalty.label(),
        view.selected_rows,
    )
}

fn metrics_html(view: &ViewModel) -> Result<String, fmt::Error> {
    let m = &view.key_metrics;
    let cards = [
        ("Total Sales (AED)", format_thousands(m.total_sales, 2)),
        ("Transactions", m.transactions.to_string()),
        ("Average Basket (AED)", format_thousands(m.average_basket, 2)),
        ("Loyalty Sales %", format!("{:.1}%", m.loyalty_share_pct)),
    ];

    let mut s = String::from(r#"<div class="metrics">"#);
    for (label, value) in cards {
        write!(
            s,
            r#"<div class="metric"><div class="metric-label">{label}</div><div class="metric-value">{value}</div></div>"#
        )?;
    }
    s.push_str("</div>\n");
    Ok(s)
}

/// `1234567.891` -> `1,234,567.89`. NaN renders as `n/a`.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

fn display_value(value: AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Float64(f) => format_thousands(f, 2),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{other}"),
    }
}

/// Plain table with the frame's column names as headers.
pub fn table_html(df: &DataFrame) -> Result<String, DashboardError> {
    if df.height() == 0 {
        return Ok(empty_note());
    }

    let mut s = String::from("<table><thead><tr>");
    for name in df.get_column_names_str() {
        write!(s, "<th>{}</th>", escape_html(name)).map_err(fmt_err)?;
    }
    s.push_str("</tr></thead><tbody>");
    for i in 0..df.height() {
        s.push_str("<tr>");
        for column in df.get_columns() {
            write!(s, "<td>{}</td>", escape_html(&display_value(column.get(i)?)))
                .map_err(fmt_err)?;
        }
        s.push_str("</tr>");
    }
    s.push_str("</tbody></table>");
    Ok(s)
}

// ── SVG charts ──────────────────────────────────────────────────────────────

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 50.0;

fn bar_chart_colored(
    bars: &[Bar],
    width: u32,
    height: u32,
    y_title: &str,
    color: &str,
) -> Result<String, fmt::Error> {
    bar_chart_inner(bars, width, height, y_title, Some(color))
}

/// Bar chart; bars sharing a `group` are drawn side by side, one colour per
/// distinct `series`.
fn bar_chart_svg(bars: &[Bar], width: u32, height: u32, y_title: &str) -> Result<String, fmt::Error> {
    bar_chart_inner(bars, width, height, y_title, None)
}

fn bar_chart_inner(
    bars: &[Bar],
    width: u32,
    height: u32,
    y_title: &str,
    fixed_color: Option<&str>,
) -> Result<String, fmt::Error> {
    if bars.is_empty() {
        return Ok(empty_note());
    }

    let groups = ordered_unique(bars.iter().map(|b| b.group.as_str()));
    let series = ordered_unique(bars.iter().filter_map(|b| b.series.as_deref()));
    let per_group = series.len().max(1);

    let plot_w = width as f64 - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = height as f64;
    let total_h = plot_h + MARGIN_TOP + MARGIN_BOTTOM;
    let y_max = nice_max(bars.iter().map(|b| b.value).fold(0.0, f64::max));

    let group_w = plot_w / groups.len() as f64;
    let bar_w = group_w * 0.8 / per_group as f64;

    let mut s = String::new();
    write!(
        s,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{total_h}">"#
    )?;
    s.push_str(&y_axis(y_max, plot_h, y_title)?);

    for bar in bars {
        let Some(g) = groups.iter().position(|g| *g == bar.group) else {
            continue;
        };
        let k = bar
            .series
            .as_ref()
            .and_then(|name| series.iter().position(|s| s == name))
            .unwrap_or(0);
        let h = if y_max > 0.0 { bar.value / y_max * plot_h } else { 0.0 };
        let x = MARGIN_LEFT + g as f64 * group_w + group_w * 0.1 + k as f64 * bar_w;
        let y = MARGIN_TOP + plot_h - h;
        let color = fixed_color.unwrap_or(PALETTE[k % PALETTE.len()]);
        let tooltip = match &bar.series {
            Some(name) => format!("{}, {}: {}", bar.group, name, format_thousands(bar.value, 2)),
            None => format!("{}: {}", bar.group, format_thousands(bar.value, 2)),
        };
        write!(
            s,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_w:.1}" height="{h:.1}" fill="{color}"><title>{}</title></rect>"#,
            escape_html(&tooltip)
        )?;
    }

    for (g, group) in groups.iter().enumerate() {
        let x = MARGIN_LEFT + (g as f64 + 0.5) * group_w;
        write!(
            s,
            r#"<text class="tick" x="{x:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            MARGIN_TOP + plot_h + 16.0,
            escape_html(group)
        )?;
    }

    if fixed_color.is_none() && !series.is_empty() {
        s.push_str(&legend(&series, width as f64)?);
    }
    s.push_str("</svg>");
    Ok(s)
}

/// Line chart with a monthly x axis, one coloured polyline per series.
fn line_chart_svg(
    lines: &[LineSeries],
    width: u32,
    height: u32,
    y_title: &str,
) -> Result<String, fmt::Error> {
    let all: Vec<(NaiveDate, f64)> = lines.iter().flat_map(|l| l.points.iter().copied()).collect();
    let (Some(x_min), Some(x_max)) = (
        all.iter().map(|p| p.0).min(),
        all.iter().map(|p| p.0).max(),
    ) else {
        return Ok(empty_note());
    };

    let x_span = (x_max - x_min).num_days().max(1) as f64;
    let y_max = nice_max(all.iter().map(|p| p.1).fold(0.0, f64::max));

    let plot_w = width as f64 - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = height as f64;
    let total_h = plot_h + MARGIN_TOP + MARGIN_BOTTOM;
    let sx = |month: NaiveDate| MARGIN_LEFT + (month - x_min).num_days() as f64 / x_span * plot_w;
    let sy = |v: f64| {
        let frac = if y_max > 0.0 { v / y_max } else { 0.0 };
        MARGIN_TOP + plot_h - frac * plot_h
    };

    let mut s = String::new();
    write!(
        s,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{total_h}">"#
    )?;
    s.push_str(&y_axis(y_max, plot_h, y_title)?);

    for (k, line) in lines.iter().enumerate() {
        let color = PALETTE[k % PALETTE.len()];
        let points: Vec<String> = line
            .points
            .iter()
            .map(|&(d, v)| format!("{:.1},{:.1}", sx(d), sy(v)))
            .collect();
        write!(
            s,
            r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{}"/>"#,
            points.join(" ")
        )?;
        for &(d, v) in &line.points {
            write!(
                s,
                r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{color}"><title>{}, {}: {}</title></circle>"#,
                sx(d),
                sy(v),
                d.format("%Y-%m"),
                escape_html(&line.name),
                format_thousands(v, 2)
            )?;
        }
    }

    let mut ticks: Vec<NaiveDate> = all.iter().map(|p| p.0).collect();
    ticks.sort_unstable();
    ticks.dedup();
    for d in ticks {
        write!(
            s,
            r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            sx(d),
            MARGIN_TOP + plot_h + 16.0,
            d.format("%b %Y")
        )?;
    }

    let names: Vec<String> = lines.iter().map(|l| l.name.clone()).collect();
    s.push_str(&legend(&names, width as f64)?);
    s.push_str("</svg>");
    Ok(s)
}

fn y_axis(y_max: f64, plot_h: f64, title: &str) -> Result<String, fmt::Error> {
    let mut s = String::new();
    for step in 0..=4 {
        let v = y_max * step as f64 / 4.0;
        let y = MARGIN_TOP + plot_h - plot_h * step as f64 / 4.0;
        write!(
            s,
            r##"<line x1="{MARGIN_LEFT}" x2="100%" y1="{y:.1}" y2="{y:.1}" stroke="#f1f3f5"/><text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"##,
            MARGIN_LEFT - 6.0,
            y + 3.0,
            format_thousands(v, 0)
        )?;
    }
    write!(
        s,
        r#"<text class="axis-label" x="12" y="{:.1}" transform="rotate(-90 12 {:.1})" text-anchor="middle">{}</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0,
        escape_html(title)
    )?;
    Ok(s)
}

fn legend(names: &[String], width: f64) -> Result<String, fmt::Error> {
    let mut s = String::new();
    let mut x = MARGIN_LEFT;
    for (k, name) in names.iter().enumerate() {
        let color = PALETTE[k % PALETTE.len()];
        write!(
            s,
            r#"<rect x="{x:.1}" y="8" width="10" height="10" fill="{color}"/><text class="axis-label" x="{:.1}" y="17">{}</text>"#,
            x + 14.0,
            escape_html(name)
        )?;
        x += 24.0 + name.len() as f64 * 7.0;
        if x > width - MARGIN_RIGHT {
            break;
        }
    }
    Ok(s)
}

/// Round up to a 1/2/5 x 10^n value so axis ticks land on readable numbers.
fn nice_max(max: f64) -> f64 {
    if max <= 0.0 || !max.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powi(max.log10().floor() as i32);
    let scaled = max / magnitude;
    let nice = if scaled <= 1.0 {
        1.0
    } else if scaled <= 2.0 {
        2.0
    } else if scaled <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use sales_dashboard::aggregation;
use sales_dashboard::visualization::{render_html, HtmlConfig};
use sales_dashboard::{
    filter, render, DashboardData, DashboardError, DateSelection, FilterSpec, LoyaltyMode,
};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load() -> DashboardData {
    DashboardData::load_dir(fixtures_dir()).expect("fixtures load")
}

fn full_spec(data: &DashboardData) -> FilterSpec {
    FilterSpec::full(&data.filter_options().unwrap())
}

fn ids(df: &DataFrame) -> Vec<String> {
    df.column("transaction_id")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
}

fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

/// Copy the fixtures into a temp dir, replacing `transactions.csv`.
fn with_transactions(csv: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in ["customers.csv", "ad_budget.csv"] {
        std::fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }
    std::fs::write(dir.path().join("transactions.csv"), csv).unwrap();
    dir
}

#[test]
fn loads_all_three_tables() {
    let data = load();
    assert_eq!(data.transactions().height(), 10);
    assert_eq!(data.customers().height(), 10);
    assert_eq!(data.ad_budget().height(), 14);
    assert_eq!(
        data.customers().column("join_date").unwrap().dtype(),
        &DataType::Date
    );
}

#[test]
fn repeated_loads_are_identical() {
    let a = load();
    let b = load();
    assert!(a.transactions().equals_missing(b.transactions()));
    assert!(a.customers().equals_missing(b.customers()));
    assert!(a.ad_budget().equals_missing(b.ad_budget()));
}

#[test]
fn full_spec_is_identity() {
    let data = load();
    let out = filter::apply(data.transactions(), &full_spec(&data)).unwrap();
    assert!(out.equals_missing(data.transactions()));
}

#[test]
fn any_empty_option_set_selects_nothing() {
    let data = load();
    let mut spec = full_spec(&data);
    spec.locations.clear();
    let out = filter::apply(data.transactions(), &spec).unwrap();
    assert_eq!(out.height(), 0);
    assert_eq!(out.get_column_names(), data.transactions().get_column_names());
}

#[test]
fn one_day_range_selects_that_day() {
    let data = load();
    let day = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
    let mut spec = full_spec(&data);
    spec.date = DateSelection::Range(day, day);
    let out = filter::apply(data.transactions(), &spec).unwrap();
    assert_eq!(ids(&out), vec!["T03", "T04"]);
}

#[test]
fn empty_selection_metrics_do_not_fail() {
    let data = load();
    let mut spec = full_spec(&data);
    spec.genders.clear();
    let view = render(&data, &spec).unwrap();
    let m = view.key_metrics;
    assert_eq!(m.total_sales, 0.0);
    assert_eq!(m.transactions, 0);
    assert!(m.average_basket.is_nan());
    assert_eq!(m.loyalty_share_pct, 0.0);
}

#[test]
fn category_sales_descending_and_consistent_with_total() {
    let data = load();
    let mut spec = full_spec(&data);
    spec.loyalty = LoyaltyMode::MembersOnly;
    let view = render(&data, &spec).unwrap();

    let sales = floats(&view.category_sales, "total_amount_aed");
    assert!(sales.windows(2).all(|w| w[0] >= w[1]));
    let sum: f64 = sales.iter().sum();
    assert!((sum - view.key_metrics.total_sales).abs() < 1e-9);
}

#[test]
fn loyalty_rows_sum_to_total_sales() {
    let data = load();
    let mut spec = full_spec(&data);
    spec.age_range = (20, 60);
    let view = render(&data, &spec).unwrap();
    let sum: f64 = floats(&view.loyalty_impact, "sales").iter().sum();
    assert!((sum - view.key_metrics.total_sales).abs() < 1e-9);
}

#[test]
fn loyalty_share_scenario() {
    let data = load();
    let view = render(&data, &full_spec(&data)).unwrap();
    assert_eq!(view.key_metrics.transactions, 10);
    assert!((view.key_metrics.loyalty_share_pct - 60.0).abs() < 1e-6);
}

#[test]
fn age_bucket_boundaries() {
    let data = load();
    let out = aggregation::age_gender_sales(data.transactions()).unwrap();
    let lookup = |group: &str, gender: &str| -> Option<f64> {
        let groups = out.column("age_group").unwrap().str().unwrap();
        let genders = out.column("gender").unwrap().str().unwrap();
        let sales = floats(&out, "total_amount_aed");
        (0..out.height())
            .find(|&i| groups.get(i) == Some(group) && genders.get(i) == Some(gender))
            .map(|i| sales[i])
    };

    // age 24 (Male, 150) and age 25 (Female, 50)
    assert_eq!(lookup("16-24", "Male"), Some(150.0));
    assert_eq!(lookup("25-34", "Female"), Some(50.0));
    // age 100 (Male, 110) is the top edge of 65+
    assert_eq!(lookup("65+", "Male"), Some(110.0));
    // age 101 (Female, 150) is dropped; only age 70 remains in 65+ Female
    assert_eq!(lookup("65+", "Female"), Some(90.0));
    // buckets with no rows for a gender still appear
    assert_eq!(lookup("35-44", "Female"), Some(0.0));
    assert_eq!(out.height(), 12);
}

#[test]
fn ad_spend_trend_ignores_transaction_filters() {
    let data = load();
    let a = render(&data, &full_spec(&data)).unwrap();

    let mut narrow = full_spec(&data);
    narrow.categories = vec!["Fashion".to_string()];
    narrow.loyalty = LoyaltyMode::NonMembersOnly;
    narrow.age_range = (60, 80);
    let b = render(&data, &narrow).unwrap();

    assert!(a.ad_spend_trend.equals_missing(&b.ad_spend_trend));
    assert_eq!(a.ad_spend_trend.height(), 14);
    assert_eq!(a.ad_spend_sample.height(), 12);
}

#[test]
fn missing_column_is_data_load_error() {
    let dir = with_transactions("transaction_id,date,age\nT1,2024-01-01,30\n");
    let err = DashboardData::load_dir(dir.path()).unwrap_err();
    assert!(err.is_data_load());
    assert!(matches!(err, DashboardError::MissingColumn { .. }));
}

#[test]
fn unparseable_date_is_data_load_error() {
    let header = std::fs::read_to_string(fixtures_dir().join("transactions.csv"))
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();
    let csv = format!(
        "{header}\nT01,01/02/2024,C01,22,Female,Dubai,Grocery,100.0,True,Gold,100,10,True\n"
    );
    let dir = with_transactions(&csv);
    let err = DashboardData::load_dir(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        DashboardError::InvalidValue { ref column, row: 0, .. } if column == "date"
    ));
}

#[test]
fn html_page_renders_from_fixtures() {
    let data = load();
    let spec = FilterSpec::dashboard_default(&data.filter_options().unwrap());
    let view = render(&data, &spec).unwrap();
    let html = render_html(&view, &HtmlConfig::default()).unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Sales by Category"));
    assert!(html.contains("Advertising Spend (monthly sample)"));
    assert!(html.contains("25 to 45"));
}

#[test]
fn json_export_lists_every_table() {
    let data = load();
    let view = render(&data, &full_spec(&data)).unwrap();
    let json = view.to_json().unwrap();
    for (name, df) in view.tables() {
        assert_eq!(
            json["tables"][name].as_array().map(Vec::len),
            Some(df.height()),
            "table {name}"
        );
    }
    assert_eq!(json["tables"]["loyalty_impact"][1]["label"], "Members");
}

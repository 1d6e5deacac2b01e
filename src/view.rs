use polars::prelude::*;
use serde_json::{json, Map, Number, Value};
use tracing::debug;

use crate::aggregation::{self, KeyMetrics};
use crate::error::DashboardError;
use crate::filter::{self, DateBounds, FilterOptions, FilterSpec};
use crate::loader::DashboardData;

/// Everything one dashboard pass displays. Built by [`render`].
#[derive(Debug, Clone)]
pub struct ViewModel {
    pub spec: FilterSpec,
    pub options: FilterOptions,
    /// The date interval actually applied, after single-date or inverted
    /// range fallbacks.
    pub applied_dates: Option<DateBounds>,
    pub selected_rows: usize,
    pub key_metrics: KeyMetrics,
    pub category_sales: DataFrame,
    pub age_gender_sales: DataFrame,
    pub loyalty_impact: DataFrame,
    pub points_by_tier: DataFrame,
    pub offer_effect: DataFrame,
    pub ad_spend_sample: DataFrame,
    pub ad_spend_trend: DataFrame,
}

/// One filter/aggregate pass. Pure: the data context is only read.
pub fn render(data: &DashboardData, spec: &FilterSpec) -> Result<ViewModel, DashboardError> {
    let options = data.filter_options()?;
    let applied_dates = options.date_bounds.map(|full| spec.date.resolve(full));
    let selected = filter::apply(data.transactions(), spec)?;
    debug!(rows = selected.height(), "Rendering views");

    Ok(ViewModel {
        spec: spec.clone(),
        applied_dates,
        selected_rows: selected.height(),
        key_metrics: aggregation::key_metrics(&selected)?,
        category_sales: aggregation::category_sales(&selected)?,
        age_gender_sales: aggregation::age_gender_sales(&selected)?,
        loyalty_impact: aggregation::loyalty_impact(&selected)?,
        points_by_tier: aggregation::points_by_tier(&selected)?,
        offer_effect: aggregation::offer_effect(&selected)?,
        ad_spend_sample: aggregation::ad_spend_sample(data.ad_budget()),
        ad_spend_trend: aggregation::ad_spend_trend(data.ad_budget())?,
        options,
    })
}

impl ViewModel {
    /// Summary tables keyed by a stable name.
    pub fn tables(&self) -> [(&'static str, &DataFrame); 7] {
        [
            ("category_sales", &self.category_sales),
            ("age_gender_sales", &self.age_gender_sales),
            ("loyalty_impact", &self.loyalty_impact),
            ("points_by_tier", &self.points_by_tier),
            ("offer_effect", &self.offer_effect),
            ("ad_spend_sample", &self.ad_spend_sample),
            ("ad_spend_trend", &self.ad_spend_trend),
        ]
    }

    pub fn to_json(&self) -> Result<Value, DashboardError> {
        let mut tables = Map::new();
        for (name, df) in self.tables() {
            tables.insert(name.to_string(), frame_to_json(df)?);
        }

        let metrics = serde_json::to_value(self.key_metrics)
            .map_err(|e| DashboardError::Render(e.to_string()))?;

        Ok(json!({
            "filters": {
                "date_range": self.applied_dates,
                "age_range": [self.spec.age_range.0, self.spec.age_range.1],
                "genders": self.spec.genders,
                "locations": self.spec.locations,
                "categories": self.spec.categories,
                "loyalty": self.spec.loyalty.label(),
            },
            "selected_rows": self.selected_rows,
            "key_metrics": metrics,
            "tables": tables,
        }))
    }
}

/// Rows as JSON objects keyed by column name.
pub fn frame_to_json(df: &DataFrame) -> Result<Value, DashboardError> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut row = Map::new();
        for column in columns {
            row.insert(column.name().to_string(), any_value_to_json(column.get(i)?));
        }
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float64(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        // dates display as YYYY-MM-DD
        other => Value::String(format!("{other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DateSelection, LoyaltyMode};
    use crate::test_support::sample_data;
    use chrono::NaiveDate;

    #[test]
    fn test_render_full_selection() {
        let data = sample_data();
        let spec = FilterSpec::full(&data.filter_options().unwrap());
        let view = render(&data, &spec).unwrap();
        assert_eq!(view.selected_rows, 10);
        assert_eq!(view.key_metrics.total_sales, 1000.0);
        assert_eq!(view.category_sales.height(), 3);
        assert_eq!(view.ad_spend_sample.height(), 4);
    }

    #[test]
    fn test_applied_dates_reflect_fallback() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.date = DateSelection::Single(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        let view = render(&data, &spec).unwrap();
        assert_eq!(view.applied_dates, view.options.date_bounds);
    }

    #[test]
    fn test_ad_spend_trend_independent_of_filters() {
        let data = sample_data();
        let options = data.filter_options().unwrap();
        let everything = render(&data, &FilterSpec::full(&options)).unwrap();

        let mut narrow = FilterSpec::full(&options);
        narrow.genders = vec!["Male".into()];
        narrow.loyalty = LoyaltyMode::NonMembersOnly;
        narrow.categories.clear();
        let nothing = render(&data, &narrow).unwrap();

        assert_eq!(nothing.selected_rows, 0);
        assert!(everything.ad_spend_trend.equals_missing(&nothing.ad_spend_trend));
    }

    #[test]
    fn test_json_shape() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.genders.clear();
        let json = render(&data, &spec).unwrap().to_json().unwrap();

        assert_eq!(json["selected_rows"], 0);
        assert_eq!(json["key_metrics"]["total_sales"], 0.0);
        assert!(json["key_metrics"]["average_basket"].is_null());
        assert_eq!(json["tables"]["category_sales"], json!([]));
        assert_eq!(json["tables"]["ad_spend_trend"][0]["month"], "2024-01-01");
        assert_eq!(json["filters"]["loyalty"], "All");
    }
}

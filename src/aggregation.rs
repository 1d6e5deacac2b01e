//! Summary views over a filtered transactions table.
//!
//! Every view is a pure function of its input frame and returns a small
//! frame ready for display. Empty input yields an empty frame (or zeroed
//! metrics), never an error.

use polars::prelude::*;
use serde::Serialize;

use crate::error::DashboardError;
use crate::schema::{ad_budget, age_bins, loyalty, summary, transactions};

/// Guards the loyalty share division on an empty selection.
pub const LOYALTY_SHARE_EPSILON: f64 = 1e-9;

/// Number of raw ad-budget rows shown above the trend chart.
pub const AD_SPEND_SAMPLE_ROWS: usize = 12;

/// Headline numbers for the metric cards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_sales: f64,
    /// Distinct `transaction_id` count.
    pub transactions: usize,
    /// Mean basket; NaN when nothing is selected.
    pub average_basket: f64,
    /// Percent of sales made by loyalty card holders.
    pub loyalty_share_pct: f64,
}

pub fn key_metrics(df: &DataFrame) -> Result<KeyMetrics, DashboardError> {
    let amount = df
        .column(transactions::TOTAL_AMOUNT_AED)?
        .as_materialized_series();
    let total_sales = amount
        .sum_reduce()?
        .value()
        .try_extract::<f64>()
        .unwrap_or(0.0);
    let average_basket = amount
        .mean_reduce()
        .value()
        .try_extract::<f64>()
        .unwrap_or(f64::NAN);

    let transactions = df
        .column(transactions::TRANSACTION_ID)?
        .as_materialized_series()
        .n_unique()?;

    let members = df
        .column(transactions::HAS_LOYALTY_CARD)?
        .as_materialized_series()
        .bool()?;
    let member_sales = amount
        .filter(members)?
        .sum_reduce()?
        .value()
        .try_extract::<f64>()
        .unwrap_or(0.0);

    Ok(KeyMetrics {
        total_sales,
        transactions,
        average_basket,
        loyalty_share_pct: 100.0 * member_sales / (total_sales + LOYALTY_SHARE_EPSILON),
    })
}

/// `category`, `total_amount_aed`: summed sales per category, largest first.
pub fn category_sales(df: &DataFrame) -> Result<DataFrame, DashboardError> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(transactions::CATEGORY)])
        .agg([col(transactions::TOTAL_AMOUNT_AED).sum()])
        .sort(
            [transactions::TOTAL_AMOUNT_AED, transactions::CATEGORY],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;
    Ok(out)
}

/// Bucket `age` into the labelled right-closed bins. Ages outside
/// `(15, 100]` map to null.
pub fn age_group_expr() -> Expr {
    age_bins::BINS.iter().rev().fold(
        lit(NULL).cast(DataType::String),
        |otherwise, &(lower, upper, label)| {
            when(
                col(transactions::AGE)
                    .gt(lit(lower))
                    .and(col(transactions::AGE).lt_eq(lit(upper))),
            )
            .then(lit(label))
            .otherwise(otherwise)
        },
    )
}

/// `age_group`, `gender`, `total_amount_aed` for every bucket and every
/// gender in `df`, with 0 where nothing matched. Rows without a bucket are
/// dropped from this view only.
pub fn age_gender_sales(df: &DataFrame) -> Result<DataFrame, DashboardError> {
    let sums = df
        .clone()
        .lazy()
        .with_column(age_group_expr().alias(summary::AGE_GROUP))
        .filter(col(summary::AGE_GROUP).is_not_null())
        .group_by([col(summary::AGE_GROUP), col(transactions::GENDER)])
        .agg([col(transactions::TOTAL_AMOUNT_AED).sum()]);

    let genders = df
        .column(transactions::GENDER)?
        .as_materialized_series()
        .unique_stable()?;
    let genders: Vec<&str> = genders.str()?.into_iter().flatten().collect();
    let (labels, grid_genders): (Vec<&str>, Vec<&str>) = age_bins::BINS
        .iter()
        .flat_map(|&(_, _, label)| genders.iter().map(move |&gender| (label, gender)))
        .unzip();
    let grid = DataFrame::new(vec![
        Column::new(summary::AGE_GROUP.into(), labels),
        Column::new(transactions::GENDER.into(), grid_genders),
    ])?;

    let keys = [col(summary::AGE_GROUP), col(transactions::GENDER)];
    let out = grid
        .lazy()
        .join(sums, keys.clone(), keys, JoinArgs::new(JoinType::Left))
        .with_column(col(transactions::TOTAL_AMOUNT_AED).fill_null(lit(0.0)))
        .sort(
            [summary::AGE_GROUP, transactions::GENDER],
            SortMultipleOptions::default(),
        )
        .collect()?;
    Ok(out)
}

/// `label`, `sales`, `transactions`, `avg_basket` for non-members then members.
pub fn loyalty_impact(df: &DataFrame) -> Result<DataFrame, DashboardError> {
    let out = df
        .clone()
        .lazy()
        .group_by([col(transactions::HAS_LOYALTY_CARD)])
        .agg([
            col(transactions::TOTAL_AMOUNT_AED).sum().alias(summary::SALES),
            col(transactions::TRANSACTION_ID)
                .n_unique()
                .cast(DataType::Int64)
                .alias(summary::TRANSACTIONS),
            col(transactions::TOTAL_AMOUNT_AED)
                .mean()
                .alias(summary::AVG_BASKET),
        ])
        .sort([transactions::HAS_LOYALTY_CARD], SortMultipleOptions::default())
        .select([
            when(col(transactions::HAS_LOYALTY_CARD))
                .then(lit(loyalty::MEMBERS))
                .otherwise(lit(loyalty::NON_MEMBERS))
                .alias(summary::LABEL),
            col(summary::SALES),
            col(summary::TRANSACTIONS),
            col(summary::AVG_BASKET),
        ])
        .collect()?;
    Ok(out)
}

/// Long form `card_tier`, `type`, `value`: one row per tier and points metric.
///
/// Rows without a card tier (non-members) are left out.
pub fn points_by_tier(df: &DataFrame) -> Result<DataFrame, DashboardError> {
    let totals = df
        .clone()
        .lazy()
        .filter(col(transactions::CARD_TIER).is_not_null())
        .group_by([col(transactions::CARD_TIER)])
        .agg([
            col(transactions::POINTS_EARNED).sum(),
            col(transactions::POINTS_REDEEMED).sum(),
        ]);

    let long_form = |metric: &'static str| {
        totals
            .clone()
            .with_column(lit(metric).alias(summary::TYPE))
            .select([
                col(transactions::CARD_TIER),
                col(summary::TYPE),
                col(metric).alias(summary::VALUE),
            ])
            .collect()
    };

    let stacked = long_form(transactions::POINTS_EARNED)?
        .vstack(&long_form(transactions::POINTS_REDEEMED)?)?;

    let out = stacked
        .lazy()
        .sort(
            [transactions::CARD_TIER, summary::TYPE],
            SortMultipleOptions::default(),
        )
        .collect()?;
    Ok(out)
}

/// `offer_applied`, `num_tx`, `avg_amount` per offer flag value.
pub fn offer_effect(df: &DataFrame) -> Result<DataFrame, DashboardError> {
    let out = df
        .clone()
        .lazy()
        .filter(col(transactions::OFFER_APPLIED).is_not_null())
        .group_by([col(transactions::OFFER_APPLIED)])
        .agg([
            col(transactions::TOTAL_AMOUNT_AED)
                .count()
                .cast(DataType::Int64)
                .alias(summary::NUM_TX),
            col(transactions::TOTAL_AMOUNT_AED)
                .mean()
                .alias(summary::AVG_AMOUNT),
        ])
        .sort([transactions::OFFER_APPLIED], SortMultipleOptions::default())
        .collect()?;
    Ok(out)
}

/// `month`, `category`, `ad_spend_uae_aed` as a time series.
///
/// Takes the unfiltered ad-budget table; transaction filters never apply.
pub fn ad_spend_trend(ad: &DataFrame) -> Result<DataFrame, DashboardError> {
    let out = ad
        .clone()
        .lazy()
        .select([
            col(ad_budget::MONTH),
            col(ad_budget::CATEGORY),
            col(ad_budget::AD_SPEND_UAE_AED),
        ])
        .sort(
            [ad_budget::MONTH, ad_budget::CATEGORY],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(out)
}

/// First rows of the raw ad-budget table, as loaded.
pub fn ad_spend_sample(ad: &DataFrame) -> DataFrame {
    ad.head(Some(AD_SPEND_SAMPLE_ROWS))
}

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DashboardError, FilterInputError};
use crate::schema::transactions;

/// Default age window shown when the dashboard first opens.
pub const DEFAULT_AGE_RANGE: (i64, i64) = (25, 45);

// ── Loyalty mode ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoyaltyMode {
    #[default]
    All,
    MembersOnly,
    NonMembersOnly,
}

impl LoyaltyMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::MembersOnly => "Members only",
            Self::NonMembersOnly => "Non-members only",
        }
    }
}

impl fmt::Display for LoyaltyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoyaltyMode {
    type Err = FilterInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "members" | "members only" | "members-only" => Ok(Self::MembersOnly),
            "non-members" | "non-members only" | "non-members-only" | "nonmembers" => {
                Ok(Self::NonMembersOnly)
            }
            _ => Err(FilterInputError::UnknownLoyaltyMode(s.to_string())),
        }
    }
}

// ── Date selection ──────────────────────────────────────────────────────────

/// Inclusive calendar-date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// What the date picker handed us. A picker mid-edit yields a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSelection {
    #[default]
    Full,
    Single(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl DateSelection {
    /// Parse `START..END`, a single `YYYY-MM-DD`, or an empty string.
    pub fn parse(text: &str) -> Result<Self, FilterInputError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::Full);
        }
        let parse_one = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| FilterInputError::MalformedDate(s.to_string()))
        };
        match text.split_once("..") {
            Some((start, end)) => Ok(Self::Range(parse_one(start)?, parse_one(end)?)),
            None => Ok(Self::Single(parse_one(text)?)),
        }
    }

    /// Like [`DateSelection::parse`] but degrades to `Full` on malformed input.
    pub fn parse_lenient(text: &str) -> Self {
        Self::parse(text).unwrap_or_else(|err| {
            warn!("{err}; using full date range");
            Self::Full
        })
    }

    /// Resolve against the dataset's own min/max. Anything but a well-ordered
    /// range falls back to `full`.
    pub fn resolve(&self, full: DateBounds) -> DateBounds {
        match *self {
            Self::Full => full,
            Self::Single(date) => {
                debug!(%date, "Single date selected; using full date range");
                full
            }
            Self::Range(start, end) if start <= end => DateBounds { start, end },
            Self::Range(start, end) => {
                let err = FilterInputError::InvertedDateRange {
                    start: start.to_string(),
                    end: end.to_string(),
                };
                warn!("{err}; using full date range");
                full
            }
        }
    }
}

impl fmt::Display for DateSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => Ok(()),
            Self::Single(d) => write!(f, "{d}"),
            Self::Range(s, e) => write!(f, "{s}..{e}"),
        }
    }
}

// ── Widget domains ──────────────────────────────────────────────────────────

/// Value domains for the filter controls, derived from the loaded transactions.
/// Category-like options keep first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    /// `None` only for an empty transactions table.
    pub date_bounds: Option<DateBounds>,
    pub age_bounds: Option<(i64, i64)>,
    pub genders: Vec<String>,
    pub locations: Vec<String>,
    pub categories: Vec<String>,
}

impl FilterOptions {
    pub fn from_transactions(df: &DataFrame) -> Result<Self, DashboardError> {
        let ages = df.column(transactions::AGE)?.as_materialized_series().i64()?;
        let age_bounds = ages.min().zip(ages.max());

        Ok(Self {
            date_bounds: date_bounds(df)?,
            age_bounds,
            genders: unique_strings(df, transactions::GENDER)?,
            locations: unique_strings(df, transactions::LOCATION)?,
            categories: unique_strings(df, transactions::CATEGORY)?,
        })
    }
}

fn unique_strings(df: &DataFrame, column: &str) -> Result<Vec<String>, DashboardError> {
    let unique = df.column(column)?.as_materialized_series().unique_stable()?;
    Ok(unique
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}

/// Min/max of the `date` column.
pub fn date_bounds(df: &DataFrame) -> Result<Option<DateBounds>, DashboardError> {
    let dates = df.column(transactions::DATE)?.as_materialized_series().date()?;
    let bounds = dates.as_date_iter().flatten().fold(None, |acc, date| match acc {
        None => Some(DateBounds { start: date, end: date }),
        Some(b) => Some(DateBounds {
            start: b.start.min(date),
            end: b.end.max(date),
        }),
    });
    Ok(bounds)
}

// ── Filter spec ─────────────────────────────────────────────────────────────

/// A conjunction of filters over the transactions table.
///
/// Empty `genders`, `locations` or `categories` select nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub date: DateSelection,
    /// Inclusive.
    pub age_range: (i64, i64),
    pub genders: Vec<String>,
    pub locations: Vec<String>,
    pub categories: Vec<String>,
    pub loyalty: LoyaltyMode,
}

impl FilterSpec {
    /// Everything selected: full ranges, every option, all loyalty states.
    pub fn full(options: &FilterOptions) -> Self {
        Self {
            date: DateSelection::Full,
            age_range: options.age_bounds.unwrap_or((i64::MIN, i64::MAX)),
            genders: options.genders.clone(),
            locations: options.locations.clone(),
            categories: options.categories.clone(),
            loyalty: LoyaltyMode::All,
        }
    }

    /// Initial sidebar state: like [`FilterSpec::full`] but with the age
    /// window narrowed to [`DEFAULT_AGE_RANGE`], clamped to the data.
    pub fn dashboard_default(options: &FilterOptions) -> Self {
        let mut spec = Self::full(options);
        if let Some((min, max)) = options.age_bounds {
            let lo = DEFAULT_AGE_RANGE.0.max(min);
            let hi = DEFAULT_AGE_RANGE.1.min(max);
            if lo <= hi {
                spec.age_range = (lo, hi);
            }
        }
        spec
    }

    fn selects_nothing(&self) -> bool {
        self.genders.is_empty() || self.locations.is_empty() || self.categories.is_empty()
    }
}

/// Filter `transactions` by `spec`. Row order and columns are preserved and
/// the input is left untouched.
pub fn apply(transactions: &DataFrame, spec: &FilterSpec) -> Result<DataFrame, DashboardError> {
    if spec.selects_nothing() {
        debug!("Empty option set selected; no rows pass");
        return Ok(transactions.clear());
    }
    let Some(full) = date_bounds(transactions)? else {
        return Ok(transactions.clear());
    };
    let dates = spec.date.resolve(full);

    let mut predicate = col(transactions::DATE)
        .gt_eq(lit(dates.start))
        .and(col(transactions::DATE).lt_eq(lit(dates.end)))
        .and(col(transactions::AGE).gt_eq(lit(spec.age_range.0)))
        .and(col(transactions::AGE).lt_eq(lit(spec.age_range.1)))
        .and(member_of(transactions::GENDER, &spec.genders))
        .and(member_of(transactions::LOCATION, &spec.locations))
        .and(member_of(transactions::CATEGORY, &spec.categories));

    match spec.loyalty {
        LoyaltyMode::All => {}
        LoyaltyMode::MembersOnly => {
            predicate = predicate.and(col(transactions::HAS_LOYALTY_CARD));
        }
        LoyaltyMode::NonMembersOnly => {
            predicate = predicate.and(col(transactions::HAS_LOYALTY_CARD).not());
        }
    }

    let df = transactions.clone().lazy().filter(predicate).collect()?;
    debug!(
        input = transactions.height(),
        output = df.height(),
        "Applied filters"
    );
    Ok(df)
}

fn member_of(column: &str, values: &[String]) -> Expr {
    let set = Series::new(column.into(), values);
    col(column).is_in(lit(set).implode(), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_data;

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

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_options_from_data() {
        let data = sample_data();
        let options = data.filter_options().unwrap();
        assert_eq!(
            options.date_bounds,
            Some(DateBounds { start: ymd(2024, 1, 1), end: ymd(2024, 1, 10) })
        );
        assert_eq!(options.age_bounds, Some((22, 101)));
        assert_eq!(options.genders, vec!["Female", "Male"]);
        assert_eq!(options.locations, vec!["Dubai", "Abu Dhabi", "Sharjah"]);
        assert_eq!(options.categories, vec!["Grocery", "Electronics", "Fashion"]);
    }

    #[test]
    fn test_full_spec_returns_input_unchanged() {
        let data = sample_data();
        let spec = FilterSpec::full(&data.filter_options().unwrap());
        let out = apply(data.transactions(), &spec).unwrap();
        assert!(out.equals_missing(data.transactions()));
    }

    #[test]
    fn test_empty_sets_select_nothing() {
        let data = sample_data();
        let full = FilterSpec::full(&data.filter_options().unwrap());

        let clears: [fn(&mut FilterSpec); 3] = [
            |s| s.genders.clear(),
            |s| s.locations.clear(),
            |s| s.categories.clear(),
        ];
        for clear in clears {
            let mut spec = full.clone();
            clear(&mut spec);
            let out = apply(data.transactions(), &spec).unwrap();
            assert_eq!(out.height(), 0);
            assert_eq!(out.schema(), data.transactions().schema());
        }
    }

    #[test]
    fn test_single_day_range() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.date = DateSelection::Range(ymd(2024, 1, 3), ymd(2024, 1, 3));
        let out = apply(data.transactions(), &spec).unwrap();
        assert_eq!(ids(&out), vec!["T03", "T04"]);
    }

    #[test]
    fn test_single_date_and_inverted_range_fall_back_to_full() {
        let data = sample_data();
        let full = FilterSpec::full(&data.filter_options().unwrap());

        let mut single = full.clone();
        single.date = DateSelection::Single(ymd(2024, 1, 3));
        assert_eq!(apply(data.transactions(), &single).unwrap().height(), 10);

        let mut inverted = full;
        inverted.date = DateSelection::Range(ymd(2024, 1, 9), ymd(2024, 1, 2));
        assert_eq!(apply(data.transactions(), &inverted).unwrap().height(), 10);
    }

    #[test]
    fn test_predicates_combine_with_and() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.genders = vec!["Female".into()];
        spec.locations = vec!["Dubai".into()];
        let out = apply(data.transactions(), &spec).unwrap();
        assert_eq!(ids(&out), vec!["T01", "T07"]);

        spec.loyalty = LoyaltyMode::NonMembersOnly;
        let out = apply(data.transactions(), &spec).unwrap();
        assert_eq!(ids(&out), vec!["T07"]);
    }

    #[test]
    fn test_set_membership_ignores_unknown_values() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.categories = vec!["Fashion".into(), "Toys".into()];
        let out = apply(data.transactions(), &spec).unwrap();
        assert_eq!(ids(&out), vec!["T04", "T07"]);

        spec.categories = vec!["Toys".into()];
        assert_eq!(apply(data.transactions(), &spec).unwrap().height(), 0);
    }

    #[test]
    fn test_age_range_is_inclusive() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.age_range = (24, 25);
        let out = apply(data.transactions(), &spec).unwrap();
        assert_eq!(ids(&out), vec!["T02", "T03"]);
    }

    #[test]
    fn test_loyalty_modes() {
        let data = sample_data();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.loyalty = LoyaltyMode::MembersOnly;
        assert_eq!(apply(data.transactions(), &spec).unwrap().height(), 6);
        spec.loyalty = LoyaltyMode::NonMembersOnly;
        assert_eq!(apply(data.transactions(), &spec).unwrap().height(), 4);
    }

    #[test]
    fn test_apply_leaves_input_untouched() {
        let data = sample_data();
        let before = data.transactions().clone();
        let mut spec = FilterSpec::full(&data.filter_options().unwrap());
        spec.loyalty = LoyaltyMode::MembersOnly;
        let _ = apply(data.transactions(), &spec).unwrap();
        assert!(data.transactions().equals_missing(&before));
    }

    #[test]
    fn test_dashboard_default_clamps_age() {
        let data = sample_data();
        let options = data.filter_options().unwrap();
        assert_eq!(FilterSpec::dashboard_default(&options).age_range, (25, 45));

        let narrow = FilterOptions { age_bounds: Some((30, 40)), ..options };
        assert_eq!(FilterSpec::dashboard_default(&narrow).age_range, (30, 40));
    }

    #[test]
    fn test_parse_date_selection() {
        assert_eq!(DateSelection::parse("").unwrap(), DateSelection::Full);
        assert_eq!(
            DateSelection::parse("2024-01-01..2024-01-31").unwrap(),
            DateSelection::Range(ymd(2024, 1, 1), ymd(2024, 1, 31))
        );
        assert_eq!(
            DateSelection::parse("2024-01-03").unwrap(),
            DateSelection::Single(ymd(2024, 1, 3))
        );
        assert!(matches!(
            DateSelection::parse("2024-13-01..2024-01-31"),
            Err(FilterInputError::MalformedDate(_))
        ));
        assert_eq!(DateSelection::parse_lenient("yesterday"), DateSelection::Full);
    }

    #[test]
    fn test_parse_loyalty_mode() {
        assert_eq!("All".parse::<LoyaltyMode>().unwrap(), LoyaltyMode::All);
        assert_eq!("Members only".parse::<LoyaltyMode>().unwrap(), LoyaltyMode::MembersOnly);
        assert_eq!("non-members".parse::<LoyaltyMode>().unwrap(), LoyaltyMode::NonMembersOnly);
        assert!("gold".parse::<LoyaltyMode>().is_err());
    }
}

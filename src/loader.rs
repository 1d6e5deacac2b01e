use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::DashboardError;
use crate::filter::FilterOptions;
use crate::schema::{ad_budget, customers, transactions};

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const AD_BUDGET_FILE: &str = "ad_budget.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const TRUE_WORDS: [&str; 5] = ["true", "t", "1", "yes", "y"];
const FALSE_WORDS: [&str; 5] = ["false", "f", "0", "no", "n"];

/// Locations of the three source tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub transactions: PathBuf,
    pub customers: PathBuf,
    pub ad_budget: PathBuf,
}

impl DataPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            transactions: dir.join(TRANSACTIONS_FILE),
            customers: dir.join(CUSTOMERS_FILE),
            ad_budget: dir.join(AD_BUDGET_FILE),
        }
    }
}

/// Immutable, once-loaded data context shared by every filter/render pass.
///
/// Columns are validated and typed at construction:
/// dates are `Date`, `age` is `Int64`, amounts and points are `Float64`,
/// `has_loyalty_card` is `Boolean`. `card_tier` and `offer_applied` are
/// nullable strings. Extra columns are kept as loaded.
#[derive(Debug, Clone)]
pub struct DashboardData {
    transactions: DataFrame,
    customers: DataFrame,
    ad_budget: DataFrame,
}

impl DashboardData {
    /// Load and validate all three tables. Side-effect free; calling it twice
    /// yields identical frames.
    pub fn load(paths: &DataPaths) -> Result<Self, DashboardError> {
        let tx = read_csv_as_strings(&paths.transactions, TRANSACTIONS)?;
        let cust = read_csv_as_strings(&paths.customers, CUSTOMERS)?;
        let ad = read_csv_as_strings(&paths.ad_budget, AD_BUDGET)?;
        let data = Self::from_raw_frames(tx, cust, ad)?;

        info!(
            transactions = data.transactions.height(),
            customers = data.customers.height(),
            ad_budget = data.ad_budget.height(),
            "Loaded dashboard data"
        );
        Ok(data)
    }

    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, DashboardError> {
        Self::load(&DataPaths::in_dir(dir))
    }

    /// Validate and type already-read frames. Values may be strings or native
    /// polars types; everything goes through the same text parsers.
    pub fn from_raw_frames(
        transactions: DataFrame,
        customers: DataFrame,
        ad_budget: DataFrame,
    ) -> Result<Self, DashboardError> {
        Ok(Self {
            transactions: type_table(transactions, TRANSACTIONS, &TRANSACTION_COLUMNS)?,
            customers: type_table(customers, CUSTOMERS, &CUSTOMER_COLUMNS)?,
            ad_budget: type_table(ad_budget, AD_BUDGET, &AD_BUDGET_COLUMNS)?,
        })
    }

    pub fn transactions(&self) -> &DataFrame {
        &self.transactions
    }

    pub fn customers(&self) -> &DataFrame {
        &self.customers
    }

    pub fn ad_budget(&self) -> &DataFrame {
        &self.ad_budget
    }

    /// Domains for the filter widgets.
    pub fn filter_options(&self) -> Result<FilterOptions, DashboardError> {
        FilterOptions::from_transactions(&self.transactions)
    }
}

// ── Table typing ────────────────────────────────────────────────────────────

const TRANSACTIONS: &str = "transactions";
const CUSTOMERS: &str = "customers";
const AD_BUDGET: &str = "ad_budget";

/// How a raw text column is typed at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    /// Blank cells become null instead of failing the load.
    OptionalText,
    Day,
    /// Year-month values, normalized to the first day of the month.
    Month,
    Age,
    NonNegative,
    Flag,
}

const TRANSACTION_COLUMNS: [(&str, ColumnKind); 12] = [
    (transactions::TRANSACTION_ID, ColumnKind::Text),
    (transactions::GENDER, ColumnKind::Text),
    (transactions::LOCATION, ColumnKind::Text),
    (transactions::CATEGORY, ColumnKind::Text),
    (transactions::CARD_TIER, ColumnKind::OptionalText),
    (transactions::OFFER_APPLIED, ColumnKind::OptionalText),
    (transactions::DATE, ColumnKind::Day),
    (transactions::AGE, ColumnKind::Age),
    (transactions::TOTAL_AMOUNT_AED, ColumnKind::NonNegative),
    (transactions::POINTS_EARNED, ColumnKind::NonNegative),
    (transactions::POINTS_REDEEMED, ColumnKind::NonNegative),
    (transactions::HAS_LOYALTY_CARD, ColumnKind::Flag),
];

const CUSTOMER_COLUMNS: [(&str, ColumnKind); 2] = [
    (customers::CUSTOMER_ID, ColumnKind::Text),
    (customers::JOIN_DATE, ColumnKind::Day),
];

const AD_BUDGET_COLUMNS: [(&str, ColumnKind); 3] = [
    (ad_budget::CATEGORY, ColumnKind::Text),
    (ad_budget::MONTH, ColumnKind::Month),
    (ad_budget::AD_SPEND_UAE_AED, ColumnKind::NonNegative),
];

impl ColumnKind {
    /// Typed value of `text`; null where the text does not parse.
    fn parse(self, text: Expr) -> Expr {
        match self {
            Self::Text | Self::OptionalText => text,
            Self::Day => parse_day(text),
            Self::Month => parse_month(text),
            Self::Age => parse_whole_number(text),
            Self::NonNegative => text.cast(DataType::Float64),
            Self::Flag => parse_flag(text),
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Self::Text | Self::OptionalText => "text",
            Self::Day => "a valid date",
            Self::Month => "a valid month",
            Self::Age => "a whole number",
            Self::NonNegative => "a number",
            Self::Flag => "a boolean",
        }
    }
}

fn type_table(
    df: DataFrame,
    table: &str,
    columns: &[(&str, ColumnKind)],
) -> Result<DataFrame, DashboardError> {
    let required: Vec<&str> = columns.iter().map(|&(name, _)| name).collect();
    require_columns(&df, table, &required)?;
    for &(column, kind) in columns {
        check_column(&df, table, column, kind)?;
    }

    let typed: Vec<Expr> = columns
        .iter()
        .map(|&(column, kind)| kind.parse(text(column)).alias(column))
        .collect();
    let df = df
        .lazy()
        .with_columns(typed)
        .collect()
        .map_err(load_error(table))?;

    debug!(table, rows = df.height(), "Typed table");
    Ok(df)
}

// ── Private helpers ─────────────────────────────────────────────────────────

fn load_error(table: &str) -> impl FnOnce(PolarsError) -> DashboardError + '_ {
    move |source| DashboardError::Load {
        table: table.to_string(),
        source,
    }
}

/// Read a CSV file with all columns as String dtype.
/// Trims whitespace from column names.
fn read_csv_as_strings(path: &Path, table: &str) -> Result<DataFrame, DashboardError> {
    std::fs::metadata(path).map_err(|source| DashboardError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(load_error(table))?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())
        .map_err(load_error(table))?;

    debug!(path = %path.display(), rows = df.height(), "Read CSV");
    Ok(df)
}

fn require_columns(df: &DataFrame, table: &str, required: &[&str]) -> Result<(), DashboardError> {
    for &name in required {
        if df.column(name).is_err() {
            return Err(DashboardError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            });
        }
    }
    Ok(())
}

const ROW_INDEX: &str = "__row";
const RAW: &str = "__raw";
const PARSED: &str = "__parsed";

/// Fail on the first row of `column` that is blank (unless optional), does
/// not parse as `kind`, or parses to a negative number where one is not
/// allowed.
fn check_column(
    df: &DataFrame,
    table: &str,
    column: &str,
    kind: ColumnKind,
) -> Result<(), DashboardError> {
    let raw = text(column);
    let parsed = kind.parse(text(column));

    let mut rejected = raw.clone().is_not_null().and(parsed.clone().is_null());
    if kind != ColumnKind::OptionalText {
        rejected = rejected.or(raw.clone().is_null());
    }
    if kind == ColumnKind::NonNegative {
        rejected = rejected.or(parsed.clone().lt(lit(0.0)));
    }

    let first = df
        .clone()
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .filter(rejected)
        .select([col(ROW_INDEX), raw.alias(RAW), parsed.alias(PARSED)])
        .limit(1)
        .collect()
        .map_err(load_error(table))?;
    if first.height() == 0 {
        return Ok(());
    }

    let row = first
        .column(ROW_INDEX)
        .and_then(|c| c.get(0))
        .map_err(load_error(table))?
        .extract::<u64>()
        .unwrap_or_default() as usize;
    let parsed_value = first
        .column(PARSED)
        .and_then(|c| c.get(0))
        .map_err(load_error(table))?;
    let raw_values = first
        .column(RAW)
        .and_then(|c| c.str())
        .map_err(load_error(table))?;

    let message = match raw_values.get(0) {
        None => "missing value".to_string(),
        Some(value) if !parsed_value.is_null() => format!("{value} is negative"),
        Some(value) => format!("'{value}' is not {}", kind.expected()),
    };
    Err(DashboardError::InvalidValue {
        table: table.to_string(),
        column: column.to_string(),
        row,
        message,
    })
}

/// Column as trimmed text; blank cells become null.
fn text(column: &str) -> Expr {
    let trimmed = col(column)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(" \t\r\n"));
    when(trimmed.clone().eq(lit("")))
        .then(lit(NULL).cast(DataType::String))
        .otherwise(trimmed)
}

fn strptime(format: &str) -> StrptimeOptions {
    StrptimeOptions {
        format: Some(format.into()),
        strict: false,
        ..Default::default()
    }
}

/// `YYYY-MM-DD`, optionally followed by a time of day that is discarded.
fn parse_day(text: Expr) -> Expr {
    let mut candidates = vec![text.clone().str().to_date(strptime(DATE_FORMAT))];
    candidates.extend(DATETIME_FORMATS.iter().map(|format| {
        text.clone()
            .str()
            .to_datetime(
                Some(TimeUnit::Microseconds),
                None,
                strptime(format),
                lit("raise"),
            )
            .cast(DataType::Date)
    }));
    coalesce(&candidates)
}

/// `YYYY-MM` or any full date, truncated to the first of its month.
fn parse_month(text: Expr) -> Expr {
    let year_month = concat_str([text.clone(), lit("-01")], "", false)
        .str()
        .to_date(strptime(DATE_FORMAT));
    let first_of_month = concat_str(
        [text.clone().str().slice(lit(0), lit(7)), lit("-01")],
        "",
        false,
    )
    .str()
    .to_date(strptime(DATE_FORMAT));

    when(coalesce(&[year_month, parse_day(text)]).is_not_null())
        .then(first_of_month)
        .otherwise(lit(NULL).cast(DataType::Date))
}

/// Integers, or floats with no fractional part (`"25.0"`).
fn parse_whole_number(text: Expr) -> Expr {
    let number = text.clone().cast(DataType::Float64);
    let truncated = number.clone().cast(DataType::Int64);
    coalesce(&[
        text.cast(DataType::Int64),
        when(truncated.clone().cast(DataType::Float64).eq(number))
            .then(truncated)
            .otherwise(lit(NULL).cast(DataType::Int64)),
    ])
}

fn parse_flag(text: Expr) -> Expr {
    let word = text.str().to_lowercase();
    when(word.clone().is_in(word_list(&TRUE_WORDS), false))
        .then(lit(true))
        .when(word.is_in(word_list(&FALSE_WORDS), false))
        .then(lit(false))
        .otherwise(lit(NULL).cast(DataType::Boolean))
}

fn word_list(words: &[&str]) -> Expr {
    lit(Series::new("words".into(), words)).implode()
}

#[cfg(feature = "python")]
use pyo3::exceptions::PyRuntimeError;
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

/// Fatal errors. The data-load class (see [`DashboardError::is_data_load`])
/// halts the dashboard before anything is rendered.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Invalid value in {table}.{column} at row {row}: {message}")]
    InvalidValue {
        table: String,
        column: String,
        row: usize,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load {table}: {source}")]
    Load {
        table: String,
        #[source]
        source: polars::error::PolarsError,
    },

    /// Polars failures outside loading, while filtering or aggregating.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl DashboardError {
    /// True for the data-load class of failures (missing or malformed source data).
    pub fn is_data_load(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. } | Self::InvalidValue { .. } | Self::Io { .. } | Self::Load { .. }
        )
    }
}

/// Recoverable filter input problems. Callers log these and fall back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterInputError {
    #[error("Malformed date '{0}', expected YYYY-MM-DD")]
    MalformedDate(String),

    #[error("Date range start {start} is after end {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("Unknown loyalty mode '{0}'")]
    UnknownLoyaltyMode(String),
}

#[cfg(feature = "python")]
impl From<DashboardError> for PyErr {
    fn from(err: DashboardError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::PolarsError;

    #[test]
    fn test_only_load_time_polars_errors_are_data_load() {
        let load = DashboardError::Load {
            table: "transactions".into(),
            source: PolarsError::NoData("empty".into()),
        };
        assert!(load.is_data_load());

        let render: DashboardError = PolarsError::ComputeError("group_by".into()).into();
        assert!(!render.is_data_load());
        assert!(!DashboardError::Render("fmt".into()).is_data_load());
    }
}

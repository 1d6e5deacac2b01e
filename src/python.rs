use chrono::NaiveDate;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use pyo3_polars::PyDataFrame;
use tracing::warn;

use crate::filter::{DateSelection, FilterSpec, LoyaltyMode};
use crate::loader::DashboardData;
use crate::view::{self, ViewModel};
use crate::visualization::{self, HtmlConfig};

/// Loaded dashboard session for a Python front-end.
///
/// The data is read once in the constructor; every `render` call is a
/// fresh filter/aggregate pass over it.
#[pyclass]
pub struct Dashboard {
    data: DashboardData,
}

#[pymethods]
impl Dashboard {
    #[new]
    fn new(data_dir: String) -> PyResult<Self> {
        Ok(Self {
            data: DashboardData::load_dir(data_dir)?,
        })
    }

    /// Widget domains: date and age bounds plus the selectable values.
    fn filter_options<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let options = self.data.filter_options()?;
        let dict = PyDict::new(py);
        dict.set_item("date_min", options.date_bounds.map(|b| b.start))?;
        dict.set_item("date_max", options.date_bounds.map(|b| b.end))?;
        dict.set_item("age_min", options.age_bounds.map(|b| b.0))?;
        dict.set_item("age_max", options.age_bounds.map(|b| b.1))?;
        dict.set_item("genders", options.genders)?;
        dict.set_item("locations", options.locations)?;
        dict.set_item("categories", options.categories)?;
        Ok(dict)
    }

    /// Run one pass. Returns `key_metrics` (a dict) and one DataFrame per view.
    ///
    /// Args:
    ///     date_range: list of one or two dates, as a date picker returns them
    ///     age_range: inclusive (min, max)
    ///     genders / locations / categories: selected values; None selects all
    ///     loyalty: "All", "Members only" or "Non-members only"
    #[pyo3(signature = (
        date_range = None,
        age_range = None,
        genders = None,
        locations = None,
        categories = None,
        loyalty = "All",
    ))]
    fn render<'py>(
        &self,
        py: Python<'py>,
        date_range: Option<Vec<NaiveDate>>,
        age_range: Option<(i64, i64)>,
        genders: Option<Vec<String>>,
        locations: Option<Vec<String>>,
        categories: Option<Vec<String>>,
        loyalty: &str,
    ) -> PyResult<Bound<'py, PyDict>> {
        let spec = self.build_spec(date_range, age_range, genders, locations, categories, loyalty)?;
        let view = view::render(&self.data, &spec)?;

        let metrics = PyDict::new(py);
        metrics.set_item("total_sales", view.key_metrics.total_sales)?;
        metrics.set_item("transactions", view.key_metrics.transactions)?;
        metrics.set_item("average_basket", view.key_metrics.average_basket)?;
        metrics.set_item("loyalty_share_pct", view.key_metrics.loyalty_share_pct)?;

        let dict = PyDict::new(py);
        dict.set_item("key_metrics", metrics)?;
        dict.set_item("selected_rows", view.selected_rows)?;
        for (name, df) in view.tables() {
            dict.set_item(name, PyDataFrame(df.clone()))?;
        }
        Ok(dict)
    }

    /// Same arguments as `render`; returns the dashboard as an HTML string.
    /// Use with `IPython.display.HTML(...)` in Jupyter.
    #[pyo3(signature = (
        date_range = None,
        age_range = None,
        genders = None,
        locations = None,
        categories = None,
        loyalty = "All",
        title = None,
    ))]
    fn to_html(
        &self,
        date_range: Option<Vec<NaiveDate>>,
        age_range: Option<(i64, i64)>,
        genders: Option<Vec<String>>,
        locations: Option<Vec<String>>,
        categories: Option<Vec<String>>,
        loyalty: &str,
        title: Option<String>,
    ) -> PyResult<String> {
        let spec = self.build_spec(date_range, age_range, genders, locations, categories, loyalty)?;
        let view: ViewModel = view::render(&self.data, &spec)?;
        let mut config = HtmlConfig::default();
        if let Some(title) = title {
            config.title = title;
        }
        Ok(visualization::render_html(&view, &config)?)
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn transactions_df(&self) -> PyDataFrame {
        PyDataFrame(self.data.transactions().clone())
    }

    #[getter]
    fn customers_df(&self) -> PyDataFrame {
        PyDataFrame(self.data.customers().clone())
    }

    #[getter]
    fn ad_budget_df(&self) -> PyDataFrame {
        PyDataFrame(self.data.ad_budget().clone())
    }
}

impl Dashboard {
    fn build_spec(
        &self,
        date_range: Option<Vec<NaiveDate>>,
        age_range: Option<(i64, i64)>,
        genders: Option<Vec<String>>,
        locations: Option<Vec<String>>,
        categories: Option<Vec<String>>,
        loyalty: &str,
    ) -> PyResult<FilterSpec> {
        let mut spec = FilterSpec::full(&self.data.filter_options()?);

        spec.date = match date_range.as_deref() {
            None | Some([]) => DateSelection::Full,
            Some([single]) => DateSelection::Single(*single),
            Some([start, end]) => DateSelection::Range(*start, *end),
            Some(other) => {
                warn!(len = other.len(), "Date range needs one or two dates; using full range");
                DateSelection::Full
            }
        };
        if let Some(range) = age_range {
            spec.age_range = range;
        }
        if let Some(genders) = genders {
            spec.genders = genders;
        }
        if let Some(locations) = locations {
            spec.locations = locations;
        }
        if let Some(categories) = categories {
            spec.categories = categories;
        }
        spec.loyalty = loyalty.parse().unwrap_or_else(|err| {
            warn!("{err}; showing all customers");
            LoyaltyMode::All
        });
        Ok(spec)
    }
}

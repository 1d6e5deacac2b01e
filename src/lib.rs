pub mod aggregation;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod schema;
pub mod view;
pub mod visualization;

#[cfg(feature = "python")]
mod python;
#[cfg(test)]
mod test_support;

pub use aggregation::KeyMetrics;
pub use error::{DashboardError, FilterInputError};
pub use filter::{DateBounds, DateSelection, FilterOptions, FilterSpec, LoyaltyMode};
pub use loader::{DashboardData, DataPaths};
pub use view::{render, ViewModel};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export column-name constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Transactions
    let tx = PyModule::new(m.py(), "transactions")?;
    for name in schema::transactions::REQUIRED {
        tx.add(name.to_uppercase(), name)?;
    }
    m.add_submodule(&tx)?;

    // Customers
    let customers = PyModule::new(m.py(), "customers")?;
    customers.add("CUSTOMER_ID", schema::customers::CUSTOMER_ID)?;
    customers.add("JOIN_DATE", schema::customers::JOIN_DATE)?;
    m.add_submodule(&customers)?;

    // Ad budget
    let ad = PyModule::new(m.py(), "ad_budget")?;
    ad.add("MONTH", schema::ad_budget::MONTH)?;
    ad.add("CATEGORY", schema::ad_budget::CATEGORY)?;
    ad.add("AD_SPEND_UAE_AED", schema::ad_budget::AD_SPEND_UAE_AED)?;
    m.add_submodule(&ad)?;

    // Loyalty modes
    let loyalty = PyModule::new(m.py(), "loyalty_mode")?;
    for mode in [
        LoyaltyMode::All,
        LoyaltyMode::MembersOnly,
        LoyaltyMode::NonMembersOnly,
    ] {
        loyalty.add(format!("{mode:?}").to_uppercase(), mode.label())?;
    }
    m.add_submodule(&loyalty)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn sales_dashboard(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::Dashboard>()?;
    add_schema_exports(m)?;
    Ok(())
}

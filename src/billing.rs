//! Billing core: unit conversion, tariff matching, cost aggregation and the
//! text report.
//!
//! Everything here is synchronous and side-effect free. Observability lives
//! at the fetch boundary in [`crate::fetch`].

pub mod aggregate;
pub mod convert;
pub mod report;
pub mod tariff;

pub use aggregate::aggregate;
pub use convert::{CALORIFIC_VALUE, VOLUME_CORRECTION, gas_m3_to_kwh};
pub use report::format_summary;
pub use tariff::{TariffSchedule, match_rate};

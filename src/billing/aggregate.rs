use super::convert::reading_kwh;
use super::tariff::TariffSchedule;
use crate::error::{OctowattError, Result};
use crate::types::{BillingPeriod, ConsumptionReading, EnergySummary, FuelType, TariffRate};

/// Combine readings, unit rates and the daily standing charge into period totals.
///
/// `standing_charge` is in pounds per day, rates are in pence per kWh.
/// Readings outside `period` are ignored. A reading with no rate in force
/// still counts toward consumption but adds nothing to cost.
pub fn aggregate(
    fuel_type: FuelType,
    readings: &[ConsumptionReading],
    rates: &[TariffRate],
    standing_charge: Option<f64>,
    period: &BillingPeriod,
) -> Result<EnergySummary> {
    if readings.is_empty() {
        return Err(OctowattError::missing_data(format!(
            "no {} consumption readings",
            fuel_type
        )));
    }
    if rates.is_empty() {
        return Err(OctowattError::missing_data(format!(
            "no {} tariff rates",
            fuel_type
        )));
    }
    let Some(standing_charge) = standing_charge else {
        return Err(OctowattError::missing_data(format!(
            "no {} standing charge",
            fuel_type
        )));
    };

    let schedule = TariffSchedule::new(rates.to_vec());
    let mut total_consumption = 0.0;
    let mut total_unit_cost = 0.0;

    for reading in readings.iter().filter(|r| period.contains(r.interval_start)) {
        let kwh = reading_kwh(reading);
        total_consumption += kwh;
        if let Some(rate) = schedule.rate_at(reading.interval_start) {
            total_unit_cost += kwh * rate.value_inc_vat_pence / 100.0;
        }
    }

    let total_standing_charge = standing_charge * period.days() as f64;

    Ok(EnergySummary {
        fuel_type,
        total_consumption,
        total_unit_cost,
        total_standing_charge,
        total_cost: total_unit_cost + total_standing_charge,
    })
}

use crate::types::{ConsumptionReading, EnergyUnit};

/// Calorific value of UK mains gas, MJ/m³
pub const CALORIFIC_VALUE: f64 = 39.5;

/// Volume correction factor for temperature and pressure
pub const VOLUME_CORRECTION: f64 = 1.02264;

/// Megajoules per kilowatt-hour
const MJ_PER_KWH: f64 = 3.6;

/// Convert a metered gas volume to energy
pub fn gas_m3_to_kwh(volume_m3: f64) -> f64 {
    volume_m3 * CALORIFIC_VALUE * VOLUME_CORRECTION / MJ_PER_KWH
}

/// Energy of a reading in kWh, converting volumetric readings
pub fn reading_kwh(reading: &ConsumptionReading) -> f64 {
    match reading.unit {
        EnergyUnit::CubicMetres => gas_m3_to_kwh(reading.value),
        EnergyUnit::KilowattHours => reading.value,
    }
}

//! Domain types shared by the billing core, the provider client and the service

use crate::error::{OctowattError, Result};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supply fuel of a meter point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Electricity,
    Gas,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Gas => "gas",
        }
    }

    /// Single-letter code used in tariff codes (`E-1R-...`, `G-1R-...`)
    pub fn code_letter(&self) -> char {
        match self {
            Self::Electricity => 'E',
            Self::Gas => 'G',
        }
    }

    /// Capitalized label for titles
    pub fn label(&self) -> &'static str {
        match self {
            Self::Electricity => "Electricity",
            Self::Gas => "Gas",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fuel selector of an energy request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelSelection {
    Electricity,
    Gas,
    Both,
}

impl FuelSelection {
    pub fn includes(&self, fuel: FuelType) -> bool {
        match self {
            Self::Both => true,
            Self::Electricity => fuel == FuelType::Electricity,
            Self::Gas => fuel == FuelType::Gas,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "electricity" => Ok(Self::Electricity),
            "gas" => Ok(Self::Gas),
            "both" => Ok(Self::Both),
            other => Err(OctowattError::validation(
                "fuel".to_string(),
                format!("Unknown fuel selection '{}', expected electricity, gas or both", other),
            )),
        }
    }
}

/// Look-back window of an energy request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeWindow {
    LastWeek,
    LastMonth,
    LastQuarter,
}

impl TimeWindow {
    pub fn days(&self) -> u32 {
        match self {
            Self::LastWeek => 7,
            Self::LastMonth => 30,
            Self::LastQuarter => 90,
        }
    }
}

impl TryFrom<u32> for TimeWindow {
    type Error = OctowattError;

    fn try_from(days: u32) -> Result<Self> {
        match days {
            7 => Ok(Self::LastWeek),
            30 => Ok(Self::LastMonth),
            90 => Ok(Self::LastQuarter),
            other => Err(OctowattError::validation(
                "days".to_string(),
                format!("Unsupported time window of {} days, expected 7, 30 or 90", other),
            )),
        }
    }
}

impl From<TimeWindow> for u32 {
    fn from(window: TimeWindow) -> Self {
        window.days()
    }
}

/// Unit a consumption value was reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyUnit {
    #[serde(rename = "kWh")]
    KilowattHours,
    #[serde(rename = "m3")]
    CubicMetres,
}

impl EnergyUnit {
    /// Map the provider's `consumptionUnits` label
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kwh" => Some(Self::KilowattHours),
            "m3" | "m³" | "m^3" => Some(Self::CubicMetres),
            _ => None,
        }
    }

    /// Unit assumed when the provider does not say
    pub fn default_for(fuel: FuelType) -> Self {
        match fuel {
            FuelType::Electricity => Self::KilowattHours,
            FuelType::Gas => Self::CubicMetres,
        }
    }
}

/// One day of aggregated consumption for a meter point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionReading {
    pub interval_start: DateTime<Utc>,
    pub value: f64,
    pub unit: EnergyUnit,
}

/// A unit price valid from a given instant until superseded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffRate {
    pub valid_from: DateTime<Utc>,
    pub value_inc_vat_pence: f64,
}

/// Half-open window `[from, to)` of whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if to <= from {
            return Err(OctowattError::validation(
                "period".to_string(),
                format!("Period end {} is not after start {}", to, from),
            ));
        }
        Ok(Self { from, to })
    }

    /// The `days` full days before the day containing `now`, in timezone `tz`.
    ///
    /// The end is local midnight of the current day, so the in-progress day is
    /// never part of the period.
    pub fn last_full_days<Tz: TimeZone>(days: u32, now: DateTime<Utc>, tz: &Tz) -> Result<Self> {
        let today = now.with_timezone(tz).date_naive();
        let midnight = local_midnight(tz, today)?;
        let start_day = today - Duration::days(i64::from(days));
        let start = local_midnight(tz, start_day)?;
        Self::new(start, midnight)
    }

    /// Whole days between start and end, rounded so a DST shift inside the
    /// period does not lose a day
    pub fn days(&self) -> i64 {
        let minutes = (self.to - self.from).num_minutes();
        (minutes + 720).div_euclid(1440)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, day: chrono::NaiveDate) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| OctowattError::generic(format!("No local midnight on {}", day)))
}

/// Totals of one meter point over a billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySummary {
    pub fuel_type: FuelType,
    /// kWh
    pub total_consumption: f64,
    /// Pounds
    pub total_unit_cost: f64,
    /// Pounds
    pub total_standing_charge: f64,
    /// Pounds
    pub total_cost: f64,
}

/// A supply point discovered on the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterPoint {
    pub fuel_type: FuelType,
    /// MPAN for electricity, MPRN for gas
    pub identifier: String,
    pub serial_number: String,
    pub product_code: String,
    pub tariff_code: String,
    pub unit: EnergyUnit,
}

/// Credentials linking a user to a provider account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub user_id: String,
    pub api_key: String,
    pub account_number: String,
}

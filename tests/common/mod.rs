//! In-process fake of the Octopus Energy API shared by integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use octowatt::error::{OctowattError, Result};
use octowatt::octopus::{AccountInfo, EnergyProvider};
use octowatt::types::{
    BillingPeriod, ConsumptionReading, EnergyUnit, FuelType, MeterPoint, TariffRate,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

pub const API_KEY: &str = "sk_live_test";
pub const ACCOUNT: &str = "A-TEST1234";

pub fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn meter_point(fuel: FuelType, id: &str) -> MeterPoint {
    MeterPoint {
        fuel_type: fuel,
        identifier: id.to_string(),
        serial_number: format!("SN-{}", id),
        product_code: "VAR-22-11-01".to_string(),
        tariff_code: format!("{}-1R-VAR-22-11-01-C-{}", fuel.code_letter(), id),
        unit: EnergyUnit::default_for(fuel),
    }
}

/// `days` daily readings of `value` starting at `from`
pub fn daily(from: DateTime<Utc>, days: i64, value: f64, unit: EnergyUnit) -> Vec<ConsumptionReading> {
    (0..days)
        .map(|i| ConsumptionReading {
            interval_start: from + Duration::days(i),
            value,
            unit,
        })
        .collect()
}

#[derive(Default)]
pub struct FakeProvider {
    pub meter_points: Vec<MeterPoint>,
    pub consumption: HashMap<String, Vec<ConsumptionReading>>,
    pub rates: HashMap<String, Vec<TariffRate>>,
    pub standing_charges: HashMap<String, f64>,
    /// Meter identifiers whose consumption fetch always fails with a 503
    pub failing: HashSet<String>,
    /// Remaining transient failures per meter identifier before success
    pub flaky: Mutex<HashMap<String, u32>>,
    pub token_calls: AtomicU32,
    pub consumption_calls: AtomicU32,
    pub rate_calls: AtomicU32,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meter point with constant daily consumption, one rate band and a standing charge
    pub fn with_meter(
        mut self,
        mp: MeterPoint,
        readings: Vec<ConsumptionReading>,
        rates: Vec<TariffRate>,
        standing_charge: f64,
    ) -> Self {
        self.consumption.insert(mp.identifier.clone(), readings);
        self.rates.insert(mp.tariff_code.clone(), rates);
        self.standing_charges
            .insert(mp.tariff_code.clone(), standing_charge);
        self.meter_points.push(mp);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn flaky(self, id: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(id.to_string(), failures);
        self
    }

    pub fn consumption_calls(&self) -> u32 {
        self.consumption_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnergyProvider for FakeProvider {
    async fn obtain_token(&self, api_key: &str) -> Result<String> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        if api_key == API_KEY {
            Ok("token-123".to_string())
        } else {
            Err(OctowattError::auth("Invalid API key"))
        }
    }

    async fn fetch_account(&self, token: &str, account_number: &str) -> Result<AccountInfo> {
        if token != "token-123" {
            return Err(OctowattError::auth("bad token"));
        }
        if account_number != ACCOUNT {
            return Err(OctowattError::api(format!("Account {} not found", account_number)));
        }
        Ok(AccountInfo {
            number: account_number.to_string(),
            meter_points: self.meter_points.clone(),
            skipped: Vec::new(),
        })
    }

    async fn fetch_consumption(
        &self,
        _token: &str,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Vec<ConsumptionReading>> {
        self.consumption_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&meter_point.identifier) {
            return Err(OctowattError::upstream(503, "Service Unavailable"));
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(left) = flaky.get_mut(&meter_point.identifier)
                && *left > 0
            {
                *left -= 1;
                return Err(OctowattError::network("connection reset"));
            }
        }
        Ok(self
            .consumption
            .get(&meter_point.identifier)
            .map(|all| {
                all.iter()
                    .filter(|r| period.contains(r.interval_start))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_unit_rates(
        &self,
        meter_point: &MeterPoint,
        _period: &BillingPeriod,
    ) -> Result<Vec<TariffRate>> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rates
            .get(&meter_point.tariff_code)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_standing_charge(
        &self,
        meter_point: &MeterPoint,
        _period: &BillingPeriod,
    ) -> Result<Option<f64>> {
        Ok(self.standing_charges.get(&meter_point.tariff_code).copied())
    }
}

//! Fetch orchestration
//!
//! For every meter point of the requested fuel(s) the consumption series,
//! unit rates and standing charge are fetched concurrently, each through the
//! retry policy and the response cache, and then aggregated. A meter point
//! that cannot be completed is excluded without affecting its siblings.

use crate::billing::{aggregate, format_summary};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{OctowattError, Result};
use crate::logging::StructuredLogger;
use crate::octopus::{AccountInfo, EnergyProvider};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::types::{
    BillingPeriod, ConsumptionReading, EnergySummary, FuelSelection, FuelType, MeterPoint,
    TariffRate,
};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Cache key of one fetched series
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub fuel_type: FuelType,
    /// Meter-point identifier for consumption, tariff code for rates and standing charges
    pub identifier: String,
    /// Meter serial; only consumption is per meter
    pub serial_number: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SeriesKey {
    /// Import and export MPANs can share one serial, so both parts are kept
    pub fn consumption(meter_point: &MeterPoint, period: &BillingPeriod) -> Self {
        Self {
            fuel_type: meter_point.fuel_type,
            identifier: meter_point.identifier.clone(),
            serial_number: Some(meter_point.serial_number.clone()),
            from: period.from,
            to: period.to,
        }
    }

    pub fn tariff(meter_point: &MeterPoint, period: &BillingPeriod) -> Self {
        Self {
            fuel_type: meter_point.fuel_type,
            identifier: meter_point.tariff_code.clone(),
            serial_number: None,
            from: period.from,
            to: period.to,
        }
    }
}

/// Result of one successfully processed meter point
#[derive(Debug, Clone, Serialize)]
pub struct MeterPointReport {
    pub meter_point: MeterPoint,
    pub summary: EnergySummary,
    /// In-period readings, for charting
    pub readings: Vec<ConsumptionReading>,
    pub report_text: String,
}

/// A meter point left out of the result and why
#[derive(Debug, Clone, Serialize)]
pub struct ExcludedMeterPoint {
    pub fuel_type: FuelType,
    pub identifier: String,
    pub reason: String,
}

/// Merged outcome of one energy request
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub reports: BTreeMap<FuelType, Vec<MeterPointReport>>,
    pub excluded: Vec<ExcludedMeterPoint>,
}

/// Runs the per-meter-point fetches and aggregation
pub struct FetchOrchestrator {
    provider: Arc<dyn EnergyProvider>,
    retry: RetryPolicy,
    consumption_cache: TtlCache<SeriesKey, Arc<Vec<ConsumptionReading>>>,
    rate_cache: TtlCache<SeriesKey, Arc<Vec<TariffRate>>>,
    standing_charge_cache: TtlCache<SeriesKey, Option<f64>>,
    currency_symbol: String,
}

impl FetchOrchestrator {
    pub fn new(provider: Arc<dyn EnergyProvider>, config: &Config) -> Self {
        Self {
            provider,
            retry: RetryPolicy::from(&config.retry),
            consumption_cache: TtlCache::from_config(&config.cache),
            rate_cache: TtlCache::from_config(&config.cache),
            standing_charge_cache: TtlCache::from_config(&config.cache),
            currency_symbol: config.billing.currency_symbol.clone(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider(&self) -> &Arc<dyn EnergyProvider> {
        &self.provider
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch and aggregate every meter point matching `selection`.
    ///
    /// Fails with [`OctowattError::NoData`] when no meter point produced a summary.
    pub async fn fetch_energy(
        &self,
        token: &str,
        account: &AccountInfo,
        selection: FuelSelection,
        period: &BillingPeriod,
        logger: &StructuredLogger,
    ) -> Result<FetchOutcome> {
        let selected: Vec<&MeterPoint> = account
            .meter_points
            .iter()
            .filter(|mp| selection.includes(mp.fuel_type))
            .collect();

        logger.info(&format!(
            "Fetching {} meter point(s) for {} day(s) from {}",
            selected.len(),
            period.days(),
            period.from.date_naive()
        ));

        let results = join_all(
            selected
                .iter()
                .map(|mp| self.process_meter_point(token, mp, period, logger)),
        )
        .await;

        let mut outcome = FetchOutcome::default();
        for (mp, result) in selected.into_iter().zip(results) {
            match result {
                Ok(report) => outcome
                    .reports
                    .entry(mp.fuel_type)
                    .or_default()
                    .push(report),
                Err(err) => {
                    logger.warn(&format!(
                        "Excluding {} meter point {}: {}",
                        mp.fuel_type, mp.identifier, err
                    ));
                    outcome.excluded.push(ExcludedMeterPoint {
                        fuel_type: mp.fuel_type,
                        identifier: mp.identifier.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if outcome.reports.is_empty() {
            return Err(OctowattError::NoData);
        }
        Ok(outcome)
    }

    /// Fetch the three series of one meter point concurrently and aggregate them
    pub async fn process_meter_point(
        &self,
        token: &str,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
        logger: &StructuredLogger,
    ) -> Result<MeterPointReport> {
        let (readings, rates, standing_charge) = tokio::join!(
            self.consumption(token, meter_point, period, logger),
            self.unit_rates(meter_point, period, logger),
            self.standing_charge(meter_point, period, logger),
        );
        let (readings, rates, standing_charge) = (readings?, rates?, standing_charge?);

        logger.debug(&format!(
            "{} {}: {} reading(s), {} rate(s), standing charge {:?}",
            meter_point.fuel_type,
            meter_point.identifier,
            readings.len(),
            rates.len(),
            standing_charge
        ));

        let summary = aggregate(
            meter_point.fuel_type,
            &readings,
            &rates,
            standing_charge,
            period,
        )?;
        logger.info(&format!(
            "Aggregated {} meter point {}: {:.2} kWh, total {:.2}",
            meter_point.fuel_type,
            meter_point.identifier,
            summary.total_consumption,
            summary.total_cost
        ));

        Ok(MeterPointReport {
            meter_point: meter_point.clone(),
            report_text: format_summary(&summary, &self.currency_symbol),
            summary,
            readings: readings
                .iter()
                .filter(|r| period.contains(r.interval_start))
                .cloned()
                .collect(),
        })
    }

    async fn consumption(
        &self,
        token: &str,
        mp: &MeterPoint,
        period: &BillingPeriod,
        logger: &StructuredLogger,
    ) -> Result<Arc<Vec<ConsumptionReading>>> {
        let key = SeriesKey::consumption(mp, period);
        if let Some(hit) = self.consumption_cache.get(&key) {
            logger.debug(&format!("Cache hit: consumption {}", mp.identifier));
            return Ok(hit);
        }
        let name = format!("{} consumption {}", mp.fuel_type, mp.identifier);
        let readings = retry_with_backoff(&self.retry, &name, logger, || {
            self.provider.fetch_consumption(token, mp, period)
        })
        .await?;
        let readings = Arc::new(readings);
        self.consumption_cache.insert(key, readings.clone());
        Ok(readings)
    }

    async fn unit_rates(
        &self,
        mp: &MeterPoint,
        period: &BillingPeriod,
        logger: &StructuredLogger,
    ) -> Result<Arc<Vec<TariffRate>>> {
        let key = SeriesKey::tariff(mp, period);
        if let Some(hit) = self.rate_cache.get(&key) {
            logger.debug(&format!("Cache hit: unit rates {}", mp.tariff_code));
            return Ok(hit);
        }
        let name = format!("{} unit rates {}", mp.fuel_type, mp.tariff_code);
        let rates = retry_with_backoff(&self.retry, &name, logger, || {
            self.provider.fetch_unit_rates(mp, period)
        })
        .await?;
        let rates = Arc::new(rates);
        self.rate_cache.insert(key, rates.clone());
        Ok(rates)
    }

    async fn standing_charge(
        &self,
        mp: &MeterPoint,
        period: &BillingPeriod,
        logger: &StructuredLogger,
    ) -> Result<Option<f64>> {
        let key = SeriesKey::tariff(mp, period);
        if let Some(hit) = self.standing_charge_cache.get(&key) {
            logger.debug(&format!("Cache hit: standing charge {}", mp.tariff_code));
            return Ok(hit);
        }
        let name = format!("{} standing charge {}", mp.fuel_type, mp.tariff_code);
        let charge = retry_with_backoff(&self.retry, &name, logger, || {
            self.provider.fetch_standing_charge(mp, period)
        })
        .await?;
        self.standing_charge_cache.insert(key, charge);
        Ok(charge)
    }
}

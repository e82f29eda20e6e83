//! Octopus Energy API integration
//!
//! The Kraken GraphQL API issues tokens and describes the account; the REST
//! API serves consumption, unit rates and standing charges. The fetch layer
//! talks to both through the [`EnergyProvider`] trait so it can be driven by
//! a fake in tests.

pub mod client;
pub mod queries;
pub mod types;

pub use client::OctopusClient;
pub use types::AccountInfo;

use crate::error::Result;
use crate::types::{BillingPeriod, ConsumptionReading, MeterPoint, TariffRate};

/// Remote source of account, consumption and tariff data
#[async_trait::async_trait]
pub trait EnergyProvider: Send + Sync {
    /// Exchange an API key for a bearer token
    async fn obtain_token(&self, api_key: &str) -> Result<String>;

    /// Meter points of an account
    async fn fetch_account(&self, token: &str, account_number: &str) -> Result<AccountInfo>;

    /// Daily consumption of one meter over the period
    async fn fetch_consumption(
        &self,
        token: &str,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Vec<ConsumptionReading>>;

    /// Unit rates (pence/kWh inc. VAT) in force during the period
    async fn fetch_unit_rates(
        &self,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Vec<TariffRate>>;

    /// Daily standing charge in pounds, if the tariff publishes one
    async fn fetch_standing_charge(
        &self,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Option<f64>>;
}

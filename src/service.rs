//! Request boundary
//!
//! [`EnergyService`] serves the two inbound requests: registering a user's
//! credentials and producing an energy report. Errors leaving this module are
//! logged here with the request id; callers only map them to a response via
//! [`OctowattError::user_message`].

use crate::chart::{ChartSeries, render_consumption_svg};
use crate::config::Config;
use crate::error::{OctowattError, Result};
use crate::fetch::{ExcludedMeterPoint, FetchOrchestrator, MeterPointReport};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::octopus::EnergyProvider;
use crate::retry::retry_with_backoff;
use crate::store::UserStore;
use crate::types::{BillingPeriod, FuelSelection, FuelType, TimeWindow, UserCredentials};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const API_KEY_PREFIX: &str = "sk_live_";
const ACCOUNT_NUMBER_PREFIX: &str = "A-";

/// Reply to a successful setup
pub const SETUP_SUCCESS_MESSAGE: &str = "Your Octopus Energy account has been set up successfully!";

/// All meter points of one fuel plus a chart of their readings
#[derive(Debug, Clone, Serialize)]
pub struct FuelReport {
    pub meter_points: Vec<MeterPointReport>,
    pub chart_svg: String,
}

/// Result of one energy request
#[derive(Debug, Clone, Serialize)]
pub struct EnergyReport {
    pub request_id: String,
    pub window: TimeWindow,
    pub period: BillingPeriod,
    pub fuels: BTreeMap<FuelType, FuelReport>,
    pub excluded: Vec<ExcludedMeterPoint>,
}

impl EnergyReport {
    /// Report texts of every meter point, fuel by fuel
    pub fn text(&self) -> String {
        self.fuels
            .values()
            .flat_map(|f| f.meter_points.iter().map(|mp| mp.report_text.as_str()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct EnergyService {
    store: Arc<dyn UserStore>,
    orchestrator: FetchOrchestrator,
    timezone: chrono_tz::Tz,
    logger: StructuredLogger,
}

impl EnergyService {
    pub fn new(
        store: Arc<dyn UserStore>,
        provider: Arc<dyn EnergyProvider>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            store,
            orchestrator: FetchOrchestrator::new(provider, config),
            timezone: config.timezone()?,
            logger: get_logger("service"),
        })
    }

    /// Replace the orchestrator, e.g. to shorten retry delays
    pub fn with_orchestrator(mut self, orchestrator: FetchOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Validate and store a user's credentials
    pub async fn setup(
        &self,
        user_id: &str,
        api_key: &str,
        account_number: &str,
    ) -> Result<String> {
        let creds = validate_setup(user_id, api_key, account_number)?;
        let logger = get_logger_with_context(
            LogContext::new("service").with_user_id(creds.user_id.clone()),
        );
        if let Err(e) = self.store.put(creds).await {
            logger.error(&format!("Failed to store credentials: {}", e));
            return Err(e);
        }
        logger.info("Stored account credentials");
        Ok(SETUP_SUCCESS_MESSAGE.to_string())
    }

    pub async fn get_energy_data(
        &self,
        user_id: &str,
        selection: FuelSelection,
        window: TimeWindow,
    ) -> Result<EnergyReport> {
        self.get_energy_data_at(user_id, selection, window, Utc::now())
            .await
    }

    /// Energy report for the `window` full days before `now`
    pub async fn get_energy_data_at(
        &self,
        user_id: &str,
        selection: FuelSelection,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<EnergyReport> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let logger = self.logger.for_request(&request_id, user_id);
        logger.info(&format!(
            "Energy data requested: fuel={}, days={}",
            format!("{:?}", selection).to_lowercase(),
            window.days()
        ));

        match self
            .build_report(&request_id, user_id, selection, window, now, &logger)
            .await
        {
            Ok(report) => {
                logger.info(&format!(
                    "Energy report ready: {} fuel(s), {} meter point(s) excluded",
                    report.fuels.len(),
                    report.excluded.len()
                ));
                Ok(report)
            }
            Err(e) => {
                match &e {
                    OctowattError::NotRegistered { .. } | OctowattError::NoData => {
                        logger.warn(&format!("Energy request failed: {}", e));
                    }
                    _ => logger.error(&format!("Energy request failed: {}", e)),
                }
                Err(e)
            }
        }
    }

    async fn build_report(
        &self,
        request_id: &str,
        user_id: &str,
        selection: FuelSelection,
        window: TimeWindow,
        now: DateTime<Utc>,
        logger: &StructuredLogger,
    ) -> Result<EnergyReport> {
        let creds = self
            .store
            .get(user_id)
            .await?
            .ok_or_else(|| OctowattError::not_registered(user_id))?;

        let period = BillingPeriod::last_full_days(window.days(), now, &self.timezone)?;

        let provider = self.orchestrator.provider();
        let policy = self.orchestrator.retry_policy();
        let token = retry_with_backoff(policy, "obtain token", logger, || {
            provider.obtain_token(&creds.api_key)
        })
        .await?;
        let account = retry_with_backoff(policy, "fetch account", logger, || {
            provider.fetch_account(&token, &creds.account_number)
        })
        .await?;
        for skipped in &account.skipped {
            logger.debug(&format!("Skipped meter point: {}", skipped));
        }

        let outcome = self
            .orchestrator
            .fetch_energy(&token, &account, selection, &period, logger)
            .await?;

        let fuels = outcome
            .reports
            .into_iter()
            .map(|(fuel, meter_points)| {
                let series: Vec<ChartSeries<'_>> = meter_points
                    .iter()
                    .map(|mp| ChartSeries {
                        label: &mp.meter_point.identifier,
                        readings: &mp.readings,
                    })
                    .collect();
                let chart_svg = render_consumption_svg(fuel, &series);
                (
                    fuel,
                    FuelReport {
                        meter_points,
                        chart_svg,
                    },
                )
            })
            .collect();

        Ok(EnergyReport {
            request_id: request_id.to_string(),
            window,
            period,
            fuels,
            excluded: outcome.excluded,
        })
    }
}

/// Prefix checks on setup input; nothing is sent to the provider
pub fn validate_setup(
    user_id: &str,
    api_key: &str,
    account_number: &str,
) -> Result<UserCredentials> {
    let user_id = user_id.trim();
    let api_key = api_key.trim();
    let account_number = account_number.trim();

    if user_id.is_empty() {
        return Err(OctowattError::validation("user_id", "A user id is required."));
    }
    if api_key.len() <= API_KEY_PREFIX.len() || !api_key.starts_with(API_KEY_PREFIX) {
        return Err(OctowattError::validation(
            "api_key",
            "Invalid API key. Octopus Energy API keys start with 'sk_live_'.",
        ));
    }
    if account_number.len() <= ACCOUNT_NUMBER_PREFIX.len()
        || !account_number.starts_with(ACCOUNT_NUMBER_PREFIX)
    {
        return Err(OctowattError::validation(
            "account_number",
            "Invalid account number. Octopus Energy account numbers start with 'A-'.",
        ));
    }

    Ok(UserCredentials {
        user_id: user_id.to_string(),
        api_key: api_key.to_string(),
        account_number: account_number.to_string(),
    })
}

use crate::config::ProviderConfig;
use crate::error::{OctowattError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::octopus::EnergyProvider;
use crate::octopus::queries::{ACCOUNT_QUERY, OBTAIN_TOKEN_MUTATION};
use crate::octopus::types::{
    AccountData, AccountInfo, ConsumptionRecord, GraphQlResponse, Page, RateRecord, TokenData,
    select_standing_charge,
};
use crate::types::{BillingPeriod, ConsumptionReading, MeterPoint, TariffRate};
use chrono::SecondsFormat;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const USER_AGENT_VALUE: &str = concat!("octowatt/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Octopus Energy GraphQL and REST APIs
pub struct OctopusClient {
    http: reqwest::Client,
    graphql_url: String,
    rest_url: String,
    page_size: u32,
    max_pages: u32,
    logger: StructuredLogger,
}

impl OctopusClient {
    /// Create new client from provider settings
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        let mut rest_url = cfg.rest_url.trim().to_string();
        if !rest_url.ends_with('/') {
            rest_url.push('/');
        }
        Ok(Self {
            http,
            graphql_url: cfg.graphql_url.trim().to_string(),
            rest_url,
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
            logger: get_logger("octopus"),
        })
    }

    fn tariff_url(&self, mp: &MeterPoint, series: &str) -> String {
        format!(
            "{}products/{}/{}-tariffs/{}/{}/",
            self.rest_url, mp.product_code, mp.fuel_type, mp.tariff_code, series
        )
    }

    fn period_params(&self, period: &BillingPeriod) -> Vec<(&'static str, String)> {
        vec![
            (
                "period_from",
                period.from.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("period_to", period.to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("page_size", self.page_size.to_string()),
        ]
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        token: Option<&str>,
    ) -> Result<GraphQlResponse<T>> {
        let mut req = self
            .http
            .post(&self.graphql_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, USER_AGENT_VALUE)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("JWT {}", token));
        }
        let resp = check_status(req.send().await?).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET a paginated list, following `next` links up to `max_pages`
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        token: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut next: Option<String> = None;

        for page_no in 0..self.max_pages {
            let mut req = match &next {
                Some(link) => self.http.get(link),
                None => self.http.get(url).query(params),
            };
            req = req
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, USER_AGENT_VALUE);
            if let Some(token) = token {
                req = req.header(AUTHORIZATION, format!("JWT {}", token));
            }

            let resp = check_status(req.send().await?).await?;
            let bytes = resp.bytes().await?;
            let page: Page<T> = serde_json::from_slice(&bytes)?;
            results.extend(page.results);

            match page.next.filter(|n| !n.is_empty()) {
                Some(link) => next = Some(link),
                None => return Ok(results),
            }
            if page_no + 1 == self.max_pages {
                self.logger.warn(&format!(
                    "Stopped after {} pages of {}; results truncated",
                    self.max_pages, url
                ));
            }
        }
        Ok(results)
    }
}

/// Map non-success statuses onto the error taxonomy
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(OctowattError::auth(format!(
            "HTTP {}: {}",
            status.as_u16(),
            snippet
        ))),
        _ => Err(OctowattError::upstream(status.as_u16(), snippet)),
    }
}

#[async_trait::async_trait]
impl EnergyProvider for OctopusClient {
    async fn obtain_token(&self, api_key: &str) -> Result<String> {
        let resp: GraphQlResponse<TokenData> = self
            .graphql(
                OBTAIN_TOKEN_MUTATION,
                json!({ "input": { "APIKey": api_key } }),
                None,
            )
            .await?;

        if let Some(err) = resp.errors.first() {
            // Any error on this mutation means the key was not accepted
            return Err(OctowattError::auth(err.message.clone()));
        }
        let token = resp
            .data
            .and_then(|d| d.obtain_kraken_token)
            .map(|t| t.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OctowattError::auth("No token issued for API key"))?;
        self.logger.debug("Obtained Kraken token");
        Ok(token)
    }

    async fn fetch_account(&self, token: &str, account_number: &str) -> Result<AccountInfo> {
        let resp: GraphQlResponse<AccountData> = self
            .graphql(
                ACCOUNT_QUERY,
                json!({ "accountNumber": account_number }),
                Some(token),
            )
            .await?;

        if let Some(err) = resp.errors.first() {
            if err.is_auth() {
                return Err(OctowattError::auth(err.message.clone()));
            }
            return Err(OctowattError::api(err.message.clone()));
        }
        let account = resp
            .data
            .and_then(|d| d.account)
            .ok_or_else(|| OctowattError::api(format!("Account {} not found", account_number)))?;
        let info = account.into_account_info();
        self.logger.info(&format!(
            "Account {} has {} usable meter point(s), {} skipped",
            info.number,
            info.meter_points.len(),
            info.skipped.len()
        ));
        Ok(info)
    }

    async fn fetch_consumption(
        &self,
        token: &str,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Vec<ConsumptionReading>> {
        let url = format!(
            "{}{}-meter-points/{}/meters/{}/consumption/",
            self.rest_url, meter_point.fuel_type, meter_point.identifier, meter_point.serial_number
        );
        let mut params = self.period_params(period);
        params.push(("group_by", "day".to_string()));
        params.push(("order_by", "period".to_string()));

        let records: Vec<ConsumptionRecord> =
            self.get_all_pages(&url, &params, Some(token)).await?;
        let mut readings = records
            .into_iter()
            .map(|r| r.into_reading(meter_point.unit))
            .collect::<Result<Vec<_>>>()?;
        readings.sort_by_key(|r| r.interval_start);
        Ok(readings)
    }

    async fn fetch_unit_rates(
        &self,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Vec<TariffRate>> {
        let url = self.tariff_url(meter_point, "standard-unit-rates");
        let records: Vec<RateRecord> = self
            .get_all_pages(&url, &self.period_params(period), None)
            .await?;
        Ok(records
            .into_iter()
            .map(RateRecord::into_tariff_rate)
            .collect())
    }

    async fn fetch_standing_charge(
        &self,
        meter_point: &MeterPoint,
        period: &BillingPeriod,
    ) -> Result<Option<f64>> {
        let url = self.tariff_url(meter_point, "standing-charges");
        let records: Vec<RateRecord> = self
            .get_all_pages(&url, &self.period_params(period), None)
            .await?;
        Ok(select_standing_charge(records))
    }
}

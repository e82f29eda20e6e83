//! Typed records for provider responses.
//!
//! Every response is decoded into these structs up front; a missing or
//! mistyped field fails the fetch with a serialization error instead of
//! surfacing later as a bad lookup.

use crate::billing::TariffSchedule;
use crate::error::{OctowattError, Result};
use crate::types::{ConsumptionReading, EnergyUnit, FuelType, MeterPoint, TariffRate};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

impl GraphQlError {
    /// Kraken tags authentication problems with an `errorType` extension
    pub fn is_auth(&self) -> bool {
        let tagged = self
            .extensions
            .as_ref()
            .and_then(|e| e.get("errorType"))
            .and_then(|t| t.as_str())
            .is_some_and(|t| t.eq_ignore_ascii_case("AUTHORIZATION"));
        tagged || self.message.to_lowercase().contains("authenticat")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub obtain_kraken_token: Option<TokenPayload>,
}

#[derive(Debug, Deserialize)]
pub struct TokenPayload {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountData {
    pub account: Option<AccountNode>,
}

#[derive(Debug, Deserialize)]
pub struct AccountNode {
    pub number: String,
    #[serde(default)]
    pub properties: Vec<PropertyNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNode {
    #[serde(default)]
    pub electricity_meter_points: Vec<MeterPointNode>,
    #[serde(default)]
    pub gas_meter_points: Vec<MeterPointNode>,
}

#[derive(Debug, Deserialize)]
pub struct MeterPointNode {
    /// MPAN or MPRN
    #[serde(alias = "mpan", alias = "mprn")]
    pub identifier: String,
    #[serde(default)]
    pub meters: Vec<MeterNode>,
    #[serde(default)]
    pub agreements: Vec<AgreementNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterNode {
    pub serial_number: String,
    pub consumption_units: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementNode {
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub tariff: Option<TariffNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TariffNode {
    pub display_name: Option<String>,
    pub product_code: Option<String>,
    pub tariff_code: Option<String>,
}

/// Paginated REST list
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumptionRecord {
    pub consumption: f64,
    pub interval_start: DateTime<Utc>,
    #[serde(default)]
    pub interval_end: Option<DateTime<Utc>>,
}

impl ConsumptionRecord {
    pub fn into_reading(self, unit: EnergyUnit) -> Result<ConsumptionReading> {
        if !self.consumption.is_finite() || self.consumption < 0.0 {
            return Err(OctowattError::serialization(format!(
                "Invalid consumption value {} at {}",
                self.consumption, self.interval_start
            )));
        }
        Ok(ConsumptionReading {
            interval_start: self.interval_start,
            value: self.consumption,
            unit,
        })
    }
}

/// Unit rate or standing charge record
#[derive(Debug, Clone, Deserialize)]
pub struct RateRecord {
    #[serde(default)]
    pub value_exc_vat: Option<f64>,
    pub value_inc_vat: f64,
    /// Absent on rates that apply since the product launched
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

const DIRECT_DEBIT: &str = "DIRECT_DEBIT";

impl RateRecord {
    pub fn into_tariff_rate(self) -> TariffRate {
        TariffRate {
            valid_from: self.valid_from.unwrap_or(DateTime::<Utc>::MIN_UTC),
            value_inc_vat_pence: self.value_inc_vat,
        }
    }

    fn is_direct_debit(&self) -> bool {
        self.payment_method
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(DIRECT_DEBIT))
    }
}

/// Standing charge in pounds per day from the records of one window.
///
/// Direct-debit records are used when any exist. Among those the latest
/// `valid_from` wins, with ties going to the lower price as for unit rates.
pub fn select_standing_charge(records: Vec<RateRecord>) -> Option<f64> {
    let direct_debit = records.iter().any(RateRecord::is_direct_debit);
    let schedule = TariffSchedule::new(
        records
            .into_iter()
            .filter(|r| !direct_debit || r.is_direct_debit())
            .map(RateRecord::into_tariff_rate)
            .collect(),
    );
    schedule
        .rate_at(DateTime::<Utc>::MAX_UTC)
        .map(|r| r.value_inc_vat_pence / 100.0)
}

/// Meter points found on an account, plus the ones that could not be used
#[derive(Debug, Clone, Default)]
pub struct AccountInfo {
    pub number: String,
    pub meter_points: Vec<MeterPoint>,
    pub skipped: Vec<String>,
}

impl AccountNode {
    pub fn into_account_info(self) -> AccountInfo {
        let mut info = AccountInfo {
            number: self.number,
            ..AccountInfo::default()
        };
        for property in self.properties {
            let nodes = property
                .electricity_meter_points
                .into_iter()
                .map(|n| (FuelType::Electricity, n))
                .chain(property.gas_meter_points.into_iter().map(|n| (FuelType::Gas, n)));
            for (fuel, node) in nodes {
                match node.into_meter_point(fuel) {
                    Ok(mp) => info.meter_points.push(mp),
                    Err(e) => info.skipped.push(e.to_string()),
                }
            }
        }
        info
    }
}

impl MeterPointNode {
    /// Resolve the meter serial and current tariff of a supply point
    pub fn into_meter_point(self, fuel_type: FuelType) -> Result<MeterPoint> {
        let Some(meter) = self.meters.into_iter().next() else {
            return Err(OctowattError::missing_data(format!(
                "{} meter point {} has no meters",
                fuel_type, self.identifier
            )));
        };

        // Latest agreement carrying a product code is the one in force
        let tariff = self
            .agreements
            .into_iter()
            .filter(|a| {
                a.tariff
                    .as_ref()
                    .and_then(|t| t.product_code.as_ref())
                    .is_some()
            })
            .max_by_key(|a| a.valid_from)
            .and_then(|a| a.tariff);
        let Some(TariffNode {
            product_code: Some(product_code),
            tariff_code,
            ..
        }) = tariff
        else {
            return Err(OctowattError::missing_data(format!(
                "{} meter point {} has no tariff agreement",
                fuel_type, self.identifier
            )));
        };

        let letter = fuel_type.code_letter();
        let tariff_code = tariff_code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| format!("{letter}-1R-{product_code}-{letter}"));

        let unit = meter
            .consumption_units
            .as_deref()
            .and_then(EnergyUnit::from_label)
            .unwrap_or_else(|| EnergyUnit::default_for(fuel_type));
        // Electricity is always metered in kWh
        let unit = match fuel_type {
            FuelType::Electricity => EnergyUnit::KilowattHours,
            FuelType::Gas => unit,
        };

        Ok(MeterPoint {
            fuel_type,
            identifier: self.identifier,
            serial_number: meter.serial_number,
            product_code,
            tariff_code,
            unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(valid_from: &str, pence: f64, method: Option<&str>) -> RateRecord {
        RateRecord {
            value_exc_vat: None,
            value_inc_vat: pence,
            valid_from: Some(valid_from.parse().unwrap()),
            valid_to: None,
            payment_method: method.map(str::to_string),
        }
    }

    #[test]
    fn standing_charge_prefers_direct_debit() {
        let dd = standing("2024-04-01T00:00:00Z", 45.0, Some("DIRECT_DEBIT"));
        let non_dd = standing("2024-04-01T00:00:00Z", 48.0, Some("NON_DIRECT_DEBIT"));

        let a = select_standing_charge(vec![dd.clone(), non_dd.clone()]);
        let b = select_standing_charge(vec![non_dd, dd]);
        assert_eq!(a, Some(0.45));
        assert_eq!(a, b);
    }

    #[test]
    fn standing_charge_takes_latest_band() {
        let records = vec![
            standing("2024-04-01T00:00:00Z", 50.0, None),
            standing("2024-01-01T00:00:00Z", 40.0, None),
        ];
        assert_eq!(select_standing_charge(records), Some(0.5));
        assert_eq!(select_standing_charge(Vec::new()), None);
    }

    #[test]
    fn standing_charge_tie_without_payment_method_takes_lower_price() {
        let high = standing("2024-04-01T00:00:00Z", 52.0, None);
        let low = standing("2024-04-01T00:00:00Z", 47.0, None);
        assert_eq!(select_standing_charge(vec![high.clone(), low.clone()]), Some(0.47));
        assert_eq!(select_standing_charge(vec![low, high]), Some(0.47));
    }

    const ACCOUNT_JSON: &str = r#"{
      "data": {
        "account": {
          "number": "A-1234ABCD",
          "properties": [{
            "electricityMeterPoints": [{
              "mpan": "1200000000001",
              "meters": [{"serialNumber": "E1", "consumptionUnits": "kWh"}],
              "agreements": [
                {"validFrom": "2022-01-01T00:00:00+00:00", "validTo": "2023-01-01T00:00:00+00:00",
                 "tariff": {"displayName": "Old", "productCode": "OLD-22", "tariffCode": "E-1R-OLD-22-C"}},
                {"validFrom": "2023-01-01T00:00:00+00:00", "validTo": null,
                 "tariff": {"displayName": "Agile", "productCode": "AGILE-23", "tariffCode": "E-1R-AGILE-23-C"}}
              ]
            }],
            "gasMeterPoints": [
              {"mprn": "3000001", "meters": [{"serialNumber": "G1", "consumptionUnits": "m3"}],
               "agreements": [{"validFrom": "2023-01-01T00:00:00+00:00", "validTo": null,
                 "tariff": {"displayName": "Tracker", "productCode": "TRACKER-23", "tariffCode": null}}]},
              {"mprn": "3000002", "meters": [], "agreements": []}
            ]
          }]
        }
      }
    }"#;

    #[test]
    fn account_resolves_meter_points() {
        let resp: GraphQlResponse<AccountData> = serde_json::from_str(ACCOUNT_JSON).unwrap();
        let info = resp.data.unwrap().account.unwrap().into_account_info();
        assert_eq!(info.number, "A-1234ABCD");
        assert_eq!(info.meter_points.len(), 2);
        assert_eq!(info.skipped.len(), 1);

        let elec = &info.meter_points[0];
        assert_eq!(elec.fuel_type, FuelType::Electricity);
        assert_eq!(elec.identifier, "1200000000001");
        assert_eq!(elec.product_code, "AGILE-23");
        assert_eq!(elec.tariff_code, "E-1R-AGILE-23-C");

        let gas = &info.meter_points[1];
        assert_eq!(gas.fuel_type, FuelType::Gas);
        assert_eq!(gas.unit, EnergyUnit::CubicMetres);
        assert_eq!(gas.tariff_code, "G-1R-TRACKER-23-G");
    }

    #[test]
    fn missing_required_field_fails_fast() {
        let bad = r#"{"count": 1, "next": null, "results": [{"interval_start": "2024-01-01T00:00:00Z"}]}"#;
        let err = serde_json::from_str::<Page<ConsumptionRecord>>(bad).unwrap_err();
        assert!(err.to_string().contains("consumption"));
    }

    #[test]
    fn rate_without_valid_from_applies_from_the_start() {
        let rec: RateRecord =
            serde_json::from_str(r#"{"value_exc_vat": 20.0, "value_inc_vat": 21.0, "valid_from": null, "valid_to": null}"#)
                .unwrap();
        let rate = rec.into_tariff_rate();
        assert_eq!(rate.valid_from, DateTime::<Utc>::MIN_UTC);
        assert_eq!(rate.value_inc_vat_pence, 21.0);
    }

    #[test]
    fn negative_consumption_is_rejected() {
        let rec = ConsumptionRecord {
            consumption: -1.0,
            interval_start: DateTime::<Utc>::MIN_UTC,
            interval_end: None,
        };
        assert!(rec.into_reading(EnergyUnit::KilowattHours).is_err());
    }

    #[test]
    fn graphql_auth_errors_are_detected() {
        let resp: GraphQlResponse<TokenData> = serde_json::from_str(
            r#"{"data": {"obtainKrakenToken": null},
                "errors": [{"message": "Invalid data.", "extensions": {"errorType": "AUTHORIZATION", "errorCode": "KT-CT-1139"}}]}"#,
        )
        .unwrap();
        assert!(resp.errors[0].is_auth());
    }
}

mod common;

use chrono::{TimeZone, Utc};
use common::{ACCOUNT, API_KEY, FakeProvider, daily, meter_point, utc};
use octowatt::config::Config;
use octowatt::error::OctowattError;
use octowatt::service::{EnergyService, SETUP_SUCCESS_MESSAGE};
use octowatt::store::{InMemoryUserStore, JsonFileUserStore, UserStore};
use octowatt::types::{EnergyUnit, FuelSelection, FuelType, TariffRate, TimeWindow};
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn fast_config() -> Config {
    let mut cfg = Config::default();
    cfg.retry.initial_delay_ms = 1;
    cfg.retry.max_delay_ms = 5;
    cfg
}

fn provider() -> FakeProvider {
    FakeProvider::new().with_meter(
        meter_point(FuelType::Electricity, "1900000000001"),
        daily(utc(2024, 2, 1), 60, 10.0, EnergyUnit::KilowattHours),
        vec![
            TariffRate {
                valid_from: utc(2024, 1, 1),
                value_inc_vat_pence: 30.0,
            },
            TariffRate {
                valid_from: utc(2024, 3, 5),
                value_inc_vat_pence: 20.0,
            },
        ],
        0.45,
    )
}

#[tokio::test]
async fn report_after_setup() {
    let provider = Arc::new(provider());
    let store = Arc::new(InMemoryUserStore::new());
    let service = EnergyService::new(store, provider, &fast_config()).unwrap();

    let msg = service.setup("user-1", API_KEY, ACCOUNT).await.unwrap();
    assert_eq!(msg, SETUP_SUCCESS_MESSAGE);

    // Midday on 8 March (GMT): the last full week is 1..8 March
    let now = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
    let report = service
        .get_energy_data_at("user-1", FuelSelection::Both, TimeWindow::LastWeek, now)
        .await
        .unwrap();

    assert_eq!(report.period.from, utc(2024, 3, 1));
    assert_eq!(report.period.to, utc(2024, 3, 8));
    let elec = &report.fuels[&FuelType::Electricity];
    let summary = &elec.meter_points[0].summary;
    // 4 days at 30p and 3 days at 20p
    assert!((summary.total_consumption - 70.0).abs() < 1e-9);
    assert!((summary.total_unit_cost - (12.0 + 6.0)).abs() < 1e-9);
    assert!((summary.total_cost - (18.0 + 3.15)).abs() < 1e-9);
    assert!(elec.chart_svg.contains("Electricity Consumption"));
    assert_eq!(elec.chart_svg.matches("<circle").count(), 7);
    assert!(report.text().contains("Total electricity cost: £21.15"));
    assert!(!report.request_id.is_empty());
}

#[tokio::test]
async fn unregistered_user_is_told_to_set_up() {
    let service = EnergyService::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(provider()),
        &fast_config(),
    )
    .unwrap();

    let err = service
        .get_energy_data("nobody", FuelSelection::Both, TimeWindow::LastWeek)
        .await
        .unwrap_err();
    assert!(matches!(err, OctowattError::NotRegistered { .. }));
    assert!(err.user_message().contains("haven't set up"));
}

#[tokio::test]
async fn rejected_api_key_is_not_retried() {
    let provider = Arc::new(provider());
    let service = EnergyService::new(
        Arc::new(InMemoryUserStore::new()),
        provider.clone(),
        &fast_config(),
    )
    .unwrap();
    service
        .setup("user-1", "sk_live_revoked", ACCOUNT)
        .await
        .unwrap();

    let err = service
        .get_energy_data("user-1", FuelSelection::Both, TimeWindow::LastWeek)
        .await
        .unwrap_err();
    assert!(matches!(err, OctowattError::Auth { .. }));
    assert_eq!(provider.token_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_setup_stores_nothing() {
    let store = Arc::new(InMemoryUserStore::new());
    let service =
        EnergyService::new(store.clone(), Arc::new(provider()), &fast_config()).unwrap();

    let err = service
        .setup("user-1", "not-a-key", ACCOUNT)
        .await
        .unwrap_err();
    assert!(matches!(err, OctowattError::Validation { .. }));
    assert!(store.get("user-1").await.unwrap().is_none());
}

#[tokio::test]
async fn json_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");

    {
        let store = Arc::new(JsonFileUserStore::open(&path).await.unwrap());
        let service =
            EnergyService::new(store, Arc::new(provider()), &fast_config()).unwrap();
        service.setup("user-1", API_KEY, ACCOUNT).await.unwrap();
    }

    let reopened = JsonFileUserStore::open(&path).await.unwrap();
    let creds = reopened.get("user-1").await.unwrap().unwrap();
    assert_eq!(creds.api_key, API_KEY);
    assert_eq!(creds.account_number, ACCOUNT);

    let raw = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["user-1"]["account_number"], ACCOUNT);
}

#[tokio::test]
async fn json_store_rejects_corrupt_file() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "{ not json").unwrap();
    let err = JsonFileUserStore::open(tmp.path()).await.err().unwrap();
    assert!(matches!(err, OctowattError::Serialization { .. }));
}

#![no_main]
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use octowatt::billing::aggregate;
use octowatt::octopus::types::{ConsumptionRecord, Page};
use octowatt::types::{BillingPeriod, EnergyUnit, FuelType, TariffRate};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a consumption page, then through the billing core
    let Ok(page) = serde_json::from_slice::<Page<ConsumptionRecord>>(data) else {
        return;
    };
    let readings: Vec<_> = page
        .results
        .into_iter()
        .filter_map(|r| r.into_reading(EnergyUnit::CubicMetres).ok())
        .collect();

    let (Some(from), Some(to)) = (
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single(),
    ) else {
        return;
    };
    let Ok(period) = BillingPeriod::new(from, to) else {
        return;
    };
    let rates = vec![TariffRate {
        valid_from: from,
        value_inc_vat_pence: 7.5,
    }];

    if let Ok(summary) = aggregate(FuelType::Gas, &readings, &rates, Some(0.3), &period)
        && summary.total_cost.is_finite()
    {
        assert!(summary.total_consumption >= 0.0);
        assert!((summary.total_cost - summary.total_unit_cost - summary.total_standing_charge).abs() < 1e-6);
    }
});

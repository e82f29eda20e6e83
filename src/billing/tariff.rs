use crate::types::TariffRate;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Tariff rates in a total order: ascending `valid_from`, ties by ascending price.
///
/// The provider returns rates newest first and makes no promise about
/// duplicates, so the order is rebuilt here and never taken from the input.
#[derive(Debug, Clone, Default)]
pub struct TariffSchedule {
    rates: Vec<TariffRate>,
}

impl TariffSchedule {
    pub fn new(mut rates: Vec<TariffRate>) -> Self {
        rates.sort_by(compare_rates);
        Self { rates }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn rates(&self) -> &[TariffRate] {
        &self.rates
    }

    /// The rate in force at `at`: greatest `valid_from <= at`, first of its tie group
    pub fn rate_at(&self, at: DateTime<Utc>) -> Option<&TariffRate> {
        let upto = self.rates.partition_point(|r| r.valid_from <= at);
        if upto == 0 {
            return None;
        }
        let latest = self.rates[upto - 1].valid_from;
        let first_of_group = self.rates[..upto].partition_point(|r| r.valid_from < latest);
        self.rates.get(first_of_group)
    }
}

fn compare_rates(a: &TariffRate, b: &TariffRate) -> Ordering {
    a.valid_from
        .cmp(&b.valid_from)
        .then_with(|| a.value_inc_vat_pence.total_cmp(&b.value_inc_vat_pence))
}

/// Select the applicable rate for `at` from an unordered slice of rates
pub fn match_rate(at: DateTime<Utc>, rates: &[TariffRate]) -> Option<TariffRate> {
    TariffSchedule::new(rates.to_vec()).rate_at(at).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    fn rate(d: u32, pence: f64) -> TariffRate {
        TariffRate {
            valid_from: day(d),
            value_inc_vat_pence: pence,
        }
    }

    #[test]
    fn exact_valid_from_wins_over_earlier() {
        let rates = vec![rate(1, 20.0), rate(10, 25.0)];
        let matched = match_rate(day(10), &rates).unwrap();
        assert_eq!(matched.value_inc_vat_pence, 25.0);
    }

    #[test]
    fn picks_latest_not_first_in_input() {
        // Newest-first, as the provider returns them
        let rates = vec![rate(20, 30.0), rate(10, 25.0), rate(1, 20.0)];
        assert_eq!(match_rate(day(15), &rates).unwrap().value_inc_vat_pence, 25.0);
        assert_eq!(match_rate(day(25), &rates).unwrap().value_inc_vat_pence, 30.0);
        assert_eq!(match_rate(day(2), &rates).unwrap().value_inc_vat_pence, 20.0);
    }

    #[test]
    fn date_before_all_rates_is_absent() {
        let rates = vec![rate(10, 25.0)];
        assert!(match_rate(day(9), &rates).is_none());
        assert!(match_rate(day(9), &[]).is_none());
    }

    #[test]
    fn ties_resolve_independently_of_input_order() {
        let forward = vec![rate(1, 20.0), rate(5, 31.0), rate(5, 29.0)];
        let reverse: Vec<_> = forward.iter().rev().cloned().collect();
        let rotated = vec![forward[2].clone(), forward[0].clone(), forward[1].clone()];

        for _ in 0..3 {
            let a = match_rate(day(6), &forward).unwrap();
            let b = match_rate(day(6), &reverse).unwrap();
            let c = match_rate(day(6), &rotated).unwrap();
            assert_eq!(a, b);
            assert_eq!(b, c);
            assert_eq!(a.value_inc_vat_pence, 29.0);
        }
    }

    #[test]
    fn bst_day_is_matched_on_its_utc_start() {
        // 1 June local midnight in BST is 31 May 23:00Z
        let bst_day = Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap();
        let midnight_utc = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let rates = vec![
            rate(1, 20.0),
            TariffRate {
                valid_from: midnight_utc,
                value_inc_vat_pence: 25.0,
            },
        ];
        assert_eq!(match_rate(bst_day, &rates).unwrap().value_inc_vat_pence, 20.0);

        // A band published at local midnight applies to the same reading
        let rates = vec![
            rate(1, 20.0),
            TariffRate {
                valid_from: bst_day,
                value_inc_vat_pence: 25.0,
            },
        ];
        assert_eq!(match_rate(bst_day, &rates).unwrap().value_inc_vat_pence, 25.0);
    }

    #[test]
    fn schedule_is_sorted() {
        let schedule = TariffSchedule::new(vec![rate(3, 1.0), rate(1, 2.0), rate(2, 3.0)]);
        let starts: Vec<_> = schedule.rates().iter().map(|r| r.valid_from).collect();
        assert_eq!(starts, vec![day(1), day(2), day(3)]);
        assert_eq!(schedule.len(), 3);
    }
}

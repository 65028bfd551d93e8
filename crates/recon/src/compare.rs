use std::collections::HashMap;

use smeta_core::{normalize_name, prices_equal, round2};

use crate::model::{AggregateBucket, ComparisonOutput, ComparisonRow, ComparisonStats, MatchStatus, RateRecord};

/// Compare aggregate buckets against one reference rate list.
///
/// The same routine serves all three rate sources (customer-approved,
/// supply, per-contractor); only the supplied list differs. Zero-price
/// buckets are excluded from comparison entirely — they are surfaced by
/// the pivot views instead.
pub fn compare(buckets: &[AggregateBucket], reference: &[RateRecord]) -> ComparisonOutput {
    // Last-write-wins map from normalized name to reference price.
    let mut rates: HashMap<String, f64> = HashMap::new();
    for record in reference {
        rates.insert(normalize_name(&record.name), record.price);
    }

    let mut rows = Vec::new();
    let mut stats = ComparisonStats::default();

    for bucket in buckets {
        if bucket.price <= 0.0 {
            continue;
        }

        let current_sum = round2(bucket.total_volume * bucket.price);

        let row = match rates.get(&normalize_name(&bucket.name)) {
            Some(&reference_price) => {
                let reference_sum = round2(bucket.total_volume * reference_price);
                let difference = round2(reference_sum - current_sum);
                let status = if prices_equal(bucket.price, reference_price) {
                    MatchStatus::Match
                } else {
                    MatchStatus::Different
                };

                stats.compared += 1;
                match status {
                    MatchStatus::Match => stats.matched += 1,
                    MatchStatus::Different => stats.different += 1,
                    MatchStatus::NotFound => {}
                }
                stats.total_current_sum = round2(stats.total_current_sum + current_sum);
                stats.total_reference_sum = round2(stats.total_reference_sum + reference_sum);
                stats.total_difference = round2(stats.total_difference + difference);

                ComparisonRow {
                    name: bucket.name.clone(),
                    unit: bucket.unit.clone(),
                    total_volume: bucket.total_volume,
                    file_price: bucket.price,
                    reference_price: Some(reference_price),
                    current_sum,
                    reference_sum,
                    difference,
                    status,
                }
            }
            None => {
                stats.not_found += 1;
                ComparisonRow {
                    name: bucket.name.clone(),
                    unit: bucket.unit.clone(),
                    total_volume: bucket.total_volume,
                    file_price: bucket.price,
                    reference_price: None,
                    current_sum,
                    reference_sum: 0.0,
                    difference: 0.0,
                    status: MatchStatus::NotFound,
                }
            }
        };

        rows.push(row);
    }

    ComparisonOutput { rows, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeta_core::{ItemType, RateScope};

    fn bucket(name: &str, price: f64, volume: f64) -> AggregateBucket {
        AggregateBucket {
            name: name.into(),
            unit: "м".into(),
            item_type: ItemType::Material,
            price,
            total_volume: volume,
            count: 1,
            is_zero_price: price == 0.0,
            has_different_prices: false,
            has_different_units: false,
        }
    }

    fn rate(name: &str, price: f64) -> RateRecord {
        RateRecord {
            id: 1,
            scope: RateScope::Object(1),
            name: name.into(),
            unit: "м".into(),
            price,
        }
    }

    #[test]
    fn within_epsilon_is_a_match() {
        let out = compare(&[bucket("Кабель", 50.004, 10.0)], &[rate("кабель", 50.0)]);
        assert_eq!(out.rows[0].status, MatchStatus::Match);
        assert_eq!(out.stats.matched, 1);
    }

    #[test]
    fn outside_epsilon_differs_with_rounded_difference() {
        let out = compare(&[bucket("Кабель", 50.02, 10.0)], &[rate("Кабель", 50.0)]);
        let row = &out.rows[0];
        assert_eq!(row.status, MatchStatus::Different);
        assert_eq!(row.current_sum, 500.2);
        assert_eq!(row.reference_sum, 500.0);
        assert_eq!(row.difference, round2(10.0 * (50.0 - 50.02)));
        assert_eq!(out.stats.total_difference, -0.2);
    }

    #[test]
    fn missing_reference_excluded_from_totals() {
        let out = compare(
            &[bucket("Кабель", 100.0, 2.0), bucket("Щебень", 900.0, 1.0)],
            &[rate("Кабель", 100.0)],
        );
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[1].status, MatchStatus::NotFound);
        assert_eq!(out.stats.not_found, 1);
        assert_eq!(out.stats.compared, 1);
        assert_eq!(out.stats.total_current_sum, 200.0);
        assert_eq!(out.stats.total_reference_sum, 200.0);
    }

    #[test]
    fn zero_price_buckets_never_compared() {
        let out = compare(&[bucket("Грунт", 0.0, 5.0)], &[rate("Грунт", 10.0)]);
        assert!(out.rows.is_empty());
        assert_eq!(out.stats.compared, 0);
        assert_eq!(out.stats.not_found, 0);
    }

    #[test]
    fn duplicate_reference_entries_last_write_wins() {
        let out = compare(
            &[bucket("Кабель", 120.0, 1.0)],
            &[rate("Кабель", 100.0), rate("кабель ", 120.0)],
        );
        assert_eq!(out.rows[0].reference_price, Some(120.0));
        assert_eq!(out.rows[0].status, MatchStatus::Match);
    }
}

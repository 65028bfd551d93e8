use std::collections::BTreeMap;

use smeta_core::{collate_names, normalize_name, round2, ItemType};

use crate::model::{
    AggregateBucket, BucketKey, PivotStats, PivotViews, PriceVariant, PriceVariantGroup, RawRow,
    UnitVariant, UnitVariantGroup,
};

/// Full pivot recompute over the current row set.
///
/// Pure and deterministic: the dataset calls this from scratch after
/// every mutation, there is no incremental path. Every derived number is
/// passed through `round2` after each combination step so repeated
/// additions cannot drift.
pub fn aggregate(rows: &[RawRow]) -> PivotViews {
    let mut buckets: BTreeMap<BucketKey, AggregateBucket> = BTreeMap::new();

    for row in rows {
        let price = round2(row.price());
        let key = BucketKey {
            name: normalize_name(&row.name),
            item_type: row.item_type,
            price: format!("{price:.2}"),
        };
        let entry = buckets.entry(key).or_insert_with(|| AggregateBucket {
            name: row.name.trim().to_string(),
            unit: row.unit.clone(),
            item_type: row.item_type,
            price,
            total_volume: 0.0,
            count: 0,
            is_zero_price: price == 0.0,
            has_different_prices: false,
            has_different_units: false,
        });
        entry.total_volume = round2(entry.total_volume + round2(row.volume));
        entry.count += 1;
    }

    let price_variants = collect_price_variants(&mut buckets);
    let unit_variants = collect_unit_variants(rows, &mut buckets);

    let mut buckets: Vec<AggregateBucket> = buckets.into_values().collect();
    buckets.sort_by(|a, b| {
        collate_names(&a.name, &b.name)
            .then(a.item_type.cmp(&b.item_type))
            .then(a.price.total_cmp(&b.price))
    });

    let stats = PivotStats {
        total_rows: rows.len(),
        bucket_count: buckets.len(),
        material_count: buckets.iter().filter(|b| b.item_type == ItemType::Material).count(),
        work_count: buckets.iter().filter(|b| b.item_type == ItemType::Work).count(),
        zero_price_count: buckets.iter().filter(|b| b.is_zero_price).count(),
        different_price_count: price_variants.len(),
        different_unit_count: unit_variants.len(),
    };

    PivotViews { buckets, price_variants, unit_variants, stats }
}

/// Re-group buckets on (name, type) only; a group with two or more
/// buckets has that many distinct prices by construction of the bucket
/// key. Marks `has_different_prices` on the member buckets.
fn collect_price_variants(
    buckets: &mut BTreeMap<BucketKey, AggregateBucket>,
) -> Vec<PriceVariantGroup> {
    let mut by_name: BTreeMap<(String, ItemType), Vec<BucketKey>> = BTreeMap::new();
    for key in buckets.keys() {
        by_name
            .entry((key.name.clone(), key.item_type))
            .or_default()
            .push(key.clone());
    }

    let mut groups = Vec::new();
    for ((_, item_type), keys) in by_name {
        if keys.len() < 2 {
            continue;
        }

        let mut variants = Vec::with_capacity(keys.len());
        let mut display_name = String::new();
        for key in &keys {
            let bucket = buckets.get_mut(key).unwrap();
            bucket.has_different_prices = true;
            if display_name.is_empty() {
                display_name = bucket.name.clone();
            }
            variants.push(PriceVariant {
                price: bucket.price,
                volume: bucket.total_volume,
                count: bucket.count,
            });
        }
        variants.sort_by(|a, b| a.price.total_cmp(&b.price));

        groups.push(PriceVariantGroup { name: display_name, item_type, variants });
    }

    groups.sort_by(|a, b| collate_names(&a.name, &b.name).then(a.item_type.cmp(&b.item_type)));
    groups
}

/// Re-group raw rows (not buckets) on (name, type), collecting distinct
/// unit strings with per-unit totals. Unit drift is a row-level property:
/// two rows may agree on price and still disagree on unit.
fn collect_unit_variants(
    rows: &[RawRow],
    buckets: &mut BTreeMap<BucketKey, AggregateBucket>,
) -> Vec<UnitVariantGroup> {
    let mut by_name: BTreeMap<(String, ItemType), BTreeMap<String, (f64, usize)>> = BTreeMap::new();
    let mut display_names: BTreeMap<(String, ItemType), String> = BTreeMap::new();

    for row in rows {
        let group_key = (normalize_name(&row.name), row.item_type);
        display_names
            .entry(group_key.clone())
            .or_insert_with(|| row.name.trim().to_string());
        let unit = row.unit.trim().to_string();
        let entry = by_name.entry(group_key).or_default().entry(unit).or_insert((0.0, 0));
        entry.0 = round2(entry.0 + round2(row.volume));
        entry.1 += 1;
    }

    let mut groups = Vec::new();
    for ((name_key, item_type), units) in by_name {
        if units.len() < 2 {
            continue;
        }

        for (key, bucket) in buckets.iter_mut() {
            if key.name == name_key && key.item_type == item_type {
                bucket.has_different_units = true;
            }
        }

        groups.push(UnitVariantGroup {
            name: display_names[&(name_key, item_type)].clone(),
            item_type,
            units: units
                .into_iter()
                .map(|(unit, (volume, count))| UnitVariant { unit, volume, count })
                .collect(),
        });
    }

    groups.sort_by(|a, b| collate_names(&a.name, &b.name).then(a.item_type.cmp(&b.item_type)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, price: f64, volume: f64) -> RawRow {
        RawRow {
            code: "мат-1".into(),
            item_type: ItemType::Material,
            name: name.into(),
            unit: "м".into(),
            volume,
            price_materials: price,
            price_works: 0.0,
            source_file: "a.xlsx".into(),
        }
    }

    fn row_with_unit(name: &str, unit: &str, price: f64, volume: f64) -> RawRow {
        RawRow { unit: unit.into(), ..row(name, price, volume) }
    }

    #[test]
    fn distinct_prices_split_buckets() {
        let views = aggregate(&[row("Кабель", 10.00, 1.0), row("Кабель", 10.01, 2.0)]);
        assert_eq!(views.buckets.len(), 2);
        assert_eq!(views.stats.different_price_count, 1);
    }

    #[test]
    fn prices_equal_after_rounding_share_a_bucket() {
        let views = aggregate(&[row("Кабель", 10.00, 1.0), row("Кабель", 10.004, 2.0)]);
        assert_eq!(views.buckets.len(), 1);
        assert_eq!(views.buckets[0].total_volume, 3.0);
        assert_eq!(views.buckets[0].count, 2);
        assert!(views.price_variants.is_empty());
    }

    #[test]
    fn variant_detection_is_case_and_whitespace_insensitive() {
        let views = aggregate(&[
            row("Кабель", 100.0, 5.0),
            row("Кабель", 120.0, 2.0),
            row("кабель  ", 100.0, 3.0),
        ]);
        assert_eq!(views.buckets.len(), 2);
        assert!(views.buckets.iter().all(|b| b.has_different_prices));

        assert_eq!(views.price_variants.len(), 1);
        let group = &views.price_variants[0];
        assert_eq!(group.variants.len(), 2);
        assert_eq!(group.variants[0].price, 100.0);
        assert_eq!(group.variants[0].volume, 8.0);
        assert_eq!(group.variants[0].count, 2);
        assert_eq!(group.variants[1].price, 120.0);
    }

    #[test]
    fn unit_variants_come_from_rows_not_buckets() {
        // same price everywhere, so one bucket per name; unit drift must
        // still be surfaced
        let views = aggregate(&[
            row_with_unit("Песок", "т", 500.0, 1.0),
            row_with_unit("Песок", "м3", 500.0, 2.0),
        ]);
        assert_eq!(views.unit_variants.len(), 1);
        let group = &views.unit_variants[0];
        assert_eq!(group.units.len(), 2);
        assert!(views.buckets.iter().all(|b| b.has_different_units));
        assert_eq!(views.stats.different_unit_count, 1);
    }

    #[test]
    fn materials_and_works_never_merge() {
        let mut work = row("Кабель", 100.0, 1.0);
        work.item_type = ItemType::Work;
        work.price_works = 100.0;
        let views = aggregate(&[row("Кабель", 100.0, 1.0), work]);
        assert_eq!(views.buckets.len(), 2);
        assert!(views.price_variants.is_empty());
        assert_eq!(views.stats.material_count, 1);
        assert_eq!(views.stats.work_count, 1);
    }

    #[test]
    fn zero_price_flagged_and_counted() {
        let views = aggregate(&[row("Грунт", 0.0, 4.0)]);
        assert!(views.buckets[0].is_zero_price);
        assert_eq!(views.stats.zero_price_count, 1);
    }

    #[test]
    fn volume_accumulation_rounds_per_step() {
        let rows: Vec<RawRow> = (0..100).map(|_| row("Кабель", 50.0, 0.1)).collect();
        let views = aggregate(&rows);
        assert_eq!(views.buckets[0].total_volume, 10.0);
    }

    #[test]
    fn output_sorted_by_locale() {
        let views = aggregate(&[
            row("Цемент", 1.0, 1.0),
            row("Арматура", 1.0, 1.0),
            row("Ёлка новогодняя", 1.0, 1.0),
            row("Ель", 1.0, 1.0),
        ]);
        let names: Vec<&str> = views.buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Арматура", "Ель", "Ёлка новогодняя", "Цемент"]);
    }

    #[test]
    fn empty_input_yields_empty_views() {
        let views = aggregate(&[]);
        assert!(views.buckets.is_empty());
        assert_eq!(views.stats.total_rows, 0);
    }
}

//! Property tests for alignment invariants.
//!
//! Uses proptest to verify:
//! 1. Merge is independent of input order
//! 2. Merge produces one row per distinct date across all inputs
//! 3. Period snapping is idempotent and never moves a date forward
//! 4. Normalized dates are unique

use chrono::{Duration, NaiveDate};
use macrofeed_core::data::{
    normalize::period_start, CategoryMerger, DateNormalizer, NormalizedSeries, RawSeries,
    SortOrder, Value,
};
use macrofeed_core::Frequency;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ── Strategies (proptest) ────────────────────────────────────────────

type Rows = BTreeMap<i64, Option<f64>>;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn arb_rows() -> impl Strategy<Value = Rows> {
    prop::collection::btree_map(0i64..400, prop::option::of(-1000.0..1000.0_f64), 0..25)
}

fn arb_frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::Daily),
        Just(Frequency::Weekly),
        Just(Frequency::Monthly),
        Just(Frequency::Quarterly),
        Just(Frequency::Yearly),
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|n| NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(n))
}

fn to_series(index: usize, rows: &Rows) -> NormalizedSeries {
    NormalizedSeries::new(
        format!("S{index}"),
        rows.iter()
            .map(|(offset, v)| (base() + Duration::days(*offset), v.map(Value::Number)))
            .collect(),
    )
}

fn merger(count: usize) -> CategoryMerger {
    let columns = (0..count).map(|i| format!("S{i}")).collect();
    CategoryMerger::new("PROP", columns, SortOrder::Descending)
}

// ── 1. Permutation invariance ────────────────────────────────────────

proptest! {
    #[test]
    fn merge_ignores_input_order(
        (original, shuffled) in prop::collection::vec(arb_rows(), 1..5)
            .prop_map(|all| all.iter().enumerate().map(|(i, r)| to_series(i, r)).collect::<Vec<_>>())
            .prop_flat_map(|series| (Just(series.clone()), Just(series).prop_shuffle()))
    ) {
        let m = merger(original.len());
        let a = m.merge(original).unwrap();
        let b = m.merge(shuffled).unwrap();
        prop_assert_eq!(a.as_ref().map(|t| t.fingerprint()), b.as_ref().map(|t| t.fingerprint()));
        prop_assert_eq!(a, b);
    }

    // ── 2. Row per distinct date ─────────────────────────────────────

    #[test]
    fn merge_has_one_row_per_distinct_date(all in prop::collection::vec(arb_rows(), 1..5)) {
        let series: Vec<_> = all.iter().enumerate().map(|(i, r)| to_series(i, r)).collect();
        let expected: BTreeSet<NaiveDate> = series.iter().flat_map(|s| s.dates()).collect();

        match merger(series.len()).merge(series.clone()).unwrap() {
            None => prop_assert!(expected.is_empty()),
            Some(table) => {
                prop_assert_eq!(table.height(), expected.len());
                let got: BTreeSet<NaiveDate> = table.dates.iter().copied().collect();
                prop_assert_eq!(&got, &expected);
                prop_assert!(table.dates.windows(2).all(|w| w[0] > w[1]));
                for s in &series {
                    for (date, value) in &s.rows {
                        prop_assert_eq!(table.value(*date, &s.header), value.as_ref());
                    }
                }
            }
        }
    }

    // ── 3. Snapping ──────────────────────────────────────────────────

    #[test]
    fn snapping_is_idempotent(date in arb_date(), freq in arb_frequency()) {
        let once = period_start(date, freq);
        prop_assert_eq!(period_start(once, freq), once);
        prop_assert!(once <= date);
    }

    // ── 4. Unique dates after normalization ──────────────────────────

    #[test]
    fn normalized_dates_are_unique(
        offsets in prop::collection::vec(0i64..2000, 0..60),
        freq in prop::option::of(arb_frequency()),
        lag in prop::option::of(0i32..13),
    ) {
        let mut raw = RawSeries::new("X");
        for (i, offset) in offsets.iter().enumerate() {
            raw.push(base() + Duration::days(*offset), Some(Value::Number(i as f64)));
        }
        let out = DateNormalizer::new().normalize(raw, freq, lag);
        prop_assert!(out.rejected.is_empty());
        prop_assert!(out.series.len() <= offsets.len());
        let unique: HashSet<NaiveDate> = out.series.dates().collect();
        prop_assert_eq!(unique.len(), out.series.len());
    }
}

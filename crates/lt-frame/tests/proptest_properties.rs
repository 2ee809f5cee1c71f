#![forbid(unsafe_code)]

//! Property tests over arbitrary tables: construction, label/position
//! agreement, sort stability, copy independence and transpose round trips.

use proptest::prelude::*;

use lt_frame::{
    ColumnLabels, FrameOptions, IndexLabel, NaPosition, NullKind, Positions, RowLabels, Scalar,
    Selection, Table,
};

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

fn arb_int_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        4 => (-50i64..50).prop_map(Scalar::Int64),
        1 => Just(Scalar::Null(NullKind::Null)),
    ]
}

fn arb_float_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        4 => (-1e3_f64..1e3_f64).prop_map(Scalar::Float64),
        1 => Just(Scalar::Null(NullKind::NaN)),
    ]
}

fn arb_text_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        4 => "[a-d]{1,2}".prop_map(Scalar::Utf8),
        1 => Just(Scalar::Null(NullKind::Null)),
    ]
}

/// Few distinct keys so ties are common.
fn arb_sort_key() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        3 => (0i64..3).prop_map(Scalar::Int64),
        1 => Just(Scalar::na()),
    ]
}

fn arb_na_position() -> impl Strategy<Value = NaPosition> {
    prop_oneof![Just(NaPosition::First), Just(NaPosition::Last)]
}

/// One column of `len` values drawn from a single dtype family.
fn arb_column_values(len: usize) -> impl Strategy<Value = Vec<Scalar>> {
    prop_oneof![
        proptest::collection::vec(arb_int_scalar(), len),
        proptest::collection::vec(arb_float_scalar(), len),
        proptest::collection::vec(arb_text_scalar(), len),
    ]
}

/// Unique row labels: distinct integers in shuffled order.
fn arb_row_labels(len: usize) -> impl Strategy<Value = Vec<IndexLabel>> {
    Just((0..len as i64).map(|v| IndexLabel::Int64(v * 10)).collect::<Vec<_>>())
        .prop_shuffle()
}

/// A table with 1..=max_rows rows and 1..=max_cols columns labeled `c0..`.
fn arb_table(max_rows: usize, max_cols: usize) -> impl Strategy<Value = Table> {
    (1..=max_rows, 1..=max_cols).prop_flat_map(|(rows, cols)| {
        (
            arb_row_labels(rows),
            proptest::collection::vec(arb_column_values(rows), cols),
        )
            .prop_map(|(labels, columns)| {
                let inputs = columns
                    .into_iter()
                    .enumerate()
                    .map(|(c, values)| (IndexLabel::Utf8(format!("c{c}")), values.into()))
                    .collect();
                Table::from_columns(inputs, Some(labels)).expect("generated table is valid")
            })
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every column has one value per row label.
    #[test]
    fn prop_columns_match_index_length(table in arb_table(12, 5)) {
        for label in table.columns().labels() {
            let column = table.column(label).expect("column exists");
            prop_assert_eq!(column.len(), table.len());
        }
    }

    /// Label access and position access reach the same cell.
    #[test]
    fn prop_loc_matches_iloc(table in arb_table(10, 4)) {
        for (r, row) in table.index().labels().iter().enumerate() {
            for (c, column) in table.columns().labels().iter().enumerate() {
                let by_label = table
                    .loc(&RowLabels::label(row), &ColumnLabels::label(column))
                    .expect("loc");
                let by_position = table
                    .iloc(&Positions::At(r as i64), &Positions::At(c as i64))
                    .expect("iloc");
                match (by_label, by_position) {
                    (Selection::Scalar(a), Selection::Scalar(b)) => {
                        prop_assert!(a.semantic_eq(&b));
                    }
                    other => prop_assert!(false, "expected scalars, got {other:?}"),
                }
            }
        }
    }

    /// Position ranges stop before `hi`; label ranges include both ends.
    #[test]
    fn prop_range_endpoints(table in arb_table(10, 2), lo in 0usize..10, span in 0usize..10) {
        let len = table.len();
        let lo = lo % len;
        let hi = (lo + span).min(len - 1);

        let by_position = table
            .iloc(&Positions::range(lo as i64, hi as i64), &Positions::All)
            .expect("iloc")
            .into_table()
            .expect("table");
        prop_assert_eq!(by_position.len(), hi - lo);

        let labels = table.index().labels();
        let by_label = table
            .loc(
                &RowLabels::range(&labels[lo], &labels[hi]),
                &ColumnLabels::All,
            )
            .expect("loc")
            .into_table()
            .expect("table");
        prop_assert_eq!(by_label.len(), hi - lo + 1);
    }

    /// Rows with equal keys keep their original relative order, and missing
    /// keys all land on the configured end.
    #[test]
    fn prop_sort_values_is_stable(
        keys in proptest::collection::vec(arb_sort_key(), 1..20),
        ascending in any::<bool>(),
        na_position in arb_na_position(),
    ) {
        let len = keys.len();
        let missing = keys.iter().filter(|k| k.is_missing()).count();
        let table = Table::from_columns(
            vec![
                ("key".into(), keys.into()),
                ("seq".into(), (0..len as i64).map(Scalar::Int64).collect::<Vec<_>>().into()),
            ],
            None,
        )
        .expect("table");
        let options = FrameOptions::default().with_na_position(na_position);
        let sorted = table.sort_values_with("key", ascending, &options).expect("sort");
        let key = sorted.column("key").expect("key");
        let seq = sorted.column("seq").expect("seq");

        let missing_block = match na_position {
            NaPosition::First => 0..missing,
            NaPosition::Last => len - missing..len,
        };
        for (i, value) in key.values().iter().enumerate() {
            prop_assert_eq!(value.is_missing(), missing_block.contains(&i));
        }
        for i in 1..len {
            if key.values()[i - 1].semantic_eq(&key.values()[i]) {
                let (Scalar::Int64(a), Scalar::Int64(b)) = (&seq.values()[i - 1], &seq.values()[i])
                else {
                    unreachable!("seq is Int64");
                };
                prop_assert!(a < b);
            }
        }
    }

    /// Mutating a copy never changes the original.
    #[test]
    fn prop_copy_is_independent(table in arb_table(8, 3)) {
        let mut copy = table.copy();
        let first = table.columns().labels()[0].clone();
        copy.set_iat(0, 0, Scalar::Null(NullKind::Null)).expect("missing fits any column");
        copy.assign_column("extra", Scalar::Int64(1)).expect("assign");
        prop_assert_eq!(table.num_columns() + 1, copy.num_columns());
        prop_assert!(table.column(first).is_ok());
        prop_assert!(table.column("extra").is_err());
    }

    /// Transposing twice restores labels and values.
    #[test]
    fn prop_transpose_round_trip(table in arb_table(8, 4)) {
        let back = table.transpose().expect("transpose").transpose().expect("back");
        prop_assert_eq!(back.index(), table.index());
        prop_assert_eq!(back.columns(), table.columns());
        for label in table.columns().labels() {
            let original = table.column(label).expect("column");
            let restored = back.column(label).expect("column");
            prop_assert!(
                original
                    .values()
                    .iter()
                    .zip(restored.values())
                    .all(|(a, b)| a.semantic_eq(b))
            );
        }
    }
}

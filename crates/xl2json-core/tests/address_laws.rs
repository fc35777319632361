//! Algebraic laws of the A1 address helpers.

use proptest::prelude::*;
use xl2json_core::address::{self, AbsoluteMode};

/// A cell address with an optional marker on each part.
fn cell() -> impl Strategy<Value = String> {
    (any::<bool>(), "[A-Za-z]{1,3}", any::<bool>(), 1u32..1_048_576).prop_map(
        |(col_abs, col, row_abs, row)| {
            format!(
                "{}{col}{}{row}",
                if col_abs { "$" } else { "" },
                if row_abs { "$" } else { "" }
            )
        },
    )
}

proptest! {
    #[test]
    fn single_cell_is_its_own_range(a in cell()) {
        prop_assert_eq!(address::begin_at(&a).unwrap(), a.as_str());
        prop_assert_eq!(address::end_at(&a).unwrap(), a.as_str());
    }

    #[test]
    fn join_inverts_split(x in cell(), y in cell()) {
        let range = address::join(&x, &y);
        let rebuilt = address::join(
            address::begin_at(&range).unwrap(),
            address::end_at(&range).unwrap(),
        );
        prop_assert_eq!(rebuilt, range);
    }

    #[test]
    fn strip_absolute_is_idempotent(s in "[$A-Za-z0-9:]{0,12}") {
        let once = address::strip_absolute(&s);
        prop_assert_eq!(address::strip_absolute(&once), once.clone());
        prop_assert!(!once.contains('$'));
    }

    #[test]
    fn force_absolute_agrees_with_marked_form(a in cell()) {
        let (col, row) = address::column_row(&a, AbsoluteMode::StrictRelative).unwrap();
        let marked = format!("${col}${row}");
        prop_assert_eq!(
            address::column_row(&a, AbsoluteMode::ForceAbsolute).unwrap(),
            address::column_row(&marked, AbsoluteMode::AsIs).unwrap()
        );
    }

    #[test]
    fn row_and_column_ignore_markers(a in cell()) {
        let bare = address::strip_absolute(&a);
        prop_assert_eq!(address::row(&a).unwrap(), address::row(&bare).unwrap());
        prop_assert_eq!(address::column(&a).unwrap(), address::column(&bare).unwrap());
    }
}

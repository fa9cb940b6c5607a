//! Chart hint (spec §4.9 step 6): a simple rule over a dataframe's
//! column kinds, computed once a query has executed successfully.

use crate::models::{ChartSuggestion, ColumnKind, DataFrame};

fn count(df: &DataFrame, kind: ColumnKind) -> usize {
    df.column_types.iter().filter(|k| **k == kind).count()
}

/// One categorical + one numeric ⇒ bar; two numerics ⇒ scatter; temporal
/// + numeric ⇒ line; else none.
pub fn suggest(df: &DataFrame) -> ChartSuggestion {
    let categorical = count(df, ColumnKind::Categorical);
    let numeric = count(df, ColumnKind::Numeric);
    let temporal = count(df, ColumnKind::Temporal);

    if categorical == 1 && numeric == 1 {
        ChartSuggestion::Bar
    } else if numeric == 2 {
        ChartSuggestion::Scatter
    } else if temporal >= 1 && numeric >= 1 {
        ChartSuggestion::Line
    } else {
        ChartSuggestion::None
    }
}

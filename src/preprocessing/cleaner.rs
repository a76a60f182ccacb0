//! Row-level table cleaning

use crate::error::Result;
use polars::prelude::*;
use tracing::info;

/// Remove rows with any missing value and exact-duplicate rows.
///
/// Nulls and float `NaN` both count as missing and are never imputed. The
/// first occurrence of a duplicated row is kept and row order is otherwise
/// preserved. The input frame is left untouched.
pub fn clean(df: &DataFrame) -> Result<DataFrame> {
    let n_rows = df.height();

    let complete = complete_rows(df)?;
    let n_incomplete = complete.iter().filter(|&&keep| !keep).count();

    let mask = BooleanChunked::from_slice("complete".into(), &complete);
    let kept = df.filter(&mask)?;
    let cleaned = kept.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let n_duplicates = kept.height() - cleaned.height();

    info!(
        rows_in = n_rows,
        rows_out = cleaned.height(),
        duplicates = n_duplicates,
        incomplete = n_incomplete,
        "Data cleaned: duplicates dropped and incomplete rows removed"
    );
    Ok(cleaned)
}

/// `true` for every row without a missing field
pub(crate) fn complete_rows(df: &DataFrame) -> Result<Vec<bool>> {
    let mut complete = vec![true; df.height()];
    for column in df.get_columns() {
        for (keep, missing) in complete.iter_mut().zip(missing_mask(column)?) {
            if missing {
                *keep = false;
            }
        }
    }
    Ok(complete)
}

/// `true` where a cell is null, or NaN in a float column
fn missing_mask(column: &Column) -> Result<Vec<bool>> {
    let mask = match column.dtype() {
        DataType::Float64 => column
            .f64()?
            .into_iter()
            .map(|v| v.map_or(true, f64::is_nan))
            .collect(),
        DataType::Float32 => column
            .f32()?
            .into_iter()
            .map(|v| v.map_or(true, f32::is_nan))
            .collect(),
        _ => column
            .is_null()
            .into_iter()
            .map(|v| v.unwrap_or(true))
            .collect(),
    };
    Ok(mask)
}

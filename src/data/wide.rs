use std::path::Path;

use log::{info, warn};

use super::loader::{load_series, SeriesFrame};
use super::model::{Annotation, Dataset, SemanticTag, StructuralType, Table, TableBuilder, Value};
use super::paths::{base_directory, series_paths};
use super::resolve::resolve_series_column;
use crate::config::{AxisCheck, WideConfig};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Pivot: one series file → one row
// ---------------------------------------------------------------------------

/// A series file turned sideways: its timestamps and matching values.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotedRow {
    pub timestamps: Vec<Value>,
    pub values: Vec<Value>,
}

/// Pull the timestamp and value columns out of a loaded series.
pub fn pivot(frame: &SeriesFrame, time_col: usize, value_col: usize) -> Result<PivotedRow> {
    let timestamps = frame.numeric_column(time_col)?;
    let values = frame
        .numeric_column(value_col)?
        .into_iter()
        .map(|v| v.as_f64().map_or(Value::Null, Value::Float))
        .collect();
    Ok(PivotedRow { timestamps, values })
}

/// First row at which two timestamp axes disagree.
fn first_divergence(axis: &[Value], other: &[Value]) -> Option<usize> {
    let common = axis.len().min(other.len());
    (0..common)
        .find(|&i| axis[i].as_f64() != other[i].as_f64())
        .or((axis.len() != other.len()).then_some(common))
}

/// Fit a row's values under the established axis.
fn align(
    axis: &[Value],
    row: PivotedRow,
    check: AxisCheck,
    path: &Path,
) -> Result<Vec<Value>> {
    let Some(at) = first_divergence(axis, &row.timestamps) else {
        return Ok(row.values);
    };
    match check {
        AxisCheck::Strict => Err(Error::TimestampMismatch {
            path: path.to_path_buf(),
            row: at,
        }),
        AxisCheck::Positional => {
            warn!(
                "{}: timestamps diverge at row {at}, placing {} values by position under {} columns",
                path.display(),
                row.values.len(),
                axis.len()
            );
            let mut values = row.values;
            values.resize(axis.len(), Value::Null);
            Ok(values)
        }
    }
}

// ---------------------------------------------------------------------------
// Wide reshape
// ---------------------------------------------------------------------------

/// Load every referenced series and pivot it into one output row.
///
/// The first series fixes the column headers (its timestamps, in file order).
/// Output rows follow input row order and are indexed 0..N-1. When `table`
/// belongs to `dataset`, a foreign key on the reference column supplies the
/// base uri.
pub fn reshape_wide(
    table: &Table,
    dataset: Option<&Dataset>,
    config: &WideConfig,
) -> Result<Table> {
    table.validate()?;
    let column = resolve_series_column(table, config.file_col_index)?;
    let base = base_directory(table, column, dataset)?;
    let paths = series_paths(table, column, &base)?;

    let mut axis: Vec<Value> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(paths.len());

    for (i, path) in paths.iter().enumerate() {
        let frame = load_series(path)?;
        let row = pivot(&frame, config.time_col_index, config.value_col_index)?;
        if i == 0 {
            axis = row.timestamps.clone();
        }
        rows.push(align(&axis, row, config.axis_check, path)?);
    }

    let schema = axis
        .iter()
        .map(|t| {
            let annotation =
                Annotation::new(StructuralType::Float).with_tag(SemanticTag::Attribute);
            (t.to_string(), annotation)
        })
        .collect();
    let mut builder = TableBuilder::with_capacity(schema, rows.len());
    for row in rows {
        builder.push_row(row);
    }
    let out = builder.finish();

    info!(
        "wide reshape: {} series x {} timestamps from column {column}",
        out.num_rows(),
        out.num_columns()
    );
    Ok(out)
}

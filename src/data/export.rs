use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;

use super::model::{Column, StructuralType, Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Arrow conversion
// ---------------------------------------------------------------------------

/// Arrow type for a column. Columns with no values at all become Utf8.
fn data_type(col: &Column) -> DataType {
    if col.values.iter().all(Value::is_null) {
        return DataType::Utf8;
    }
    match col.annotation.structural_type {
        StructuralType::String => DataType::Utf8,
        StructuralType::Integer => DataType::Int64,
        StructuralType::Float => DataType::Float64,
        StructuralType::Bool => DataType::Boolean,
    }
}

/// Typed cells of one column, failing on the first cell that does not fit
/// `ty`. Utf8 takes any cell.
fn cells<T>(
    col: &Column,
    ty: &DataType,
    fit: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    col.values
        .iter()
        .enumerate()
        .map(|(row, v)| match (v, fit(v)) {
            (Value::Null, _) => Ok(None),
            (_, Some(x)) => Ok(Some(x)),
            (_, None) => Err(Error::CellType {
                column: col.name.clone(),
                row,
                expected: ty.clone(),
            }),
        })
        .collect()
}

fn to_array(col: &Column, ty: &DataType) -> Result<ArrayRef> {
    let array: ArrayRef = match ty {
        DataType::Int64 => Arc::new(Int64Array::from(cells(col, ty, |v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        })?)),
        DataType::Float64 => Arc::new(Float64Array::from(cells(col, ty, Value::as_f64)?)),
        DataType::Boolean => Arc::new(BooleanArray::from(cells(col, ty, |v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        })?)),
        _ => Arc::new(
            col.values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect::<StringArray>(),
        ),
    };
    Ok(array)
}

/// Convert a table into a single record batch; every field is nullable.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let types: Vec<DataType> = table.columns.iter().map(data_type).collect();
    let schema = Arc::new(Schema::new(
        table
            .columns
            .iter()
            .zip(&types)
            .map(|(c, ty)| Field::new(&c.name, ty.clone(), true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .zip(&types)
        .map(|(c, ty)| to_array(c, ty))
        .collect::<Result<_>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Headed CSV; nulls are written as empty cells.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::csv(path, e))?;
    writer
        .write_record(table.column_names())
        .map_err(|e| Error::csv(path, e))?;
    for i in 0..table.num_rows() {
        writer
            .write_record(table.row(i).iter().map(|v| v.to_string()))
            .map_err(|e| Error::csv(path, e))?;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Render as an ASCII table.
pub fn pretty(table: &Table) -> Result<String> {
    let batch = to_record_batch(table)?;
    Ok(arrow::util::pretty::pretty_format_batches(&[batch])?.to_string())
}

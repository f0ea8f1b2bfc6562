// Typed column access for mart batches
//
// Mart files may store integers at any width, so every accessor casts to
// the canonical type first and then extracts values. Nulls in a column
// declared non-null are parse errors.

use crate::error::{PipelineError, Result};
use arrow::array::{ArrayRef, AsArray, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, UInt64Type};

fn column_as(batch: &RecordBatch, name: &str, data_type: &DataType) -> Result<ArrayRef> {
    let index = batch.schema().index_of(name)?;
    Ok(cast(batch.column(index), data_type)?)
}

fn required<T>(name: &str, values: impl Iterator<Item = Option<T>>) -> Result<Vec<T>> {
    values
        .map(|value| value.ok_or_else(|| PipelineError::parse(name, "unexpected null")))
        .collect()
}

pub fn read_i64(batch: &RecordBatch, name: &str) -> Result<Vec<i64>> {
    let array = column_as(batch, name, &DataType::Int64)?;
    required(name, array.as_primitive::<Int64Type>().iter())
}

pub fn read_u64(batch: &RecordBatch, name: &str) -> Result<Vec<u64>> {
    let array = column_as(batch, name, &DataType::UInt64)?;
    required(name, array.as_primitive::<UInt64Type>().iter())
}

pub fn read_f64(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let array = column_as(batch, name, &DataType::Float64)?;
    required(name, array.as_primitive::<Float64Type>().iter())
}

pub fn read_opt_f64(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let array = column_as(batch, name, &DataType::Float64)?;
    Ok(array.as_primitive::<Float64Type>().iter().collect())
}

pub fn read_string(batch: &RecordBatch, name: &str) -> Result<Vec<String>> {
    let array = column_as(batch, name, &DataType::Utf8)?;
    required(
        name,
        array.as_string::<i32>().iter().map(|v| v.map(str::to_string)),
    )
}

pub fn read_opt_string(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let array = column_as(batch, name, &DataType::Utf8)?;
    Ok(array
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Narrow a canonical `i64` back to the row field type.
pub fn narrow<T: TryFrom<i64>>(name: &str, value: i64) -> Result<T> {
    T::try_from(value).map_err(|_| PipelineError::parse(name, format!("{value} out of range")))
}

pub fn read_narrow<T: TryFrom<i64>>(batch: &RecordBatch, name: &str) -> Result<Vec<T>> {
    read_i64(batch, name)?
        .into_iter()
        .map(|value| narrow(name, value))
        .collect()
}

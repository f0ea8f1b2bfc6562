// Minimal-width integer columns
//
// Marts are built with Int64/UInt64 integer columns and narrowed to the
// smallest type that holds every value before they are persisted. Signed
// columns stay signed and unsigned columns stay unsigned.

use crate::error::Result;
use arrow::array::{ArrayRef, AsArray, RecordBatch};
use arrow::compute::cast;
use arrow::compute::kernels::aggregate::{max, min};
use arrow::datatypes::{DataType, Field, Int64Type, Schema, UInt64Type};
use std::sync::Arc;

/// Smallest signed type holding `[min, max]`.
pub fn narrowest_signed(min: i64, max: i64) -> DataType {
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        DataType::Int8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        DataType::Int16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

/// Smallest unsigned type holding `max`.
pub fn narrowest_unsigned(max: u64) -> DataType {
    if max <= u8::MAX as u64 {
        DataType::UInt8
    } else if max <= u16::MAX as u64 {
        DataType::UInt16
    } else if max <= u32::MAX as u64 {
        DataType::UInt32
    } else {
        DataType::UInt64
    }
}

/// Narrow every Int64/UInt64 column of `batch`; other columns pass through.
///
/// Empty and all-null columns narrow to the 8-bit type.
pub fn downcast_integers(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let target = match column.data_type() {
            DataType::Int64 => {
                let values = column.as_primitive::<Int64Type>();
                narrowest_signed(min(values).unwrap_or(0), max(values).unwrap_or(0))
            }
            DataType::UInt64 => {
                let values = column.as_primitive::<UInt64Type>();
                narrowest_unsigned(max(values).unwrap_or(0))
            }
            other => other.clone(),
        };

        if &target == column.data_type() {
            fields.push(field.as_ref().clone());
            columns.push(column.clone());
        } else {
            fields.push(Field::new(field.name(), target.clone(), field.is_nullable()));
            columns.push(cast(column, &target)?);
        }
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, UInt64Array};

    #[test]
    fn test_narrowest_signed() {
        assert_eq!(narrowest_signed(1, 12), DataType::Int8);
        assert_eq!(narrowest_signed(2020, 2025), DataType::Int16);
        assert_eq!(narrowest_signed(-200, 5), DataType::Int16);
        assert_eq!(narrowest_signed(-40_000, 0), DataType::Int32);
        assert_eq!(narrowest_signed(0, i64::MAX), DataType::Int64);
    }

    #[test]
    fn test_narrowest_unsigned() {
        assert_eq!(narrowest_unsigned(255), DataType::UInt8);
        assert_eq!(narrowest_unsigned(256), DataType::UInt16);
        assert_eq!(narrowest_unsigned(70_000), DataType::UInt32);
        assert_eq!(narrowest_unsigned(u64::MAX), DataType::UInt64);
    }

    #[test]
    fn test_downcast_integers_keeps_names_and_values() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("year", DataType::Int64, false),
            Field::new("total_rentals", DataType::UInt64, false),
            Field::new("net_flow", DataType::Int64, false),
            Field::new("latitude", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![2021, 2022])),
                Arc::new(UInt64Array::from(vec![5, 70_000])),
                Arc::new(Int64Array::from(vec![-3, 100])),
                Arc::new(Float64Array::from(vec![37.5, 37.6])),
            ],
        )
        .unwrap();

        let narrowed = downcast_integers(&batch).unwrap();
        let types: Vec<DataType> = narrowed
            .schema()
            .fields()
            .iter()
            .map(|f| f.data_type().clone())
            .collect();
        assert_eq!(
            types,
            vec![
                DataType::Int16,
                DataType::UInt32,
                DataType::Int8,
                DataType::Float64
            ]
        );
        assert_eq!(narrowed.schema().field(1).name(), "total_rentals");

        let back = cast(narrowed.column(1), &DataType::UInt64).unwrap();
        assert_eq!(
            back.as_primitive::<UInt64Type>().values().to_vec(),
            vec![5u64, 70_000]
        );
    }

    #[test]
    fn test_downcast_empty_column() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "total_rentals",
            DataType::UInt64,
            false,
        )]));
        let batch = RecordBatch::new_empty(schema);
        let narrowed = downcast_integers(&batch).unwrap();
        assert_eq!(narrowed.schema().field(0).data_type(), &DataType::UInt8);
        assert_eq!(narrowed.num_rows(), 0);
    }
}

// Parquet import/export via Arrow record batches

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow_array::builder::{BooleanBuilder, Float64Builder, Int64Builder, StringBuilder, TimestampMicrosecondBuilder};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Date64Type, Decimal128Type, Decimal256Type, Float16Type, Float32Type, Float64Type,
    Int16Type, Int32Type, Int64Type, Int8Type, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::write_atomically;
use parqview_engine::{CellValue, Column, ColumnType, LoadError, SaveError, TableStore, TypedValue};

/// Engine type for an Arrow type. Anything unrecognised is shown as text.
pub fn column_type_for(data_type: &DataType) -> ColumnType {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => ColumnType::Integer,
        DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => ColumnType::Float,
        DataType::Boolean => ColumnType::Boolean,
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => ColumnType::DateTime,
        _ => ColumnType::Text,
    }
}

/// Arrow type written for an engine type
pub fn data_type_for(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::DateTime => DataType::Timestamp(TimeUnit::Microsecond, None),
        ColumnType::Text => DataType::Utf8,
    }
}

pub fn import(path: &Path) -> Result<TableStore, LoadError> {
    let parse_err = |message: String| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    };
    let file = File::open(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| parse_err(e.to_string()))?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(|e| parse_err(e.to_string()))?;

    let columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|f| Column::new(f.name().clone(), column_type_for(f.data_type())))
        .collect();
    let mut table = TableStore::with_columns(columns)?;

    for batch in reader {
        let batch = batch.map_err(|e| parse_err(e.to_string()))?;
        let options = FormatOptions::default();
        // Only needed for types without a direct mapping; None when Arrow cannot render it either
        let formatters: Vec<Option<ArrayFormatter<'_>>> = batch
            .columns()
            .iter()
            .map(|array| ArrayFormatter::try_new(array.as_ref(), &options).ok())
            .collect();

        for row in 0..batch.num_rows() {
            let mut cells = Vec::with_capacity(batch.num_columns());
            for (col, array) in batch.columns().iter().enumerate() {
                let value = cell_value(array, row, formatters[col].as_ref()).map_err(&parse_err)?;
                cells.push(value);
            }
            table.push_row(cells)?;
        }
    }

    debug!(
        "read parquet {}: {} rows, {} columns",
        path.display(),
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// One Arrow cell as an engine value
fn cell_value(array: &ArrayRef, row: usize, formatter: Option<&ArrayFormatter<'_>>) -> Result<CellValue, String> {
    if array.is_null(row) {
        return Ok(None);
    }
    let value = match array.data_type() {
        DataType::Int8 => TypedValue::Int(array.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => TypedValue::Int(array.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => TypedValue::Int(array.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => TypedValue::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => TypedValue::Int(array.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => TypedValue::Int(array.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => TypedValue::Int(array.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => {
            let n = array.as_primitive::<UInt64Type>().value(row);
            TypedValue::Int(i64::try_from(n).map_err(|_| format!("value {} overflows a 64-bit integer", n))?)
        }
        DataType::Float16 => TypedValue::Float(array.as_primitive::<Float16Type>().value(row).to_f64()),
        DataType::Float32 => TypedValue::Float(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => TypedValue::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, _) => {
            let text = array.as_primitive::<Decimal128Type>().value_as_string(row);
            TypedValue::Float(text.parse().map_err(|_| format!("bad decimal '{}'", text))?)
        }
        DataType::Decimal256(_, _) => {
            let text = array.as_primitive::<Decimal256Type>().value_as_string(row);
            TypedValue::Float(text.parse().map_err(|_| format!("bad decimal '{}'", text))?)
        }
        DataType::Boolean => TypedValue::Bool(array.as_boolean().value(row)),
        DataType::Timestamp(unit, _) => {
            // Zoned timestamps are stored as UTC instants; naive UTC is what we keep
            let ts = match unit {
                TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value_as_datetime(row),
                TimeUnit::Millisecond => array.as_primitive::<TimestampMillisecondType>().value_as_datetime(row),
                TimeUnit::Microsecond => array.as_primitive::<TimestampMicrosecondType>().value_as_datetime(row),
                TimeUnit::Nanosecond => array.as_primitive::<TimestampNanosecondType>().value_as_datetime(row),
            };
            TypedValue::Timestamp(ts.ok_or_else(|| "timestamp out of range".to_string())?)
        }
        DataType::Date32 => {
            let ts = array.as_primitive::<Date32Type>().value_as_datetime(row);
            TypedValue::Timestamp(ts.ok_or_else(|| "date out of range".to_string())?)
        }
        DataType::Date64 => {
            let ts = array.as_primitive::<Date64Type>().value_as_datetime(row);
            TypedValue::Timestamp(ts.ok_or_else(|| "date out of range".to_string())?)
        }
        DataType::Utf8 => TypedValue::Text(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => TypedValue::Text(array.as_string::<i64>().value(row).to_string()),
        other => match formatter {
            Some(formatter) => TypedValue::Text(formatter.value(row).to_string()),
            None => return Err(format!("unsupported column type {}", other)),
        },
    };
    Ok(Some(value))
}

/// Write the whole table as one row group. The file is written beside the
/// target and renamed into place, so a failed save never truncates the original.
pub fn export(table: &TableStore, path: &Path) -> Result<(), SaveError> {
    if table.column_count() == 0 {
        return Err(SaveError::Encode("a parquet file needs at least one column".to_string()));
    }
    let batch = to_record_batch(table)?;

    let io_err = |message: String| SaveError::Io {
        path: path.to_path_buf(),
        message,
    };
    write_atomically(path, |partial| {
        let file = File::create(partial).map_err(|e| io_err(e.to_string()))?;
        let mut writer =
            ArrowWriter::try_new(file, batch.schema(), None).map_err(|e| SaveError::Encode(e.to_string()))?;
        writer.write(&batch).map_err(|e| SaveError::Encode(e.to_string()))?;
        writer.close().map_err(|e| io_err(e.to_string()))?;
        Ok(())
    })?;

    debug!("wrote parquet {}: {} rows", path.display(), table.row_count());
    Ok(())
}

fn mismatch(column: &Column, value: &TypedValue) -> SaveError {
    SaveError::Encode(format!(
        "column '{}' is {} but holds a {} value",
        column.name,
        column.column_type,
        value.column_type()
    ))
}

pub fn to_record_batch(table: &TableStore) -> Result<RecordBatch, SaveError> {
    let mut fields = Vec::with_capacity(table.column_count());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.column_count());

    for (col, column) in table.columns().iter().enumerate() {
        fields.push(Field::new(column.name.clone(), data_type_for(column.column_type), true));
        let cells = table.rows().map(|row| row[col].as_ref());
        let array: ArrayRef = match column.column_type {
            ColumnType::Integer => {
                let mut b = Int64Builder::with_capacity(table.row_count());
                for cell in cells {
                    match cell {
                        None => b.append_null(),
                        Some(TypedValue::Int(n)) => b.append_value(*n),
                        Some(other) => return Err(mismatch(column, other)),
                    }
                }
                Arc::new(b.finish())
            }
            ColumnType::Float => {
                let mut b = Float64Builder::with_capacity(table.row_count());
                for cell in cells {
                    match cell {
                        None => b.append_null(),
                        Some(TypedValue::Float(n)) => b.append_value(*n),
                        Some(other) => return Err(mismatch(column, other)),
                    }
                }
                Arc::new(b.finish())
            }
            ColumnType::Boolean => {
                let mut b = BooleanBuilder::with_capacity(table.row_count());
                for cell in cells {
                    match cell {
                        None => b.append_null(),
                        Some(TypedValue::Bool(v)) => b.append_value(*v),
                        Some(other) => return Err(mismatch(column, other)),
                    }
                }
                Arc::new(b.finish())
            }
            ColumnType::DateTime => {
                let mut b = TimestampMicrosecondBuilder::with_capacity(table.row_count());
                for cell in cells {
                    match cell {
                        None => b.append_null(),
                        Some(TypedValue::Timestamp(ts)) => b.append_value(ts.and_utc().timestamp_micros()),
                        Some(other) => return Err(mismatch(column, other)),
                    }
                }
                Arc::new(b.finish())
            }
            ColumnType::Text => {
                let mut b = StringBuilder::new();
                for cell in cells {
                    match cell {
                        None => b.append_null(),
                        Some(TypedValue::Text(s)) => b.append_value(s),
                        Some(other) => return Err(mismatch(column, other)),
                    }
                }
                Arc::new(b.finish())
            }
        };
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).map_err(|e| SaveError::Encode(e.to_string()))
}

//! Parquet encoding and decoding of trip and prediction tables.

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::{CastOptions, cast, cast_with_options};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, ScoringError};
use crate::records::{Prediction, TripRecord, TripTable};

/// Pickup/dropoff column pairs, tried in order.
pub const TIMESTAMP_COLUMNS: &[(&str, &str)] = &[
    ("tpep_pickup_datetime", "tpep_dropoff_datetime"),
    ("lpep_pickup_datetime", "lpep_dropoff_datetime"),
    ("pickup_datetime", "dropOff_datetime"),
    ("pickup_datetime", "dropoff_datetime"),
];

/// Decodes a Parquet trip table, keeping only the timestamp columns and
/// `categorical` columns.
///
/// Timestamps of any unit are normalised to microseconds; categorical
/// columns of any numeric (or numeric string) type become nullable `f64`.
///
/// # Errors
///
/// [`ScoringError::Storage`] if the bytes are not Parquet, no known
/// timestamp pair is present, or a categorical column is missing or holds
/// values that are not category codes.
pub fn decode_trips(location: &str, bytes: Bytes, categorical: &[String]) -> Result<TripTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .map_err(|e| ScoringError::storage(location, e))?;
    let schema = builder.schema().clone();

    let (pickup_col, dropoff_col) = TIMESTAMP_COLUMNS
        .iter()
        .copied()
        .find(|(p, d)| schema.index_of(p).is_ok() && schema.index_of(d).is_ok())
        .ok_or_else(|| {
            ScoringError::storage(location, "unsupported table: no pickup/dropoff columns")
        })?;

    let mut indices = vec![schema.index_of(pickup_col), schema.index_of(dropoff_col)]
        .into_iter()
        .map(|r| r.map_err(|e| ScoringError::storage(location, e)))
        .collect::<Result<Vec<_>>>()?;
    for field in categorical {
        let idx = schema.index_of(field).map_err(|_| {
            ScoringError::storage(location, format!("missing categorical column '{field}'"))
        })?;
        indices.push(idx);
    }

    let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|e| ScoringError::storage(location, e))?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| ScoringError::storage(location, e))?;

        let pickups = timestamp_values(location, &batch, pickup_col)?;
        let dropoffs = timestamp_values(location, &batch, dropoff_col)?;
        let mut columns = BTreeMap::new();
        for field in categorical {
            columns.insert(field.as_str(), category_values(location, &batch, field)?);
        }

        for row in 0..batch.num_rows() {
            let mut record = TripRecord::new(records.len(), pickups[row], dropoffs[row]);
            for (field, values) in &columns {
                record = record.with_category(field, values[row]);
            }
            records.push(record);
        }
    }

    debug!(location, rows = records.len(), pickup_col, "Trip table decoded");
    Ok(TripTable::new(categorical.to_vec(), records))
}

fn column<'a>(location: &str, batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ScoringError::storage(location, format!("missing column '{name}'")))
}

fn timestamp_values(
    location: &str,
    batch: &RecordBatch,
    name: &str,
) -> Result<Vec<Option<NaiveDateTime>>> {
    let micros = cast(
        column(location, batch, name)?,
        &DataType::Timestamp(TimeUnit::Microsecond, None),
    )
    .and_then(|ts| cast(&ts, &DataType::Int64))
    .map_err(|e| ScoringError::storage(location, e))?;

    let micros = micros
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| ScoringError::storage(location, format!("column '{name}' is not a timestamp")))?;

    Ok(micros
        .iter()
        .map(|v| v.and_then(DateTime::from_timestamp_micros).map(|dt| dt.naive_utc()))
        .collect())
}

/// Category codes as `f64`, NaN read as null.
///
/// The cast is strict: a value that is not a number (a zone name, say) is an
/// error rather than a null, as is a value with no `i64` code.
fn category_values(location: &str, batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };
    let floats = cast_with_options(column(location, batch, name)?, &DataType::Float64, &strict)
        .map_err(|e| {
            ScoringError::storage(location, format!("column '{name}' is not numeric: {e}"))
        })?;

    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| ScoringError::storage(location, format!("column '{name}' is not numeric")))?;

    floats
        .iter()
        .map(|v| match v {
            Some(x) if x.is_nan() => Ok(None),
            Some(x) if !fits_i64(x) => Err(ScoringError::storage(
                location,
                format!("column '{name}' holds {x}, which is not a valid category code"),
            )),
            other => Ok(other),
        })
        .collect()
}

fn fits_i64(x: f64) -> bool {
    // i64::MIN is -2^63 and exactly representable; 2^63 itself is out of range
    x.is_finite() && x >= i64::MIN as f64 && x < -(i64::MIN as f64)
}

/// Schema of the persisted result table. No index column.
pub fn prediction_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("ride_id", DataType::Utf8, false),
        Field::new("predicted_duration", DataType::Float64, false),
    ]))
}

/// Encodes predictions as a single-row-group Parquet file.
pub fn encode_predictions(location: &str, predictions: &[Prediction]) -> Result<Vec<u8>> {
    let schema = prediction_schema();
    let ride_ids = StringArray::from_iter_values(predictions.iter().map(|p| p.ride_id.as_str()));
    let durations =
        Float64Array::from_iter_values(predictions.iter().map(|p| p.predicted_duration));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(ride_ids) as ArrayRef, Arc::new(durations) as ArrayRef],
    )
    .map_err(|e| ScoringError::storage(location, e))?;

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None)
        .map_err(|e| ScoringError::storage(location, e))?;
    writer
        .write(&batch)
        .map_err(|e| ScoringError::storage(location, e))?;
    writer
        .close()
        .map_err(|e| ScoringError::storage(location, e))?;

    Ok(buf)
}

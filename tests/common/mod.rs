#![allow(dead_code)]

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ride_duration_batch::ScoringError;
use ride_duration_batch::model::DurationModel;
use ride_duration_batch::records::{FeatureMap, Prediction};
use ride_duration_batch::storage::BlobStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MICROS_PER_MINUTE: i64 = 60_000_000;

/// 2023-03-01T00:00:00Z in microseconds.
pub const MARCH_2023: i64 = 1_677_628_800_000_000;

/// Input row: duration in minutes plus pickup/dropoff zones.
pub struct Trip {
    pub minutes: f64,
    pub pu: Option<i64>,
    pub dolocation: Option<i64>,
}

pub fn trip(minutes: f64, pu: Option<i64>, dolocation: Option<i64>) -> Trip {
    Trip {
        minutes,
        pu,
        dolocation,
    }
}

/// Encodes trips the way the yellow taxi dataset lays them out.
pub fn yellow_parquet(trips: &[Trip]) -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "tpep_pickup_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(
            "tpep_dropoff_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("PULocationID", DataType::Int64, true),
        Field::new("DOLocationID", DataType::Int64, true),
        Field::new("fare_amount", DataType::Float64, true),
    ]));

    let pickups: Vec<Option<i64>> = trips.iter().map(|_| Some(MARCH_2023)).collect();
    let dropoffs: Vec<Option<i64>> = trips
        .iter()
        .map(|t| Some(MARCH_2023 + (t.minutes * MICROS_PER_MINUTE as f64) as i64))
        .collect();
    let pu: Vec<Option<i64>> = trips.iter().map(|t| t.pu).collect();
    let dolocation: Vec<Option<i64>> = trips.iter().map(|t| t.dolocation).collect();
    let fares: Vec<Option<f64>> = trips.iter().map(|_| Some(12.5)).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampMicrosecondArray::from(pickups)) as ArrayRef,
            Arc::new(TimestampMicrosecondArray::from(dropoffs)) as ArrayRef,
            Arc::new(Int64Array::from(pu)) as ArrayRef,
            Arc::new(Int64Array::from(dolocation)) as ArrayRef,
            Arc::new(Float64Array::from(fares)) as ArrayRef,
        ],
    )
    .unwrap();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    buf
}

/// Decodes a written prediction table back into rows.
pub fn read_predictions(bytes: &[u8]) -> Vec<Prediction> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
        .unwrap()
        .build()
        .unwrap();

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        assert_eq!(batch.num_columns(), 2, "no index column expected");
        let ids = batch
            .column_by_name("ride_id")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let durations = batch
            .column_by_name("predicted_duration")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        for i in 0..batch.num_rows() {
            out.push(Prediction {
                ride_id: ids.value(i).to_string(),
                predicted_duration: durations.value(i),
            });
        }
    }
    out
}

/// In-memory store keyed by location.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn with_object(location: &str, body: Vec<u8>) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert(location.to_string(), body);
        store
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn object(&self, location: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(location).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, location: &str) -> ride_duration_batch::Result<Bytes> {
        self.object(location)
            .map(Bytes::from)
            .ok_or_else(|| ScoringError::storage(location, "no such object"))
    }

    async fn put(&self, location: &str, body: Vec<u8>) -> ride_duration_batch::Result<()> {
        if self.fail_writes {
            return Err(ScoringError::storage(location, "backend unreachable"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(location.to_string(), body);
        Ok(())
    }
}

/// Predicts `PULocationID * 10 + DOLocationID`, so outputs trace back to inputs.
pub struct ZoneEchoModel;

impl DurationModel for ZoneEchoModel {
    fn predict(&self, records: &[FeatureMap]) -> ride_duration_batch::Result<Vec<f64>> {
        Ok(records
            .iter()
            .map(|r| {
                let pu: f64 = r["PULocationID"].parse().unwrap();
                let dolocation: f64 = r["DOLocationID"].parse().unwrap();
                pu * 10.0 + dolocation
            })
            .collect())
    }
}

/// Drops the last prediction.
pub struct ShortModel;

impl DurationModel for ShortModel {
    fn predict(&self, records: &[FeatureMap]) -> ride_duration_batch::Result<Vec<f64>> {
        Ok(vec![1.0; records.len().saturating_sub(1)])
    }
}

//! Feature engineering and filtering of raw trip records.

use tracing::debug;

use crate::records::{FeatureMap, PreparedRecord, PreparedTable, TripRecord, TripTable};

/// Categorical columns the duration model was trained on.
pub const DEFAULT_CATEGORICAL: [&str; 2] = ["PULocationID", "DOLocationID"];

pub const MIN_DURATION_MINUTES: f64 = 1.0;
pub const MAX_DURATION_MINUTES: f64 = 60.0;

/// Stand-in for a null categorical value.
pub const NULL_CATEGORY: i64 = -1;

/// Formats the identifier of the row at `row_index` in the unfiltered table.
pub fn ride_id(year: i32, month: i32, row_index: usize) -> String {
    format!("{year:04}/{month:02}_{row_index}")
}

/// Stamps every raw record with its ride identifier.
///
/// Must run before [`prepare`] so identifiers keep pointing at source rows
/// once filtering leaves gaps.
pub fn assign_ride_ids(table: &mut TripTable, year: i32, month: i32) {
    for record in &mut table.records {
        record.ride_id = Some(ride_id(year, month, record.row_index));
    }
}

/// Trip duration in fractional minutes, `None` when either timestamp is null.
pub fn duration_minutes(record: &TripRecord) -> Option<f64> {
    let pickup = record.pickup_datetime?;
    let dropoff = record.dropoff_datetime?;
    let micros = (dropoff - pickup).num_microseconds()?;
    Some(micros as f64 / 60_000_000.0)
}

/// Null-fills, truncates to an integer and renders a categorical value.
pub fn normalize_category(value: Option<f64>) -> String {
    match value.filter(|v| !v.is_nan()) {
        Some(v) => (v as i64).to_string(),
        None => NULL_CATEGORY.to_string(),
    }
}

fn in_range(duration: f64) -> bool {
    (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration)
}

/// Computes durations, drops out-of-range trips and normalizes categorical
/// fields. The input table is left untouched.
///
/// A field missing from a record is treated as null.
pub fn prepare(table: &TripTable, categorical_fields: &[String]) -> PreparedTable {
    let records: Vec<PreparedRecord> = table
        .records
        .iter()
        .filter_map(|record| {
            let duration = duration_minutes(record).filter(|d| in_range(*d))?;

            let features: FeatureMap = categorical_fields
                .iter()
                .map(|field| {
                    let raw = record.categorical.get(field).copied().flatten();
                    (field.clone(), normalize_category(raw))
                })
                .collect();

            Some(PreparedRecord {
                row_index: record.row_index,
                ride_id: record.ride_id.clone(),
                duration_minutes: duration,
                features,
            })
        })
        .collect();

    debug!(
        rows_in = table.len(),
        rows_kept = records.len(),
        rows_dropped = table.len() - records.len(),
        "Trips filtered by duration"
    );

    PreparedTable {
        categorical_fields: categorical_fields.to_vec(),
        records,
    }
}

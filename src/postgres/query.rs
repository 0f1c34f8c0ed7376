use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use tokio_postgres::types::Type;

use crate::error::SprocError;
use crate::types::RowValues;

/// Extracts a `RowValues` from a tokio-postgres row at the given column index.
///
/// # Errors
/// Returns `SprocError::PostgresError` if the column cannot be read as the type it reports.
pub fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<RowValues, SprocError> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => {
            let val: Option<i16> = row.try_get(idx)?;
            val.map(|v| RowValues::Int(i64::from(v)))
        }
        Type::INT4 => {
            let val: Option<i32> = row.try_get(idx)?;
            val.map(|v| RowValues::Int(i64::from(v)))
        }
        Type::INT8 => {
            let val: Option<i64> = row.try_get(idx)?;
            val.map(RowValues::Int)
        }
        Type::FLOAT4 => {
            let val: Option<f32> = row.try_get(idx)?;
            val.map(|v| RowValues::Float(f64::from(v)))
        }
        Type::FLOAT8 => {
            let val: Option<f64> = row.try_get(idx)?;
            val.map(RowValues::Float)
        }
        Type::BOOL => {
            let val: Option<bool> = row.try_get(idx)?;
            val.map(RowValues::Bool)
        }
        Type::TIMESTAMP => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            val.map(RowValues::Timestamp)
        }
        Type::TIMESTAMPTZ => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            val.map(|v| RowValues::Timestamp(v.naive_utc()))
        }
        Type::DATE => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            val.map(|v| RowValues::Timestamp(v.and_time(NaiveTime::MIN)))
        }
        Type::TIME => {
            let val: Option<NaiveTime> = row.try_get(idx)?;
            val.map(|v| RowValues::Text(v.to_string()))
        }
        Type::JSON | Type::JSONB => {
            let val: Option<Value> = row.try_get(idx)?;
            val.map(RowValues::JSON)
        }
        Type::BYTEA => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            val.map(RowValues::Blob)
        }
        _ => {
            // For other types, attempt to get as string
            let val: Option<String> = row.try_get(idx)?;
            val.map(RowValues::Text)
        }
    };

    Ok(value.unwrap_or(RowValues::Null))
}

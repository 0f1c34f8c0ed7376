use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::{ColumnData, FromSql, QueryItem, QueryStream};

use crate::error::SprocError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Drain a query stream into one `ResultSet` per result set the batch produced, in order.
///
/// A result set with columns but no rows still yields an (empty) entry.
///
/// # Errors
/// Returns `SprocError::MssqlError` if the stream fails or a cell cannot be decoded.
pub async fn collect_result_sets(
    mut stream: QueryStream<'_>,
) -> Result<Vec<ResultSet>, SprocError> {
    let mut sets: Vec<ResultSet> = Vec::new();

    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => {
                let names: Vec<String> =
                    meta.columns().iter().map(|c| c.name().to_string()).collect();
                let mut set = ResultSet::with_capacity(10);
                set.set_column_names(Arc::new(names));
                sets.push(set);
            }
            QueryItem::Row(row) => {
                let Some(current) = sets.last_mut() else {
                    return Err(SprocError::ExecutionError(
                        "SQL Server sent a row before its column metadata".to_string(),
                    ));
                };
                let values = row
                    .into_iter()
                    .map(|data| extract_value(&data))
                    .collect::<Result<Vec<_>, _>>()?;
                current.add_row_values(values);
            }
        }
    }

    Ok(sets)
}

/// Convert one tiberius cell into a `RowValues`.
///
/// # Errors
/// Returns `SprocError::MssqlError` if a date/time cell cannot be decoded.
pub fn extract_value(data: &ColumnData<'static>) -> Result<RowValues, SprocError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| RowValues::Text(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| RowValues::Blob(b.to_vec())),
        ColumnData::Numeric(v) => v.map(|n| RowValues::Float(f64::from(n))),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| RowValues::Text(x.clone().into_owned().into_string())),
        ColumnData::Date(_) => {
            NaiveDate::from_sql(data)?.map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN)))
        }
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|t| RowValues::Text(t.to_string())),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(data)?.map(|dt| RowValues::Timestamp(dt.naive_utc()))
        }
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(RowValues::Timestamp)
        }
    };

    Ok(value.unwrap_or(RowValues::Null))
}

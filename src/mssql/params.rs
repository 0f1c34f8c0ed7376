use tiberius::Query;

use crate::error::SprocError;
use crate::types::{RowValues, SqlType};

/// The T-SQL type a registered output is declared as.
#[must_use]
pub fn declared_type(sql_type: SqlType) -> &'static str {
    match sql_type {
        SqlType::Bit | SqlType::Boolean => "bit",
        SqlType::TinyInt => "tinyint",
        SqlType::SmallInt => "smallint",
        SqlType::Integer => "int",
        SqlType::BigInt => "bigint",
        SqlType::Real => "real",
        SqlType::Float | SqlType::Double => "float",
        SqlType::Char | SqlType::Varchar | SqlType::NVarchar => "nvarchar(4000)",
        SqlType::LongVarchar | SqlType::Json => "nvarchar(max)",
        SqlType::Date => "date",
        SqlType::Time => "time",
        SqlType::Timestamp => "datetime2",
        SqlType::Binary | SqlType::VarBinary | SqlType::Blob => "varbinary(max)",
        SqlType::Other => "sql_variant",
    }
}

fn mismatch(value: &RowValues, sql_type: SqlType) -> SprocError {
    SprocError::ParameterError(format!("cannot bind {value:?} as {}", sql_type.name()))
}

fn int_for(value: &RowValues, sql_type: SqlType) -> Result<i64, SprocError> {
    match value {
        RowValues::Int(i) => Ok(*i),
        RowValues::Bool(b) => Ok(i64::from(*b)),
        _ => Err(mismatch(value, sql_type)),
    }
}

fn narrow<T: TryFrom<i64>>(value: &RowValues, sql_type: SqlType) -> Result<T, SprocError> {
    T::try_from(int_for(value, sql_type)?).map_err(|_| {
        SprocError::ParameterError(format!("{value} is out of range for {}", sql_type.name()))
    })
}

/// Bind `value` as the next `@Pn` parameter, converted to the declared `sql_type`.
///
/// NULLs are bound as typed NULLs so the server sees the declared type either way.
///
/// # Errors
/// Returns `SprocError::ParameterError` if the value cannot be represented as `sql_type`.
pub fn bind_input(
    query: &mut Query<'_>,
    value: &RowValues,
    sql_type: SqlType,
) -> Result<(), SprocError> {
    if value.is_null() {
        bind_null(query, sql_type);
        return Ok(());
    }

    match sql_type {
        SqlType::Bit | SqlType::Boolean => match value {
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Int(i) => query.bind(*i != 0),
            _ => return Err(mismatch(value, sql_type)),
        },
        SqlType::TinyInt => query.bind(narrow::<u8>(value, sql_type)?),
        SqlType::SmallInt => query.bind(narrow::<i16>(value, sql_type)?),
        SqlType::Integer => query.bind(narrow::<i32>(value, sql_type)?),
        SqlType::BigInt => query.bind(int_for(value, sql_type)?),
        #[allow(clippy::cast_possible_truncation)]
        SqlType::Real => match value.as_float() {
            Some(f) => query.bind(f as f32),
            None => return Err(mismatch(value, sql_type)),
        },
        SqlType::Float | SqlType::Double => match value.as_float() {
            Some(f) => query.bind(f),
            None => return Err(mismatch(value, sql_type)),
        },
        SqlType::Char | SqlType::Varchar | SqlType::NVarchar | SqlType::LongVarchar => {
            match value {
                RowValues::Blob(_) => return Err(mismatch(value, sql_type)),
                _ => query.bind(value.to_string()),
            }
        }
        SqlType::Json => match value {
            RowValues::JSON(v) => query.bind(v.to_string()),
            RowValues::Text(s) => query.bind(s.clone()),
            _ => return Err(mismatch(value, sql_type)),
        },
        SqlType::Date => match value.as_timestamp() {
            Some(dt) => query.bind(dt.date()),
            None => return Err(mismatch(value, sql_type)),
        },
        SqlType::Time => match value.as_timestamp() {
            Some(dt) => query.bind(dt.time()),
            None => return Err(mismatch(value, sql_type)),
        },
        SqlType::Timestamp => match value.as_timestamp() {
            Some(dt) => query.bind(dt),
            None => return Err(mismatch(value, sql_type)),
        },
        SqlType::Binary | SqlType::VarBinary | SqlType::Blob => match value {
            RowValues::Blob(bytes) => query.bind(bytes.clone()),
            _ => return Err(mismatch(value, sql_type)),
        },
        SqlType::Other => bind_natural(query, value),
    }
    Ok(())
}

/// Bind by the value's own shape.
fn bind_natural(query: &mut Query<'_>, value: &RowValues) {
    match value {
        RowValues::Int(i) => query.bind(*i),
        RowValues::Float(f) => query.bind(*f),
        RowValues::Text(s) => query.bind(s.clone()),
        RowValues::Bool(b) => query.bind(*b),
        RowValues::Timestamp(dt) => query.bind(*dt),
        RowValues::Null => query.bind(Option::<String>::None),
        RowValues::JSON(jsval) => query.bind(jsval.to_string()),
        RowValues::Blob(bytes) => query.bind(bytes.clone()),
    }
}

fn bind_null(query: &mut Query<'_>, sql_type: SqlType) {
    match sql_type {
        SqlType::Bit | SqlType::Boolean => query.bind(Option::<bool>::None),
        SqlType::TinyInt => query.bind(Option::<u8>::None),
        SqlType::SmallInt => query.bind(Option::<i16>::None),
        SqlType::Integer => query.bind(Option::<i32>::None),
        SqlType::BigInt => query.bind(Option::<i64>::None),
        SqlType::Real => query.bind(Option::<f32>::None),
        SqlType::Float | SqlType::Double => query.bind(Option::<f64>::None),
        SqlType::Date => query.bind(Option::<chrono::NaiveDate>::None),
        SqlType::Time => query.bind(Option::<chrono::NaiveTime>::None),
        SqlType::Timestamp => query.bind(Option::<chrono::NaiveDateTime>::None),
        SqlType::Binary | SqlType::VarBinary | SqlType::Blob => query.bind(Option::<Vec<u8>>::None),
        SqlType::Char
        | SqlType::Varchar
        | SqlType::NVarchar
        | SqlType::LongVarchar
        | SqlType::Json
        | SqlType::Other => query.bind(Option::<String>::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_slots_declare_bit_and_nvarchar() {
        assert_eq!(declared_type(SqlType::Boolean), "bit");
        assert_eq!(declared_type(SqlType::Varchar), "nvarchar(4000)");
        assert_eq!(declared_type(SqlType::Other), "sql_variant");
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        let mut query = Query::new("EXEC p @P1");
        let err = bind_input(&mut query, &RowValues::Int(300), SqlType::TinyInt).unwrap_err();
        assert!(matches!(err, SprocError::ParameterError(_)));
        assert!(bind_input(&mut query, &RowValues::Int(200), SqlType::TinyInt).is_ok());
    }

    #[test]
    fn text_cannot_bind_as_binary() {
        let mut query = Query::new("EXEC p @P1");
        let err = bind_input(&mut query, &RowValues::Text("x".into()), SqlType::Blob).unwrap_err();
        assert!(matches!(err, SprocError::ParameterError(_)));
        assert!(bind_input(&mut query, &RowValues::Null, SqlType::Blob).is_ok());
    }
}

use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::{RowValues, SqlType};

/// The cast applied to an argument bound or registered as `sql_type`; `None` lets the server
/// infer it from the procedure signature.
#[must_use]
pub fn pg_cast(sql_type: SqlType) -> Option<&'static str> {
    let name = match sql_type {
        SqlType::Bit | SqlType::Boolean => "boolean",
        SqlType::TinyInt | SqlType::SmallInt => "smallint",
        SqlType::Integer => "integer",
        SqlType::BigInt => "bigint",
        SqlType::Real => "real",
        SqlType::Float | SqlType::Double => "double precision",
        SqlType::Char => "bpchar",
        SqlType::Varchar | SqlType::NVarchar => "varchar",
        SqlType::LongVarchar => "text",
        SqlType::Date => "date",
        SqlType::Time => "time",
        SqlType::Timestamp => "timestamp",
        SqlType::Binary | SqlType::VarBinary | SqlType::Blob => "bytea",
        SqlType::Json => "jsonb",
        SqlType::Other => return None,
    };
    Some(name)
}

pub(super) fn cast_suffix(sql_type: SqlType) -> String {
    pg_cast(sql_type).map_or_else(String::new, |name| format!("::{name}"))
}

/// Integers and floats are narrowed to the width the server asked for.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            RowValues::Text(s) => s.to_sql(ty, out),
            RowValues::Bool(b) => b.to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::DATE => dt.date().to_sql(ty, out),
                Type::TIME => dt.time().to_sql(ty, out),
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => jsval.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::TIME
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_follow_declared_types() {
        assert_eq!(cast_suffix(SqlType::Integer), "::integer");
        assert_eq!(cast_suffix(SqlType::Boolean), "::boolean");
        assert_eq!(cast_suffix(SqlType::Other), "");
    }

    #[test]
    fn integers_narrow_to_int4() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Int(42).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(&buf[..], &42_i32.to_be_bytes());

        let mut buf = bytes::BytesMut::new();
        assert!(RowValues::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn null_is_accepted_for_any_supported_type() {
        let mut buf = bytes::BytesMut::new();
        let res = RowValues::Null.to_sql_checked(&Type::BOOL, &mut buf).unwrap();
        assert!(matches!(res, IsNull::Yes));
        assert!(!<RowValues as ToSql>::accepts(&Type::NUMERIC));
    }
}

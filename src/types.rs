use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

use crate::error::SprocError;

/// Values bound as procedure inputs, read back from output parameters, or found in row cells.
///
/// The same enum is used across backends so mappers do not need to branch on driver types:
/// ```rust
/// use sproc_middleware::prelude::*;
///
/// let values = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Render the value as JSON (timestamps as `YYYY-MM-DD HH:MM:SS%.f`, blobs as byte arrays).
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::from(s.as_str()),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Timestamp(dt) => {
                JsonValue::from(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(value) => value.clone(),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => write!(f, "{s}"),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(dt) => write!(f, "{dt}"),
            RowValues::Null => f.write_str("null"),
            RowValues::JSON(value) => write!(f, "{value}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

macro_rules! sql_types {
    ($($(#[$doc:meta])* $variant:ident = $code:literal, $name:literal;)+) => {
        /// Driver type tag for a bound input or a registered output slot.
        ///
        /// Codes follow the JDBC `java.sql.Types` numbering so type lists can be shared with
        /// procedures documented for JDBC callers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
        pub enum SqlType {
            $($(#[$doc])* $variant,)+
        }

        impl SqlType {
            /// Integer code of this type.
            #[must_use]
            pub fn code(self) -> i32 {
                match self {
                    $(SqlType::$variant => $code,)+
                }
            }

            /// Upper-case type name, as shown in logs.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(SqlType::$variant => $name,)+
                }
            }
        }

        impl TryFrom<i32> for SqlType {
            type Error = SprocError;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(SqlType::$variant),)+
                    other => Err(SprocError::ParameterError(format!(
                        "unknown SQL type code {other}"
                    ))),
                }
            }
        }
    };
}

sql_types! {
    Bit = -7, "BIT";
    TinyInt = -6, "TINYINT";
    SmallInt = 5, "SMALLINT";
    Integer = 4, "INTEGER";
    BigInt = -5, "BIGINT";
    Real = 7, "REAL";
    Float = 6, "FLOAT";
    Double = 8, "DOUBLE";
    Char = 1, "CHAR";
    Varchar = 12, "VARCHAR";
    NVarchar = -9, "NVARCHAR";
    LongVarchar = -1, "LONGVARCHAR";
    Date = 91, "DATE";
    Time = 92, "TIME";
    Timestamp = 93, "TIMESTAMP";
    Binary = -2, "BINARY";
    VarBinary = -3, "VARBINARY";
    Blob = 2004, "BLOB";
    Boolean = 16, "BOOLEAN";
    Json = 2000, "JSON";
    /// Let the server infer the type.
    Other = 1111, "OTHER";
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of an output parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub sql_type: SqlType,
}

impl ParamType {
    #[must_use]
    pub fn of(sql_type: SqlType) -> Self {
        Self { sql_type }
    }
}

impl From<SqlType> for ParamType {
    fn from(sql_type: SqlType) -> Self {
        Self { sql_type }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.sql_type, f)
    }
}

/// An input argument: a value and the type it is bound as.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: RowValues,
    pub sql_type: SqlType,
}

impl Param {
    #[must_use]
    pub fn of(value: impl Into<RowValues>, sql_type: SqlType) -> Self {
        Self {
            value: value.into(),
            sql_type,
        }
    }

    #[must_use]
    pub fn param_type(&self) -> ParamType {
        ParamType::of(self.sql_type)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[value={}, type={}]", self.value, self.sql_type)
    }
}

/// Build the output type list for a call (status fields are never listed here).
#[must_use]
pub fn param_types(sql_types: &[SqlType]) -> Vec<ParamType> {
    sql_types.iter().copied().map(ParamType::of).collect()
}

/// Build a `Vec<Param>` from `value => type` pairs.
///
/// ```rust
/// use sproc_middleware::prelude::*;
///
/// let inputs = params![42_i64 => SqlType::Integer, "x" => SqlType::Varchar];
/// assert_eq!(inputs.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::types::Param>::new() };
    ($($value:expr => $ty:expr),+ $(,)?) => {
        vec![$($crate::types::Param::of($value, $ty)),+]
    };
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<i16> for RowValues {
    fn from(value: i16) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// The database backends a caller can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// SQL Server database
    Mssql,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::Postgres => f.write_str("postgres"),
            DatabaseType::Mssql => f.write_str("mssql"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_type_codes_round_trip_through_try_from() {
        for ty in [SqlType::Varchar, SqlType::Integer, SqlType::Boolean, SqlType::Other] {
            assert_eq!(SqlType::try_from(ty.code()).unwrap(), ty);
        }
        assert_eq!(SqlType::Varchar.code(), 12);
        assert!(SqlType::try_from(424_242).is_err());
    }

    #[test]
    fn display_matches_log_format() {
        assert_eq!(ParamType::of(SqlType::NVarchar).to_string(), "NVARCHAR");
        let p = Param::of(42_i64, SqlType::Integer);
        assert_eq!(p.to_string(), "[value=42, type=INTEGER]");
        assert_eq!(Param::of(Option::<i64>::None, SqlType::BigInt).value, RowValues::Null);
    }

    #[test]
    fn params_macro_keeps_order() {
        let inputs = params!["a" => SqlType::Varchar, 7_i64 => SqlType::BigInt];
        assert_eq!(inputs[0].value, RowValues::Text("a".into()));
        assert_eq!(inputs[1].sql_type, SqlType::BigInt);
        let none: Vec<Param> = params![];
        assert!(none.is_empty());
    }

    #[test]
    fn bool_accepts_zero_and_one_ints() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
    }
}

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, ValueEnum};
use sproc_middleware::prelude::*;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Call a stored procedure and print its row-set and output parameters as JSON"
)]
pub(crate) struct Args {
    #[arg(long, value_enum, default_value = "postgres")]
    pub(crate) db: DatabaseType,
    /// Postgres: connection URL. SQL Server: `host[:port]/database`.
    #[arg(long)]
    pub(crate) url: String,
    #[arg(long)]
    pub(crate) user: String,
    #[arg(long)]
    pub(crate) password: String,
    #[arg(long = "proc")]
    pub(crate) proc_name: String,
    /// Input parameter as `type:value`, e.g. `integer:42` or `varchar:alice`. Repeatable.
    #[arg(long = "in", value_parser = parse_input)]
    pub(crate) inputs: Vec<Param>,
    /// Declared output parameter type. Repeatable.
    #[arg(long = "out", value_enum)]
    pub(crate) outputs: Vec<SqlType>,
    /// Do not reserve the trailing status code/message slots.
    #[arg(long)]
    pub(crate) no_status_fields: bool,
    #[arg(long)]
    pub(crate) success_code: Option<i16>,
    /// JSON file with caller settings; flags override it.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    /// Log full call detail at debug level.
    #[arg(long, short)]
    pub(crate) verbose: bool,
}

impl Args {
    pub(crate) fn caller_config(&self) -> Result<CallerConfig, SprocError> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SprocError::ConfigError(format!("cannot read {}: {e}", path.display()))
                })?;
                CallerConfig::from_json_str(&text)?
            }
            None => CallerConfig::default(),
        };
        if self.no_status_fields {
            config = config.with_status_fields(false);
        }
        if let Some(code) = self.success_code {
            config = config.with_success_code(code);
        }
        Ok(config)
    }
}

/// Split `host[:port]/database`.
#[cfg_attr(not(feature = "mssql"), allow(dead_code))]
pub(crate) fn parse_server(url: &str) -> Result<(String, Option<u16>, String), String> {
    let (server, database) = url
        .split_once('/')
        .ok_or_else(|| format!("expected host[:port]/database, got {url:?}"))?;
    if database.is_empty() {
        return Err(format!("missing database in {url:?}"));
    }
    let (host, port) = match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|e| format!("bad port {port:?}: {e}"))?;
            (host, Some(port))
        }
        None => (server, None),
    };
    Ok((host.to_string(), port, database.to_string()))
}

fn parse_input(raw: &str) -> Result<Param, String> {
    let (ty, text) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected type:value, got {raw:?}"))?;
    let sql_type = SqlType::from_str(ty, true)?;
    let value = parse_value(sql_type, text)?;
    Ok(Param::of(value, sql_type))
}

fn parse_value(sql_type: SqlType, text: &str) -> Result<RowValues, String> {
    if text.eq_ignore_ascii_case("null") {
        return Ok(RowValues::Null);
    }
    let bad = |e: &dyn std::fmt::Display| format!("{text:?} is not a valid {sql_type}: {e}");
    let value = match sql_type {
        SqlType::Bit | SqlType::Boolean => {
            RowValues::Bool(text.parse::<bool>().map_err(|e| bad(&e))?)
        }
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => {
            RowValues::Int(text.parse::<i64>().map_err(|e| bad(&e))?)
        }
        SqlType::Real | SqlType::Float | SqlType::Double => {
            RowValues::Float(text.parse::<f64>().map_err(|e| bad(&e))?)
        }
        SqlType::Date => {
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| bad(&e))?;
            RowValues::Timestamp(date.and_time(NaiveTime::MIN))
        }
        SqlType::Time => {
            let time = NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map_err(|e| bad(&e))?;
            RowValues::Timestamp(NaiveDate::MIN.and_time(time))
        }
        SqlType::Timestamp => RowValues::Timestamp(
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
                .map_err(|e| bad(&e))?,
        ),
        SqlType::Json => RowValues::JSON(serde_json::from_str(text).map_err(|e| bad(&e))?),
        SqlType::Binary | SqlType::VarBinary | SqlType::Blob => {
            RowValues::Blob(text.as_bytes().to_vec())
        }
        SqlType::Char
        | SqlType::Varchar
        | SqlType::NVarchar
        | SqlType::LongVarchar
        | SqlType::Other => RowValues::Text(text.to_string()),
    };
    Ok(value)
}

use serde::Serialize;
use serde_json::{Map, Value};
use sproc_middleware::prelude::*;

use crate::args::Args;
#[cfg(feature = "mssql")]
use crate::args::parse_server;

#[derive(Debug, Serialize)]
pub(crate) struct CallOutput {
    rows: Option<Vec<Value>>,
    outputs: Option<Vec<Value>>,
}

fn row_to_json(row: &CustomDbRow) -> Result<Value, SprocError> {
    let mut object = Map::with_capacity(row.len());
    for (name, value) in row.column_names.iter().zip(&row.rows) {
        object.insert(name.clone(), value.to_json());
    }
    Ok(Value::Object(object))
}

fn outputs_to_json(outputs: &OutputParams) -> Result<Vec<Value>, SprocError> {
    Ok(outputs.iter().map(RowValues::to_json).collect())
}

pub(crate) fn build_caller(args: &Args, config: CallerConfig) -> Result<Caller, SprocError> {
    match args.db {
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            Caller::postgres_credentials(&args.url, &args.user, &args.password, config)
        }
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => {
            let (server, port, database) =
                parse_server(&args.url).map_err(SprocError::ConfigError)?;
            let opts = MssqlOptions::new(server, database, args.user.clone(), args.password.clone())
                .with_port(port);
            Ok(Caller::mssql_direct(opts, config))
        }
        #[allow(unreachable_patterns)]
        other => Err(SprocError::ConfigError(format!(
            "{other} support was not compiled in"
        ))),
    }
}

pub(crate) async fn run(args: &Args, caller: &Caller) -> Result<CallOutput, SprocError> {
    let out_types = param_types(&args.outputs);
    let (rows, outputs) = caller
        .call_full(
            &args.proc_name,
            &args.inputs,
            &out_types,
            outputs_to_json,
            row_to_json,
        )
        .await?
        .into_parts();
    Ok(CallOutput { rows, outputs })
}

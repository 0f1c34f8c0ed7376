use std::collections::BTreeMap;

use async_trait::async_trait;
use deadpool_postgres::Object;
use tokio_postgres::types::ToSql;

use super::params::cast_suffix;
use super::query::extract_value;
use crate::driver::{BufferedRows, CallConnection, PreparedCall, RowCursor, captured_output};
use crate::error::SprocError;
use crate::translation::{CallArgument, parse_call_escape};
use crate::types::{RowValues, SqlType};

pub(crate) enum PgClient {
    Pooled(Object),
    Direct(tokio_postgres::Client),
}

impl PgClient {
    fn client(&self) -> &tokio_postgres::Client {
        match self {
            PgClient::Pooled(obj) => obj,
            PgClient::Direct(client) => client,
        }
    }
}

/// A checked-out (or freshly opened) Postgres connection. Dropping it returns it to the pool
/// or closes it.
pub struct PgConnection {
    client: PgClient,
}

impl PgConnection {
    pub(crate) fn new(client: PgClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallConnection for PgConnection {
    async fn prepare_call<'a>(
        &'a mut self,
        sql: &str,
    ) -> Result<Box<dyn PreparedCall + 'a>, SprocError> {
        Ok(Box::new(PgPreparedCall {
            client: self.client.client(),
            sql: sql.to_string(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            output_values: BTreeMap::new(),
        }))
    }
}

/// A procedure call rendered as `CALL name($1::type, NULL::type, …)`.
///
/// Registered outputs are passed as typed NULLs and come back as the single row PostgreSQL
/// returns for a procedure with OUT parameters. Procedures never produce a row-set here.
pub struct PgPreparedCall<'a> {
    client: &'a tokio_postgres::Client,
    sql: String,
    inputs: BTreeMap<usize, (RowValues, SqlType)>,
    outputs: BTreeMap<usize, SqlType>,
    output_values: BTreeMap<usize, RowValues>,
}

/// Renders a `{call …}` escape as the native statement plus the values bound to its `$n`
/// parameters, in order.
fn render_call<'v>(
    sql: &str,
    inputs: &'v BTreeMap<usize, (RowValues, SqlType)>,
    outputs: &BTreeMap<usize, SqlType>,
) -> Result<(String, Vec<&'v RowValues>), SprocError> {
    let escape = parse_call_escape(sql)?;
    let mut args = Vec::with_capacity(escape.arguments.len());
    let mut values = Vec::with_capacity(inputs.len());

    for arg in &escape.arguments {
        match *arg {
            CallArgument::Literal(text) => args.push(text.to_string()),
            CallArgument::Placeholder(idx) => {
                if let Some(ty) = outputs.get(&idx) {
                    args.push(format!("NULL{}", cast_suffix(*ty)));
                } else if let Some((value, ty)) = inputs.get(&idx) {
                    values.push(value);
                    args.push(format!("${}{}", values.len(), cast_suffix(*ty)));
                } else {
                    return Err(SprocError::ParameterError(format!(
                        "parameter {idx} was neither bound nor registered"
                    )));
                }
            }
        }
    }

    Ok((
        format!("CALL {}({})", escape.procedure, args.join(", ")),
        values,
    ))
}

#[async_trait]
impl PreparedCall for PgPreparedCall<'_> {
    fn set_input(
        &mut self,
        index: usize,
        value: &RowValues,
        sql_type: SqlType,
    ) -> Result<(), SprocError> {
        self.inputs.insert(index, (value.clone(), sql_type));
        Ok(())
    }

    fn register_output(&mut self, index: usize, sql_type: SqlType) -> Result<(), SprocError> {
        self.outputs.insert(index, sql_type);
        Ok(())
    }

    async fn execute(&mut self) -> Result<bool, SprocError> {
        let rows = {
            let (native, values) = render_call(&self.sql, &self.inputs, &self.outputs)?;
            let params: Vec<&(dyn ToSql + Sync)> =
                values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect();
            let stmt = self.client.prepare(&native).await?;
            self.client.query(&stmt, &params).await?
        };

        if !self.outputs.is_empty() {
            let row = rows.first().ok_or_else(|| {
                SprocError::ExecutionError("procedure returned no output parameter row".into())
            })?;
            if row.len() < self.outputs.len() {
                return Err(SprocError::ExecutionError(format!(
                    "procedure returned {} output values, {} were registered",
                    row.len(),
                    self.outputs.len()
                )));
            }
            for (col, index) in self.outputs.keys().enumerate() {
                self.output_values.insert(*index, extract_value(row, col)?);
            }
        }

        Ok(false)
    }

    async fn result_set<'a>(&'a mut self) -> Result<Box<dyn RowCursor + 'a>, SprocError> {
        Ok(Box::new(BufferedRows::default()))
    }

    fn output(&self, index: usize) -> Result<RowValues, SprocError> {
        captured_output(&self.output_values, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_become_typed_nulls() {
        let mut inputs = BTreeMap::new();
        inputs.insert(1, (RowValues::Int(42), SqlType::Integer));
        inputs.insert(2, (RowValues::Text("x".into()), SqlType::Varchar));
        let mut outputs = BTreeMap::new();
        outputs.insert(3, SqlType::Integer);
        outputs.insert(4, SqlType::Boolean);
        outputs.insert(5, SqlType::Varchar);

        let (native, values) =
            render_call("{call p_save(?,?,?,?,?)}", &inputs, &outputs).unwrap();
        assert_eq!(
            native,
            "CALL p_save($1::integer, $2::varchar, NULL::integer, NULL::boolean, NULL::varchar)"
        );
        assert_eq!(values, vec![&RowValues::Int(42), &RowValues::Text("x".into())]);
    }

    #[test]
    fn literal_arguments_pass_through() {
        let mut inputs = BTreeMap::new();
        inputs.insert(1, (RowValues::Int(7), SqlType::Other));
        let (native, values) =
            render_call("{call audit('login', ?)}", &inputs, &BTreeMap::new()).unwrap();
        assert_eq!(native, "CALL audit('login', $1)");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn unbound_placeholder_is_rejected() {
        let err = render_call("{call p(?,?)}", &BTreeMap::new(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, SprocError::ParameterError(_)));
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::Level;

use crate::call::CallPlan;
use crate::config::CallerConfig;
use crate::driver::ConnectionSource;
use crate::error::SprocError;
use crate::mapper::{OutputMapper, RowMapper};
use crate::results::OutputParams;
use crate::tuple::CallTuple;
use crate::types::{Param, ParamType, RowValues};

/// Executes stored procedures against a [`ConnectionSource`].
///
/// Every call shape below ends up in the same sequence: acquire a connection, prepare
/// `{call name(?,…)}`, bind inputs, register outputs (and the status pair when enabled),
/// execute, map the row-set, map the output parameters, then check the status code.
///
/// ```rust,no_run
/// use sproc_middleware::prelude::*;
///
/// # async fn demo(caller: Caller) -> Result<(), SprocError> {
/// let names = caller
///     .call_with_params_for_list(
///         "list_users",
///         &params![10_i64 => SqlType::Integer],
///         |row: &CustomDbRow| -> Result<String, SprocError> {
///             Ok(row.get_text("name")?.to_string())
///         },
///     )
///     .await?;
/// # let _ = names;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Caller {
    source: Arc<dyn ConnectionSource>,
    config: CallerConfig,
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("database_type", &self.source.database_type())
            .field("config", &self.config)
            .finish()
    }
}

impl Caller {
    #[must_use]
    pub fn new(source: impl ConnectionSource + 'static, config: CallerConfig) -> Self {
        Self {
            source: Arc::new(source),
            config,
        }
    }

    #[must_use]
    pub fn from_shared(source: Arc<dyn ConnectionSource>, config: CallerConfig) -> Self {
        Self { source, config }
    }

    #[must_use]
    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    /// Call a procedure with no inputs and no outputs.
    ///
    /// # Errors
    /// Driver failures and status failures, see [`Caller::call_full`].
    pub async fn call(&self, proc_name: &str) -> Result<(), SprocError> {
        self.call_with_params(proc_name, &[]).await
    }

    /// Call a procedure with inputs, ignoring any results.
    ///
    /// # Errors
    /// Driver failures and status failures, see [`Caller::call_full`].
    pub async fn call_with_params(
        &self,
        proc_name: &str,
        in_params: &[Param],
    ) -> Result<(), SprocError> {
        self.execute::<(), ()>(proc_name, in_params, &[], None, None)
            .await
            .map(|_| ())
    }

    /// Call a procedure with no inputs and map its row-set.
    ///
    /// # Errors
    /// Driver, mapping, and status failures, see [`Caller::call_full`].
    pub async fn call_for_list<T>(
        &self,
        proc_name: &str,
        row_mapper: impl RowMapper<T>,
    ) -> Result<Vec<T>, SprocError> {
        self.call_with_params_for_list(proc_name, &[], row_mapper)
            .await
    }

    /// Call a procedure with inputs and map its row-set. No row-set yields an empty list.
    ///
    /// # Errors
    /// Driver, mapping, and status failures, see [`Caller::call_full`].
    pub async fn call_with_params_for_list<T>(
        &self,
        proc_name: &str,
        in_params: &[Param],
        mut row_mapper: impl RowMapper<T>,
    ) -> Result<Vec<T>, SprocError> {
        let tuple = self
            .execute::<T, ()>(proc_name, in_params, &[], None, Some(&mut row_mapper))
            .await?;
        Ok(tuple.list.unwrap_or_default())
    }

    /// Call a procedure with no inputs and map its output parameters.
    ///
    /// `out_types` lists the declared outputs only; the status fields are added automatically.
    ///
    /// # Errors
    /// Driver, mapping, and status failures, see [`Caller::call_full`].
    pub async fn call_for_output<U>(
        &self,
        proc_name: &str,
        out_types: &[ParamType],
        output_mapper: impl OutputMapper<U>,
    ) -> Result<U, SprocError> {
        self.call_with_params_for_output(proc_name, &[], out_types, output_mapper)
            .await
    }

    /// Call a procedure with inputs and map its output parameters.
    ///
    /// # Errors
    /// `SprocError::ParameterError` if `out_types` is empty; the procedure is not called.
    /// Otherwise driver, mapping, and status failures, see [`Caller::call_full`].
    pub async fn call_with_params_for_output<U>(
        &self,
        proc_name: &str,
        in_params: &[Param],
        out_types: &[ParamType],
        mut output_mapper: impl OutputMapper<U>,
    ) -> Result<U, SprocError> {
        if out_types.is_empty() {
            return Err(SprocError::ParameterError(format!(
                "{proc_name}: an output mapper needs at least one declared output type"
            )));
        }
        let tuple = self
            .execute::<(), U>(
                proc_name,
                in_params,
                out_types,
                Some(&mut output_mapper),
                None,
            )
            .await?;
        tuple.object.ok_or_else(|| {
            SprocError::MappingError(format!("output mapper for {proc_name} produced no value"))
        })
    }

    /// Call a procedure, mapping both its row-set and its output parameters.
    ///
    /// The row-set is read only if the procedure produced one. The output mapper runs exactly
    /// once when `out_types` is non-empty and never otherwise, leaving `object` as `None`. When status fields are enabled and the returned code differs from the configured
    /// success code, `SprocError::Status` is returned and anything already mapped is discarded.
    ///
    /// # Errors
    /// Returns driver errors unchanged, mapper errors as returned by the mapper, and
    /// `SprocError::Status` for a non-success status code.
    pub async fn call_full<T, U>(
        &self,
        proc_name: &str,
        in_params: &[Param],
        out_types: &[ParamType],
        mut output_mapper: impl OutputMapper<U>,
        mut row_mapper: impl RowMapper<T>,
    ) -> Result<CallTuple<T, U>, SprocError> {
        self.execute::<T, U>(
            proc_name,
            in_params,
            out_types,
            Some(&mut output_mapper),
            Some(&mut row_mapper),
        )
        .await
    }

    /// Start a fluent call.
    ///
    /// ```rust,no_run
    /// use sproc_middleware::prelude::*;
    ///
    /// # async fn demo(caller: Caller) -> Result<(), SprocError> {
    /// let (rows, total) = caller
    ///     .procedure("search_orders")
    ///     .param(Param::of("open", SqlType::Varchar))
    ///     .outputs(param_types(&[SqlType::BigInt]), |out: &OutputParams| out.get_int(1))
    ///     .map_rows(|row: &CustomDbRow| row.get_int("order_id"))
    ///     .execute()
    ///     .await?
    ///     .into_parts();
    /// # let _ = (rows, total);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn procedure<'c>(&'c self, proc_name: &'c str) -> ProcedureCall<'c> {
        ProcedureCall {
            caller: self,
            proc_name,
            in_params: Vec::new(),
            output: None,
            rows: None,
        }
    }

    async fn execute<T, U>(
        &self,
        proc_name: &str,
        in_params: &[Param],
        out_types: &[ParamType],
        output_mapper: Option<&mut (dyn OutputMapper<U> + '_)>,
        row_mapper: Option<&mut (dyn RowMapper<T> + '_)>,
    ) -> Result<CallTuple<T, U>, SprocError> {
        let start = Instant::now();
        let plan = CallPlan::new(
            proc_name,
            in_params,
            out_types,
            self.config.use_status_fields(),
        );

        let outcome = self.run(&plan, output_mapper, row_mapper).await;

        if let Err(err) = &outcome
            && !err.is_status()
        {
            tracing::error!(statement = %plan.sql, error = %err, "procedure call failed");
        }
        self.log_call(start, &plan, in_params, out_types, &outcome);
        outcome
    }

    // Connection, statement and row cursor are locals: they drop in reverse order on every
    // return path, including `?`.
    async fn run<T, U>(
        &self,
        plan: &CallPlan,
        output_mapper: Option<&mut (dyn OutputMapper<U> + '_)>,
        row_mapper: Option<&mut (dyn RowMapper<T> + '_)>,
    ) -> Result<CallTuple<T, U>, SprocError> {
        let mut conn = self.source.acquire().await?;
        let mut stmt = conn.prepare_call(&plan.sql).await?;

        plan.apply(stmt.as_mut())?;
        let has_result = stmt.execute().await?;

        let list = match row_mapper {
            Some(mapper) if has_result => {
                tracing::debug!("reading result set");
                let mut rows = stmt.result_set().await?;
                let mut list = Vec::new();
                while let Some(row) = rows.next_row().await? {
                    list.push(mapper.map(&row)?);
                }
                Some(list)
            }
            _ => None,
        };

        // Outputs are read only when both declared types and a mapper were given.
        let object = match output_mapper {
            Some(mapper) if plan.layout.outputs > 0 => {
                let outputs = OutputParams::read(stmt.as_ref(), &plan.layout)?;
                tracing::debug!(outputs = ?outputs, "read output parameters");
                Some(mapper.map(&outputs)?)
            }
            _ => None,
        };

        if let (Some(code_pos), Some(message_pos)) = (
            plan.layout.status_code_position(),
            plan.layout.status_message_position(),
        ) {
            let code = status_code(&stmt.output(code_pos)?)?;
            if code != self.config.success_code() {
                let message = status_message(stmt.output(message_pos)?);
                return Err(SprocError::Status { code, message });
            }
        }

        Ok(CallTuple::new(list, object))
    }

    fn log_call<T, U>(
        &self,
        start: Instant,
        plan: &CallPlan,
        in_params: &[Param],
        out_types: &[ParamType],
        outcome: &Result<CallTuple<T, U>, SprocError>,
    ) {
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        if tracing::enabled!(Level::DEBUG) {
            let (rows, has_output, error) = match outcome {
                Ok(tuple) => (
                    tuple.list.as_ref().map(Vec::len),
                    tuple.object.is_some(),
                    None,
                ),
                Err(err) => (None, false, Some(err.to_string())),
            };
            tracing::debug!(
                statement = %plan.sql,
                backend = ?self.source.database_type(),
                in_params = %join(in_params),
                out_types = %join(out_types),
                rows = ?rows,
                has_output,
                error = ?error,
                elapsed_ms,
                "call sp"
            );
        } else {
            tracing::info!(statement = %plan.sql, elapsed_ms, "call sp");
        }
    }
}

fn join<D: fmt::Display>(items: &[D]) -> String {
    let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// Read the status code slot. Drivers hand back a bit/boolean, an integer, or text; NULL
/// reads as 0.
fn status_code(value: &RowValues) -> Result<i16, SprocError> {
    match value {
        RowValues::Bool(b) => Ok(i16::from(*b)),
        RowValues::Int(i) => i16::try_from(*i).map_err(|_| {
            SprocError::ExecutionError(format!("status code {i} does not fit a short"))
        }),
        RowValues::Null => Ok(0),
        RowValues::Text(s) => s.trim().parse::<i16>().map_err(|_| {
            SprocError::ExecutionError(format!("status code {s:?} is not numeric"))
        }),
        other => Err(SprocError::ExecutionError(format!(
            "status code has unexpected value {other:?}"
        ))),
    }
}

fn status_message(value: RowValues) -> String {
    match value {
        RowValues::Text(s) => s,
        RowValues::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fluent form of [`Caller::call_full`]; see [`Caller::procedure`].
pub struct ProcedureCall<'c, T = (), U = ()> {
    caller: &'c Caller,
    proc_name: &'c str,
    in_params: Vec<Param>,
    output: Option<(Vec<ParamType>, Box<dyn OutputMapper<U> + 'c>)>,
    rows: Option<Box<dyn RowMapper<T> + 'c>>,
}

impl<'c, T, U> ProcedureCall<'c, T, U> {
    /// Replace the input parameters.
    #[must_use]
    pub fn params(mut self, in_params: Vec<Param>) -> Self {
        self.in_params = in_params;
        self
    }

    /// Append one input parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.in_params.push(param);
        self
    }

    /// Declare output parameters and how to map them.
    #[must_use]
    pub fn outputs<U2>(
        self,
        out_types: Vec<ParamType>,
        mapper: impl OutputMapper<U2> + 'c,
    ) -> ProcedureCall<'c, T, U2> {
        ProcedureCall {
            caller: self.caller,
            proc_name: self.proc_name,
            in_params: self.in_params,
            output: Some((out_types, Box::new(mapper))),
            rows: self.rows,
        }
    }

    /// Map each row of the procedure's row-set.
    #[must_use]
    pub fn map_rows<T2>(self, mapper: impl RowMapper<T2> + 'c) -> ProcedureCall<'c, T2, U> {
        ProcedureCall {
            caller: self.caller,
            proc_name: self.proc_name,
            in_params: self.in_params,
            output: self.output,
            rows: Some(Box::new(mapper)),
        }
    }

    /// # Errors
    /// See [`Caller::call_full`].
    pub async fn execute(self) -> Result<CallTuple<T, U>, SprocError> {
        let ProcedureCall {
            caller,
            proc_name,
            in_params,
            mut output,
            mut rows,
        } = self;

        let (out_types, output_mapper) = match output.as_mut() {
            Some((types, mapper)) => (types.as_slice(), Some(mapper.as_mut())),
            None => (&[][..], None),
        };
        caller
            .execute(
                proc_name,
                &in_params,
                out_types,
                output_mapper,
                rows.as_deref_mut(),
            )
            .await
    }
}

impl<T, U> fmt::Debug for ProcedureCall<'_, T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureCall")
            .field("proc_name", &self.proc_name)
            .field("in_params", &self.in_params)
            .field("outputs", &self.output.as_ref().map(|(types, _)| types))
            .field("map_rows", &self.rows.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_conversions() {
        assert_eq!(status_code(&RowValues::Bool(false)).unwrap(), 0);
        assert_eq!(status_code(&RowValues::Bool(true)).unwrap(), 1);
        assert_eq!(status_code(&RowValues::Int(-3)).unwrap(), -3);
        assert_eq!(status_code(&RowValues::Null).unwrap(), 0);
        assert_eq!(status_code(&RowValues::Text(" 7 ".into())).unwrap(), 7);
        assert!(status_code(&RowValues::Int(100_000)).is_err());
        assert!(status_code(&RowValues::Float(1.0)).is_err());
    }

    #[test]
    fn status_message_conversions() {
        assert_eq!(status_message(RowValues::Text("dup".into())), "dup");
        assert_eq!(status_message(RowValues::Null), "");
        assert_eq!(status_message(RowValues::Int(4)), "4");
    }
}

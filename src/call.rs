//! Call-statement text and the positional binding plan applied to a [`PreparedCall`].

use std::collections::BTreeMap;

use crate::driver::PreparedCall;
use crate::error::SprocError;
use crate::types::{Param, ParamType, RowValues, SqlType};

/// Number of trailing output slots reserved by the status-field convention.
pub const NUM_OF_STATUS_FIELDS: usize = 2;

/// `{call name(?,?,…)}` with `count` placeholders. The name is not validated.
#[must_use]
pub fn create_callable_string(proc_name: &str, count: usize) -> String {
    let placeholders = vec!["?"; count].join(",");
    format!("{{call {proc_name}({placeholders})}}")
}

/// Positions of every parameter group in a call: inputs, then outputs, then the status pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLayout {
    pub inputs: usize,
    pub outputs: usize,
    pub status_fields: bool,
}

impl CallLayout {
    #[must_use]
    pub fn new(inputs: usize, outputs: usize, status_fields: bool) -> Self {
        Self {
            inputs,
            outputs,
            status_fields,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.inputs + self.outputs + if self.status_fields { NUM_OF_STATUS_FIELDS } else { 0 }
    }

    #[must_use]
    pub fn input_position(&self, i: usize) -> usize {
        i + 1
    }

    #[must_use]
    pub fn output_position(&self, i: usize) -> usize {
        self.inputs + i + 1
    }

    /// Offset added to a 1-based declared-output index to get its statement position.
    #[must_use]
    pub fn output_offset(&self) -> usize {
        self.inputs
    }

    /// Position of the status code slot (the message follows it).
    #[must_use]
    pub fn status_code_position(&self) -> Option<usize> {
        self.status_fields.then_some(self.inputs + self.outputs + 1)
    }

    #[must_use]
    pub fn status_message_position(&self) -> Option<usize> {
        self.status_code_position().map(|p| p + 1)
    }
}

/// One positional binding instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Input { value: RowValues, sql_type: SqlType },
    Output { sql_type: SqlType },
}

/// Statement text plus the bindings to apply to it, keyed by 1-based position.
#[derive(Debug, Clone)]
pub struct CallPlan {
    pub sql: String,
    pub layout: CallLayout,
    bindings: BTreeMap<usize, Binding>,
}

impl CallPlan {
    #[must_use]
    pub fn new(
        proc_name: &str,
        in_params: &[Param],
        out_types: &[ParamType],
        status_fields: bool,
    ) -> Self {
        let layout = CallLayout::new(in_params.len(), out_types.len(), status_fields);
        let mut bindings = BTreeMap::new();

        for (i, param) in in_params.iter().enumerate() {
            bindings.insert(
                layout.input_position(i),
                Binding::Input {
                    value: param.value.clone(),
                    sql_type: param.sql_type,
                },
            );
        }
        for (i, ty) in out_types.iter().enumerate() {
            bindings.insert(
                layout.output_position(i),
                Binding::Output {
                    sql_type: ty.sql_type,
                },
            );
        }
        if let (Some(code), Some(message)) =
            (layout.status_code_position(), layout.status_message_position())
        {
            bindings.insert(
                code,
                Binding::Output {
                    sql_type: SqlType::Boolean,
                },
            );
            bindings.insert(
                message,
                Binding::Output {
                    sql_type: SqlType::Varchar,
                },
            );
        }

        Self {
            sql: create_callable_string(proc_name, layout.total()),
            layout,
            bindings,
        }
    }

    /// Bindings in position order.
    pub fn bindings(&self) -> impl Iterator<Item = (usize, &Binding)> {
        self.bindings.iter().map(|(idx, b)| (*idx, b))
    }

    /// Bind inputs and register outputs on a prepared statement, in position order.
    ///
    /// # Errors
    /// Returns whatever the statement reports for a rejected binding.
    pub fn apply(&self, stmt: &mut dyn PreparedCall) -> Result<(), SprocError> {
        for (index, binding) in self.bindings() {
            match binding {
                Binding::Input { value, sql_type } => stmt.set_input(index, value, *sql_type)?,
                Binding::Output { sql_type } => stmt.register_output(index, *sql_type)?,
            }
        }
        Ok(())
    }
}

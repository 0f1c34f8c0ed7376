//! Row and output-parameter mappers.
//!
//! Closures work directly:
//! ```rust
//! use sproc_middleware::prelude::*;
//!
//! fn takes_row_mapper<T>(_m: impl RowMapper<T>) {}
//! fn takes_output_mapper<U>(_m: impl OutputMapper<U>) {}
//!
//! takes_row_mapper(|row: &CustomDbRow| row.get_int("id"));
//! takes_output_mapper(|out: &OutputParams| -> Result<Option<String>, SprocError> {
//!     Ok(out.get_text(1)?.map(str::to_owned))
//! });
//! ```

use crate::error::SprocError;
use crate::results::{CustomDbRow, OutputParams};

/// Produces one `T` per row of a procedure's row-set.
pub trait RowMapper<T>: Send {
    /// # Errors
    /// Any error aborts the call and is returned to the caller.
    fn map(&mut self, row: &CustomDbRow) -> Result<T, SprocError>;
}

impl<T, F> RowMapper<T> for F
where
    F: FnMut(&CustomDbRow) -> Result<T, SprocError> + Send,
{
    fn map(&mut self, row: &CustomDbRow) -> Result<T, SprocError> {
        self(row)
    }
}

/// Produces one `U` from a call's declared output parameters.
pub trait OutputMapper<U>: Send {
    /// # Errors
    /// Any error aborts the call and is returned to the caller.
    fn map(&mut self, outputs: &OutputParams) -> Result<U, SprocError>;
}

impl<U, F> OutputMapper<U> for F
where
    F: FnMut(&OutputParams) -> Result<U, SprocError> + Send,
{
    fn map(&mut self, outputs: &OutputParams) -> Result<U, SprocError> {
        self(outputs)
    }
}

use chrono::NaiveDateTime;

use super::row::mismatch;
use crate::call::CallLayout;
use crate::driver::PreparedCall;
use crate::error::SprocError;
use crate::types::RowValues;

/// Declared output parameters of an executed call, handed to an output mapper.
///
/// Indexes are 1-based over the declared outputs only: `get(1)` is the first output
/// parameter, whatever number of inputs precede it in the statement. The status fields
/// are not part of this view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputParams {
    values: Vec<RowValues>,
}

impl OutputParams {
    #[must_use]
    pub fn new(values: Vec<RowValues>) -> Self {
        Self { values }
    }

    /// Read every declared output slot of `layout` from an executed statement.
    pub(crate) fn read(stmt: &dyn PreparedCall, layout: &CallLayout) -> Result<Self, SprocError> {
        let values = (0..layout.outputs)
            .map(|i| stmt.output(layout.output_position(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// # Errors
    /// Returns `SprocError::MappingError` if `index` is 0 or past the last declared output.
    pub fn get(&self, index: usize) -> Result<&RowValues, SprocError> {
        index
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| {
                SprocError::MappingError(format!(
                    "output parameter {index} out of range (1..={})",
                    self.values.len()
                ))
            })
    }

    /// # Errors
    /// Returns `SprocError::MappingError` on a bad index or a non-integer value.
    pub fn get_int(&self, index: usize) -> Result<i64, SprocError> {
        let value = self.get(index)?;
        value.as_int().copied().ok_or_else(|| mismatch(&label(index), "integer", value))
    }

    /// NULL reads as `None`.
    ///
    /// # Errors
    /// Returns `SprocError::MappingError` on a bad index or a non-text value.
    pub fn get_text(&self, index: usize) -> Result<Option<&str>, SprocError> {
        let value = self.get(index)?;
        if value.is_null() {
            return Ok(None);
        }
        value.as_text().map(Some).ok_or_else(|| mismatch(&label(index), "text", value))
    }

    /// # Errors
    /// Returns `SprocError::MappingError` on a bad index or a non-boolean value.
    pub fn get_bool(&self, index: usize) -> Result<bool, SprocError> {
        let value = self.get(index)?;
        value.as_bool().copied().ok_or_else(|| mismatch(&label(index), "boolean", value))
    }

    /// # Errors
    /// Returns `SprocError::MappingError` on a bad index or a non-numeric value.
    pub fn get_float(&self, index: usize) -> Result<f64, SprocError> {
        let value = self.get(index)?;
        value.as_float().ok_or_else(|| mismatch(&label(index), "float", value))
    }

    /// # Errors
    /// Returns `SprocError::MappingError` on a bad index or a value that is not a timestamp.
    pub fn get_timestamp(&self, index: usize) -> Result<NaiveDateTime, SprocError> {
        let value = self.get(index)?;
        value.as_timestamp().ok_or_else(|| mismatch(&label(index), "timestamp", value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowValues> {
        self.values.iter()
    }
}

fn label(index: usize) -> String {
    format!("output parameter {index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_based_typed_access() {
        let out = OutputParams::new(vec![
            RowValues::Int(5),
            RowValues::Null,
            RowValues::Bool(true),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out.get_int(1).unwrap(), 5);
        assert_eq!(out.get_text(2).unwrap(), None);
        assert!(out.get_bool(3).unwrap());
        assert_eq!(out.get_float(1).unwrap(), 5.0);
        assert!(matches!(out.get(0), Err(SprocError::MappingError(_))));
        assert!(matches!(out.get(4), Err(SprocError::MappingError(_))));
        assert!(matches!(out.get_text(1), Err(SprocError::MappingError(_))));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SprocError;
use crate::types::RowValues;

/// A row from a procedure's row-set
///
/// This struct represents a single row handed to a row mapper,
/// with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    // Shared name -> index lookup, built once per result set
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

pub(crate) fn build_index(column_names: &[String]) -> Arc<HashMap<String, usize>> {
    Arc::new(
        column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect(),
    )
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `rows` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = build_index(&column_names);
        Self {
            column_names,
            rows,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        // Drivers differ on identifier case; fall back to a case-insensitive scan
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by 0-based column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Get a column that must exist.
    ///
    /// # Errors
    /// Returns `SprocError::MappingError` if the column is missing.
    pub fn try_get(&self, column_name: &str) -> Result<&RowValues, SprocError> {
        self.get(column_name)
            .ok_or_else(|| SprocError::MappingError(format!("no column named {column_name}")))
    }

    /// # Errors
    /// Returns `SprocError::MappingError` if the column is missing or not an integer.
    pub fn get_int(&self, column_name: &str) -> Result<i64, SprocError> {
        let value = self.try_get(column_name)?;
        value.as_int().copied().ok_or_else(|| mismatch(column_name, "integer", value))
    }

    /// # Errors
    /// Returns `SprocError::MappingError` if the column is missing or not text.
    pub fn get_text(&self, column_name: &str) -> Result<&str, SprocError> {
        let value = self.try_get(column_name)?;
        value.as_text().ok_or_else(|| mismatch(column_name, "text", value))
    }

    /// # Errors
    /// Returns `SprocError::MappingError` if the column is missing or not a boolean.
    pub fn get_bool(&self, column_name: &str) -> Result<bool, SprocError> {
        let value = self.try_get(column_name)?;
        value.as_bool().copied().ok_or_else(|| mismatch(column_name, "boolean", value))
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub(crate) fn mismatch(what: &str, expected: &str, found: &RowValues) -> SprocError {
    SprocError::MappingError(format!("{what}: expected {expected}, found {found:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index() {
        let names = Arc::new(vec!["id".to_string(), "Name".to_string()]);
        let row = CustomDbRow::new(names, vec![RowValues::Int(7), RowValues::Text("a".into())]);
        assert_eq!(row.get_int("id").unwrap(), 7);
        assert_eq!(row.get_text("name").unwrap(), "a");
        assert_eq!(row.get_by_index(1), Some(&RowValues::Text("a".into())));
        assert!(matches!(row.get_text("id"), Err(SprocError::MappingError(_))));
        assert!(row.try_get("missing").is_err());
    }
}

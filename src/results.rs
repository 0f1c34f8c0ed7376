mod output;
mod result_set;
mod row;

pub use output::OutputParams;
pub use result_set::ResultSet;
pub use row::CustomDbRow;

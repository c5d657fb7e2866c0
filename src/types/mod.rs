mod raw_sql;
mod row;
mod scan;
mod sql_value;

pub use raw_sql::Sql;
pub use row::Row;
pub use scan::{scan_values, ScanDest};
pub use sql_value::SqlValue;

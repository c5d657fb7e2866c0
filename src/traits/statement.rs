use crate::error::Result;
use crate::types::SqlValue;

/// A producer of a query text and its positional arguments.
///
/// This is the only thing the dispatch helpers need from a statement
/// builder. An `Err` means the statement could not be rendered; the helpers
/// return it before any client is called.
pub trait ToStatement {
    fn to_statement(&self) -> Result<(String, Vec<SqlValue>)>;
}

impl ToStatement for str {
    fn to_statement(&self) -> Result<(String, Vec<SqlValue>)> {
        Ok((self.to_string(), Vec::new()))
    }
}

impl ToStatement for String {
    fn to_statement(&self) -> Result<(String, Vec<SqlValue>)> {
        self.as_str().to_statement()
    }
}

impl<T: ToStatement + ?Sized> ToStatement for &T {
    fn to_statement(&self) -> Result<(String, Vec<SqlValue>)> {
        (**self).to_statement()
    }
}

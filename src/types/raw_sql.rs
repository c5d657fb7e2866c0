use crate::error::{Result, SqlRunError};
use crate::traits::ToStatement;
use crate::types::SqlValue;

/// A hand-written statement: query text plus positional arguments.
///
/// # Example
/// ```
/// use sqlrun::traits::ToStatement;
/// use sqlrun::types::{Sql, SqlValue};
///
/// let stmt = Sql::new("SELECT id, name FROM t WHERE id = $1").bind(7);
/// let (query, args) = stmt.to_statement().unwrap();
/// assert_eq!(query, "SELECT id, name FROM t WHERE id = $1");
/// assert_eq!(args, vec![SqlValue::Int32(7)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    text: String,
    args: Vec<SqlValue>,
}

impl Sql {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            args: Vec::new(),
        }
    }

    /// Append the next positional argument.
    pub fn bind<V: Into<SqlValue>>(mut self, value: V) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_args(text: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }
}

impl ToStatement for Sql {
    fn to_statement(&self) -> Result<(String, Vec<SqlValue>)> {
        if self.text.trim().is_empty() {
            return Err(SqlRunError::build("query text is empty"));
        }
        Ok((self.text.clone(), self.args.clone()))
    }
}

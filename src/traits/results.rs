use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{Result, SqlRunError};
use crate::types::ScanDest;

/// Forward-only cursor over the rows a query produced.
///
/// A cursor starts unpositioned; [`Rows::advance`] moves it onto each row in
/// turn and returns `false` once the rows are exhausted. [`Rows::scan`] is only
/// valid while positioned on a row. A cursor is driven by a single caller and
/// should be closed when no longer needed.
#[async_trait]
pub trait Rows: Send {
    /// Move to the next row. Returns `false` when no row is left or the
    /// iteration failed; check [`Rows::err`] afterwards.
    async fn advance(&mut self) -> bool;

    /// Copy the current row's values into `dest`, in column order.
    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()>;

    /// Column names, in result order.
    fn columns(&self) -> Result<Vec<String>>;

    /// The error that ended iteration, if any.
    fn err(&self) -> Option<&SqlRunError>;

    fn close(&mut self);
}

/// Extracts the values of exactly one row.
pub trait RowScanner: Send {
    fn scan(self: Box<Self>, dest: &mut [&mut dyn ScanDest]) -> Result<()>;
}

/// Outcome of a statement that returns no rows.
pub trait ExecOutcome: Send + Sync + Debug {
    fn rows_affected(&self) -> Result<u64>;

    /// Identifier generated by the last insert. Clients without such a
    /// concept return [`SqlRunError::Unsupported`], never a bare zero.
    fn last_insert_id(&self) -> Result<i64>;
}

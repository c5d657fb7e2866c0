use crate::error::{Result, SqlRunError};
use crate::traits::RowScanner;
use crate::types::ScanDest;

/// Single-row result returned by every query-row capability.
///
/// A `Row` is always returned, even when the query could not be run; in that
/// case it carries the error and reports it from [`Row::scan`].
pub struct Row {
    state: RowState,
}

enum RowState {
    Bound(Box<dyn RowScanner>),
    Failed(SqlRunError),
}

impl Row {
    /// Wrap a client's native single-row scanner.
    pub fn new<S: RowScanner + 'static>(scanner: S) -> Self {
        Self {
            state: RowState::Bound(Box::new(scanner)),
        }
    }

    /// A row whose scan reports `err` without touching any client.
    pub fn failed(err: SqlRunError) -> Self {
        Self {
            state: RowState::Failed(err),
        }
    }

    /// Returns true if this row already carries an error.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, RowState::Failed(_))
    }

    /// Copy the row's values into `dest`, in column order.
    pub fn scan(self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match self.state {
            RowState::Bound(scanner) => scanner.scan(dest),
            RowState::Failed(err) => Err(err),
        }
    }
}

impl RowScanner for Row {
    fn scan(self: Box<Self>, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        Row::scan(*self, dest)
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            RowState::Bound(_) => f.write_str("Row(bound)"),
            RowState::Failed(err) => write!(f, "Row(failed: {})", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{scan_values, SqlValue};

    struct Fixed(Vec<SqlValue>);

    impl RowScanner for Fixed {
        fn scan(self: Box<Self>, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
            scan_values(&self.0, dest)
        }
    }

    #[test]
    fn test_bound_row_scans_native_values() {
        let row = Row::new(Fixed(vec![SqlValue::Int64(7)]));
        assert!(!row.is_failed());

        let mut id = 0i64;
        row.scan(&mut [&mut id]).unwrap();
        assert_eq!(id, 7);
    }

    #[test]
    fn test_failed_row_defers_error_to_scan() {
        let row = Row::failed(SqlRunError::build("missing table"));
        assert!(row.is_failed());

        let mut id = 0i64;
        let err = row.scan(&mut [&mut id]).unwrap_err();
        assert!(matches!(err, SqlRunError::Build(ref msg) if msg == "missing table"));
        assert_eq!(id, 0);
    }
}

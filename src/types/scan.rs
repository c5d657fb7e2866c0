use crate::error::{Result, SqlRunError};
use crate::types::SqlValue;

/// A caller-supplied destination that a column value can be scanned into.
///
/// Destinations are passed to `scan` as `&mut [&mut dyn ScanDest]`, one per
/// column, in column order:
///
/// ```
/// use sqlrun::types::{scan_values, SqlValue};
///
/// let values = vec![SqlValue::Int64(7), SqlValue::Text("a".into())];
/// let mut id = 0i64;
/// let mut name = String::new();
/// scan_values(&values, &mut [&mut id, &mut name]).unwrap();
/// assert_eq!((id, name.as_str()), (7, "a"));
/// ```
pub trait ScanDest {
    /// Store `value`, read from column index `column`, into this destination.
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()>;
}

/// Copy one row's values into `dest`, checking arity first.
///
/// Shared by the bundled clients as their native scan.
pub fn scan_values(values: &[SqlValue], dest: &mut [&mut dyn ScanDest]) -> Result<()> {
    if values.len() != dest.len() {
        return Err(SqlRunError::ScanArity {
            expected: values.len(),
            actual: dest.len(),
        });
    }
    for (column, (value, target)) in values.iter().zip(dest.iter_mut()).enumerate() {
        target.assign(column, value)?;
    }
    Ok(())
}

fn mismatch(column: usize, value: &SqlValue, target: &'static str) -> SqlRunError {
    SqlRunError::ScanType {
        column,
        value: value.kind(),
        target,
    }
}

impl ScanDest for SqlValue {
    fn assign(&mut self, _column: usize, value: &SqlValue) -> Result<()> {
        *self = value.clone();
        Ok(())
    }
}

impl ScanDest for i64 {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        *self = match value {
            SqlValue::Int64(v) => *v,
            SqlValue::Int32(v) => i64::from(*v),
            _ => return Err(mismatch(column, value, "i64")),
        };
        Ok(())
    }
}

impl ScanDest for i32 {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        *self = match value {
            SqlValue::Int32(v) => *v,
            SqlValue::Int64(v) => i32::try_from(*v).map_err(|_| mismatch(column, value, "i32"))?,
            _ => return Err(mismatch(column, value, "i32")),
        };
        Ok(())
    }
}

impl ScanDest for f64 {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        *self = match value {
            SqlValue::Float64(v) => *v,
            SqlValue::Int32(v) => f64::from(*v),
            SqlValue::Int64(v) => {
                let f = *v as f64;
                // above 2^53 not every integer has an exact f64
                if f as i128 != i128::from(*v) {
                    return Err(mismatch(column, value, "f64"));
                }
                f
            }
            _ => return Err(mismatch(column, value, "f64")),
        };
        Ok(())
    }
}

impl ScanDest for bool {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        // SQLite has no boolean storage class and stores 0/1 integers
        *self = match value {
            SqlValue::Bool(v) => *v,
            SqlValue::Int32(v) => *v != 0,
            SqlValue::Int64(v) => *v != 0,
            _ => return Err(mismatch(column, value, "bool")),
        };
        Ok(())
    }
}

impl ScanDest for String {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        *self = match value {
            SqlValue::Text(v) => v.clone(),
            SqlValue::Int32(v) => v.to_string(),
            SqlValue::Int64(v) => v.to_string(),
            SqlValue::Float64(v) => v.to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::Bytes(v) => {
                String::from_utf8(v.clone()).map_err(|_| mismatch(column, value, "String"))?
            }
            SqlValue::Null => return Err(mismatch(column, value, "String")),
        };
        Ok(())
    }
}

impl ScanDest for Vec<u8> {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        *self = match value {
            SqlValue::Bytes(v) => v.clone(),
            SqlValue::Text(v) => v.as_bytes().to_vec(),
            _ => return Err(mismatch(column, value, "Vec<u8>")),
        };
        Ok(())
    }
}

impl<T: ScanDest + Default> ScanDest for Option<T> {
    fn assign(&mut self, column: usize, value: &SqlValue) -> Result<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.assign(column, value)?;
        *self = Some(inner);
        Ok(())
    }
}

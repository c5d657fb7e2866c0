//! Standard-family client backed by rusqlite.
//!
//! rusqlite is blocking, so every call runs on tokio's blocking pool against a
//! connection shared behind a mutex. Results are buffered before the cursor is
//! handed back.
//!
//! A context-qualified call that is abandoned before it reaches the connection
//! never runs. One abandoned while its statement is running interrupts that
//! statement, and only that one; SQLite rolls the statement back.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, InterruptHandle, OpenFlags, ToSql};
use tracing::debug;

use crate::context::Context;
use crate::drivers::standard::{StandardClient, StandardRows};
use crate::error::{Result, SqlRunError};
use crate::traits::{ExecOutcome, RowScanner};
use crate::types::{scan_values, ScanDest, SqlValue};

/// SQLite database connection
pub struct SqliteClient {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

impl SqliteClient {
    /// Open a SQLite database.
    ///
    /// `path` is `:memory:` for an in-memory database, or a file path,
    /// optionally prefixed with `sqlite://` or `sqlite:`.
    pub fn open(path: &str) -> Result<Self> {
        let path = normalize_path(path);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
            Connection::open_with_flags(path, flags)?
        };
        Ok(Self::from_connection(conn))
    }

    /// Use an already opened connection.
    pub fn from_connection(conn: Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        }
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await?
    }

    async fn call_context<T, F>(&self, ctx: &Context, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let call = Arc::new(ContextCall::new(ctx.clone()));
        let worker = Arc::clone(&call);
        let interrupt = Arc::clone(&self.interrupt);
        ctx.run_or_abort(
            self.call(move |conn| worker.run(|| f(conn))),
            move || call.abandon(&interrupt),
        )
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Queued,
    Running,
    Finished,
    Abandoned,
}

/// Tracks one context-qualified call so that abandoning it only ever touches
/// its own statement.
struct ContextCall {
    ctx: Context,
    state: Mutex<CallState>,
}

impl ContextCall {
    fn new(ctx: Context) -> Self {
        Self {
            ctx,
            state: Mutex::new(CallState::Queued),
        }
    }

    /// Runs `f` while the connection lock is held, unless the call was
    /// abandoned or its context finished while it waited for the lock.
    fn run<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        {
            let mut state = self.state.lock();
            if *state == CallState::Abandoned {
                return Err(self.ctx.err().unwrap_or(SqlRunError::Canceled));
            }
            if let Some(err) = self.ctx.err() {
                *state = CallState::Abandoned;
                return Err(err);
            }
            *state = CallState::Running;
        }
        let result = f();
        *self.state.lock() = CallState::Finished;
        result
    }

    fn abandon(&self, interrupt: &InterruptHandle) {
        let mut state = self.state.lock();
        match *state {
            // the state lock keeps the statement from finishing, so the
            // connection is still busy with this call's statement
            CallState::Running => {
                debug!("interrupting in-flight sqlite statement");
                interrupt.interrupt();
            }
            CallState::Queued => debug!("dropping queued sqlite statement"),
            CallState::Finished | CallState::Abandoned => {}
        }
        *state = CallState::Abandoned;
    }
}

fn exec_sync(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<SqliteResult> {
    let mut stmt = conn.prepare(sql)?;
    // step to completion so RETURNING statements finish their write
    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
    while rows.next()?.is_some() {}
    drop(rows);

    Ok(SqliteResult {
        rows_affected: conn.changes() as u64,
        last_insert_id: conn.last_insert_rowid(),
    })
}

fn query_sync(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<SqliteRows> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let column_count = columns.len();

    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
    let mut buffered = VecDeque::new();
    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|i| row.get_ref(i).map(from_value_ref))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        buffered.push_back(values);
    }

    Ok(SqliteRows {
        columns,
        pending: buffered,
        current: None,
        closed: false,
    })
}

fn query_row_sync(conn: &Connection, sql: &str, args: &[SqlValue]) -> Result<Option<Vec<SqlValue>>> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query(rusqlite::params_from_iter(args.iter()))?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let values = (0..column_count)
        .map(|i| row.get_ref(i).map(from_value_ref))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(values))
}

#[async_trait]
impl StandardClient for SqliteClient {
    type Rows = SqliteRows;
    type Row = SqliteRow;
    type Outcome = SqliteResult;

    async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<SqliteResult> {
        let (sql, args) = (query.to_string(), args.to_vec());
        self.call(move |conn| exec_sync(conn, &sql, &args)).await
    }

    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<SqliteResult> {
        let (sql, args) = (query.to_string(), args.to_vec());
        self.call_context(ctx, move |conn| exec_sync(conn, &sql, &args))
            .await
    }

    async fn query(&self, query: &str, args: &[SqlValue]) -> Result<SqliteRows> {
        let (sql, args) = (query.to_string(), args.to_vec());
        self.call(move |conn| query_sync(conn, &sql, &args)).await
    }

    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<SqliteRows> {
        let (sql, args) = (query.to_string(), args.to_vec());
        self.call_context(ctx, move |conn| query_sync(conn, &sql, &args))
            .await
    }

    async fn query_row(&self, query: &str, args: &[SqlValue]) -> SqliteRow {
        let (sql, args) = (query.to_string(), args.to_vec());
        let result = self
            .call(move |conn| query_row_sync(conn, &sql, &args))
            .await;
        SqliteRow { result }
    }

    async fn query_row_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> SqliteRow {
        let (sql, args) = (query.to_string(), args.to_vec());
        let result = self
            .call_context(ctx, move |conn| query_row_sync(conn, &sql, &args))
            .await;
        SqliteRow { result }
    }
}

/// Buffered cursor over a SQLite result.
#[derive(Debug)]
pub struct SqliteRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    closed: bool,
}

#[async_trait]
impl StandardRows for SqliteRows {
    async fn next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.current = self.pending.pop_front();
        self.current.is_some()
    }

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        if self.closed {
            return Err(SqlRunError::RowsClosed);
        }
        let row = self.current.as_ref().ok_or(SqlRunError::NoCurrentRow)?;
        scan_values(row, dest)
    }

    fn columns(&self) -> Result<Vec<String>> {
        if self.closed {
            return Err(SqlRunError::RowsClosed);
        }
        Ok(self.columns.clone())
    }

    fn err(&self) -> Option<&SqlRunError> {
        // rows are fully read before the cursor exists
        None
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        self.pending.clear();
        Ok(())
    }
}

/// Single-row result of a SQLite query.
pub struct SqliteRow {
    result: Result<Option<Vec<SqlValue>>>,
}

impl RowScanner for SqliteRow {
    fn scan(self: Box<Self>, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match self.result {
            Ok(Some(values)) => scan_values(&values, dest),
            Ok(None) => Err(SqlRunError::NoRows),
            Err(err) => Err(err),
        }
    }
}

/// Outcome of a SQLite statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteResult {
    rows_affected: u64,
    last_insert_id: i64,
}

impl ExecOutcome for SqliteResult {
    fn rows_affected(&self) -> Result<u64> {
        Ok(self.rows_affected)
    }

    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_insert_id)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Int32(i) => ToSqlOutput::Owned(Value::Integer(i64::from(*i))),
            SqlValue::Int64(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Float64(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Int64(i),
        ValueRef::Real(f) => SqlValue::Float64(f),
        ValueRef::Text(s) => SqlValue::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
    }
}

/// Strip an optional `sqlite://` or `sqlite:` prefix.
fn normalize_path(path: &str) -> &str {
    if path == ":memory:" {
        return path;
    }
    path.strip_prefix("sqlite://")
        .or_else(|| path.strip_prefix("sqlite:"))
        .unwrap_or(path)
}

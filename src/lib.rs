//! sqlrun - run built SQL statements against heterogeneous database clients
//!
//! A statement builder hands over `(query, args)` through [`ToStatement`];
//! the dispatch helpers run it through a [`Runner`], which is either a
//! standard-family client (native methods with and without a [`Context`],
//! real last-insert ids) or an alternate-family client (context-only methods,
//! affected-row counts only), each behind its own adapter.
//!
//! # Example
//! ```ignore
//! use sqlrun::{exec_with, query_with, wrap_alternate_client, Sql, TokioPostgresClient};
//!
//! let client = TokioPostgresClient::connect("postgres://localhost/mydb").await?;
//! let runner = wrap_alternate_client(client);
//!
//! let outcome = exec_with(&*runner, &Sql::new("UPDATE t SET x = 1")).await?;
//! println!("updated {}", outcome.rows_affected()?);
//!
//! let mut rows = query_with(&*runner, &Sql::new("SELECT id, name FROM t WHERE id = $1").bind(7)).await?;
//! while rows.advance().await {
//!     let (mut id, mut name) = (0i32, String::new());
//!     rows.scan(&mut [&mut id, &mut name])?;
//! }
//! rows.close();
//! ```

pub mod context;
pub mod dispatch;
pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

// Re-export main types for convenient access
pub use context::{CancelHandle, Context, BACKGROUND};
pub use dispatch::{
    exec_context_with, exec_with, query_context_with, query_row_context_with, query_row_with,
    query_with,
};
pub use drivers::{
    wrap_alternate_client, wrap_standard_client, InMemoryTestClient, SqliteClient,
    TokioPostgresClient,
};
pub use error::{Result, SqlRunError};
pub use traits::{
    ExecOutcome, Execer, ExecerContext, QueryRower, QueryRowerContext, Queryer, QueryerContext,
    RowScanner, Rows, Runner, ToStatement,
};
pub use types::{Row, ScanDest, Sql, SqlValue};

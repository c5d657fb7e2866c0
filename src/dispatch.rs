//! Run a [`ToStatement`] producer through a single capability.
//!
//! Every helper renders the statement exactly once. A build error is returned
//! (or, for the query-row helpers, carried by the returned [`Row`]) without
//! calling the capability at all.

use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::traits::{
    ExecOutcome, Execer, ExecerContext, QueryRower, QueryRowerContext, Queryer, QueryerContext,
    Rows, ToStatement,
};
use crate::types::Row;

/// Execs the SQL returned by `s` with `db`.
pub async fn exec_with<D, S>(db: &D, s: &S) -> Result<Box<dyn ExecOutcome>>
where
    D: Execer + ?Sized,
    S: ToStatement + ?Sized,
{
    let (query, args) = s.to_statement().inspect_err(log_build_error)?;
    db.exec(&query, &args).await
}

/// Queries the SQL returned by `s` with `db`.
pub async fn query_with<D, S>(db: &D, s: &S) -> Result<Box<dyn Rows>>
where
    D: Queryer + ?Sized,
    S: ToStatement + ?Sized,
{
    let (query, args) = s.to_statement().inspect_err(log_build_error)?;
    db.query(&query, &args).await
}

/// Runs the SQL returned by `s` as a single-row query with `db`.
pub async fn query_row_with<D, S>(db: &D, s: &S) -> Row
where
    D: QueryRower + ?Sized,
    S: ToStatement + ?Sized,
{
    match s.to_statement() {
        Ok((query, args)) => db.query_row(&query, &args).await,
        Err(err) => {
            log_build_error(&err);
            Row::failed(err)
        }
    }
}

/// Execs the SQL returned by `s` with `db`, honouring `ctx`.
pub async fn exec_context_with<D, S>(
    ctx: &Context,
    db: &D,
    s: &S,
) -> Result<Box<dyn ExecOutcome>>
where
    D: ExecerContext + ?Sized,
    S: ToStatement + ?Sized,
{
    let (query, args) = s.to_statement().inspect_err(log_build_error)?;
    db.exec_context(ctx, &query, &args).await
}

/// Queries the SQL returned by `s` with `db`, honouring `ctx`.
pub async fn query_context_with<D, S>(ctx: &Context, db: &D, s: &S) -> Result<Box<dyn Rows>>
where
    D: QueryerContext + ?Sized,
    S: ToStatement + ?Sized,
{
    let (query, args) = s.to_statement().inspect_err(log_build_error)?;
    db.query_context(ctx, &query, &args).await
}

/// Runs the SQL returned by `s` as a single-row query with `db`, honouring `ctx`.
pub async fn query_row_context_with<D, S>(ctx: &Context, db: &D, s: &S) -> Row
where
    D: QueryRowerContext + ?Sized,
    S: ToStatement + ?Sized,
{
    match s.to_statement() {
        Ok((query, args)) => db.query_row_context(ctx, &query, &args).await,
        Err(err) => {
            log_build_error(&err);
            Row::failed(err)
        }
    }
}

fn log_build_error(err: &crate::error::SqlRunError) {
    debug!(error = %err, "statement failed to build, skipping dispatch");
}

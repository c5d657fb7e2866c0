use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;
use crate::traits::{ExecOutcome, Rows};
use crate::types::{Row, SqlValue};

/// Executes a statement that returns no rows.
#[async_trait]
pub trait Execer: Send + Sync {
    async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn ExecOutcome>>;
}

/// Cancellable form of [`Execer`].
#[async_trait]
pub trait ExecerContext: Send + Sync {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn ExecOutcome>>;
}

/// Runs a query that returns any number of rows.
#[async_trait]
pub trait Queryer: Send + Sync {
    async fn query(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn Rows>>;
}

/// Cancellable form of [`Queryer`].
#[async_trait]
pub trait QueryerContext: Send + Sync {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn Rows>>;
}

/// Runs a query expected to return a single row.
///
/// Never fails directly: errors are carried by the returned [`Row`] and
/// reported when it is scanned.
#[async_trait]
pub trait QueryRower: Send + Sync {
    async fn query_row(&self, query: &str, args: &[SqlValue]) -> Row;
}

/// Cancellable form of [`QueryRower`].
#[async_trait]
pub trait QueryRowerContext: Send + Sync {
    async fn query_row_context(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Row;
}

/// All six capabilities together.
///
/// Implemented automatically for anything providing each of them. Code that
/// only needs one capability should depend on that trait alone.
pub trait Runner:
    Execer + ExecerContext + Queryer + QueryerContext + QueryRower + QueryRowerContext
{
}

impl<T> Runner for T where
    T: Execer + ExecerContext + Queryer + QueryerContext + QueryRower + QueryRowerContext + ?Sized
{
}

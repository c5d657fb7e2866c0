//! Adapter for the standard client family.
//!
//! Standard clients provide every capability natively, both with and without
//! a [`Context`], and have a result type that knows the last insert id. The
//! adapter is a straight pass-through; only the cursor gets a thin wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::error::{Result, SqlRunError};
use crate::traits::{
    ExecOutcome, Execer, ExecerContext, QueryRower, QueryRowerContext, Queryer, QueryerContext,
    RowScanner, Rows, Runner,
};
use crate::types::{Row, ScanDest, SqlValue};

/// Native surface of a standard-family client.
#[async_trait]
pub trait StandardClient: Send + Sync {
    type Rows: StandardRows + 'static;
    type Row: RowScanner + 'static;
    type Outcome: ExecOutcome + 'static;

    async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<Self::Outcome>;

    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Self::Outcome>;

    async fn query(&self, query: &str, args: &[SqlValue]) -> Result<Self::Rows>;

    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Self::Rows>;

    async fn query_row(&self, query: &str, args: &[SqlValue]) -> Self::Row;

    async fn query_row_context(&self, ctx: &Context, query: &str, args: &[SqlValue])
        -> Self::Row;
}

/// Native cursor of a standard-family client.
#[async_trait]
pub trait StandardRows: Send {
    async fn next(&mut self) -> bool;

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()>;

    fn columns(&self) -> Result<Vec<String>>;

    fn err(&self) -> Option<&SqlRunError>;

    fn close(&mut self) -> Result<()>;
}

/// Wrap a standard-family client so it can be used as a [`Runner`].
pub fn wrap_standard_client<C: StandardClient + 'static>(client: C) -> Arc<dyn Runner> {
    Arc::new(StandardRunner::new(client))
}

/// [`Runner`] over a [`StandardClient`].
pub struct StandardRunner<C> {
    client: C,
}

impl<C: StandardClient> StandardRunner<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: StandardClient> Execer for StandardRunner<C> {
    async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn ExecOutcome>> {
        let result = self.client.exec(query, args).await?;
        Ok(Box::new(result))
    }
}

#[async_trait]
impl<C: StandardClient> ExecerContext for StandardRunner<C> {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn ExecOutcome>> {
        let result = self.client.exec_context(ctx, query, args).await?;
        Ok(Box::new(result))
    }
}

#[async_trait]
impl<C: StandardClient> Queryer for StandardRunner<C> {
    async fn query(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn Rows>> {
        let rows = self.client.query(query, args).await?;
        Ok(Box::new(StandardRowsWrapper::new(rows)))
    }
}

#[async_trait]
impl<C: StandardClient> QueryerContext for StandardRunner<C> {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn Rows>> {
        let rows = self.client.query_context(ctx, query, args).await?;
        Ok(Box::new(StandardRowsWrapper::new(rows)))
    }
}

#[async_trait]
impl<C: StandardClient> QueryRower for StandardRunner<C> {
    async fn query_row(&self, query: &str, args: &[SqlValue]) -> Row {
        Row::new(self.client.query_row(query, args).await)
    }
}

#[async_trait]
impl<C: StandardClient> QueryRowerContext for StandardRunner<C> {
    async fn query_row_context(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Row {
        Row::new(self.client.query_row_context(ctx, query, args).await)
    }
}

/// [`Rows`] over a standard-family native cursor.
///
/// `close` drops the native close error instead of reporting it; a client
/// that records the failure still exposes it through [`Rows::err`]. Kept for
/// compatibility with callers written against the standard family.
pub struct StandardRowsWrapper<R> {
    rows: R,
}

impl<R: StandardRows> StandardRowsWrapper<R> {
    pub fn new(rows: R) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl<R: StandardRows> Rows for StandardRowsWrapper<R> {
    async fn advance(&mut self) -> bool {
        self.rows.next().await
    }

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        self.rows.scan(dest)
    }

    fn columns(&self) -> Result<Vec<String>> {
        self.rows.columns()
    }

    fn err(&self) -> Option<&SqlRunError> {
        self.rows.err()
    }

    fn close(&mut self) {
        if let Err(err) = self.rows.close() {
            debug!(error = %err, "ignoring error while closing rows");
        }
    }
}

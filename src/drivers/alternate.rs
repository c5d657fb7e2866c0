//! Adapter for the alternate client family.
//!
//! Alternate clients only have context-taking methods, report a command tag
//! with an affected-row count instead of a full result, and describe result
//! columns through a list of field descriptions. The adapter fills the gaps:
//! the plain capabilities run on [`Context::background`], and asking for the
//! last insert id is reported as unsupported.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{Result, SqlRunError};
use crate::traits::{
    ExecOutcome, Execer, ExecerContext, QueryRower, QueryRowerContext, Queryer, QueryerContext,
    RowScanner, Rows, Runner,
};
use crate::types::{Row, ScanDest, SqlValue};

/// Native surface of an alternate-family client.
#[async_trait]
pub trait AlternateClient: Send + Sync {
    type Rows: AlternateRows + 'static;
    type Row: RowScanner + 'static;
    type CommandTag: CommandTag + 'static;

    /// Name used when reporting unsupported capabilities.
    const NAME: &'static str;

    async fn exec(&self, ctx: &Context, query: &str, args: &[SqlValue])
        -> Result<Self::CommandTag>;

    async fn query(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Result<Self::Rows>;

    async fn query_row(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Self::Row;
}

/// Completion tag of an alternate-family exec.
pub trait CommandTag: Send + Sync + Debug {
    fn rows_affected(&self) -> u64;
}

/// Description of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: String,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Native cursor of an alternate-family client.
#[async_trait]
pub trait AlternateRows: Send {
    async fn next(&mut self) -> bool;

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()>;

    /// Column descriptions, or `None` when the client has none for this result.
    fn field_descriptions(&self) -> Option<&[FieldDescription]>;

    fn err(&self) -> Option<&SqlRunError>;

    fn close(&mut self);
}

/// Wrap an alternate-family client so it can be used as a [`Runner`].
pub fn wrap_alternate_client<C: AlternateClient + 'static>(client: C) -> Arc<dyn Runner> {
    Arc::new(AlternateRunner::new(client))
}

/// [`Runner`] over an [`AlternateClient`].
pub struct AlternateRunner<C> {
    client: C,
}

impl<C: AlternateClient> AlternateRunner<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: AlternateClient> ExecerContext for AlternateRunner<C> {
    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn ExecOutcome>> {
        let tag = self.client.exec(ctx, query, args).await?;
        Ok(Box::new(CommandTagOutcome {
            tag,
            driver: C::NAME,
        }))
    }
}

#[async_trait]
impl<C: AlternateClient> Execer for AlternateRunner<C> {
    async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn ExecOutcome>> {
        self.exec_context(Context::background(), query, args).await
    }
}

#[async_trait]
impl<C: AlternateClient> QueryerContext for AlternateRunner<C> {
    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<Box<dyn Rows>> {
        let rows = self.client.query(ctx, query, args).await?;
        Ok(Box::new(AlternateRowsWrapper::new(rows)))
    }
}

#[async_trait]
impl<C: AlternateClient> Queryer for AlternateRunner<C> {
    async fn query(&self, query: &str, args: &[SqlValue]) -> Result<Box<dyn Rows>> {
        self.query_context(Context::background(), query, args).await
    }
}

#[async_trait]
impl<C: AlternateClient> QueryRowerContext for AlternateRunner<C> {
    async fn query_row_context(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Row {
        Row::new(self.client.query_row(ctx, query, args).await)
    }
}

#[async_trait]
impl<C: AlternateClient> QueryRower for AlternateRunner<C> {
    async fn query_row(&self, query: &str, args: &[SqlValue]) -> Row {
        self.query_row_context(Context::background(), query, args)
            .await
    }
}

/// [`ExecOutcome`] over an alternate-family command tag.
#[derive(Debug)]
pub struct CommandTagOutcome<T> {
    tag: T,
    driver: &'static str,
}

impl<T: CommandTag> ExecOutcome for CommandTagOutcome<T> {
    fn rows_affected(&self) -> Result<u64> {
        Ok(self.tag.rows_affected())
    }

    fn last_insert_id(&self) -> Result<i64> {
        Err(SqlRunError::Unsupported {
            operation: "last_insert_id",
            driver: self.driver,
        })
    }
}

/// [`Rows`] over an alternate-family native cursor.
pub struct AlternateRowsWrapper<R> {
    rows: R,
}

impl<R: AlternateRows> AlternateRowsWrapper<R> {
    pub fn new(rows: R) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl<R: AlternateRows> Rows for AlternateRowsWrapper<R> {
    async fn advance(&mut self) -> bool {
        self.rows.next().await
    }

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        self.rows.scan(dest)
    }

    fn columns(&self) -> Result<Vec<String>> {
        let fields = self
            .rows
            .field_descriptions()
            .ok_or(SqlRunError::NoFieldDescriptions)?;
        Ok(fields.iter().map(|f| f.name.clone()).collect())
    }

    fn err(&self) -> Option<&SqlRunError> {
        self.rows.err()
    }

    fn close(&mut self) {
        self.rows.close();
    }
}

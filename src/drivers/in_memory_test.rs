use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::context::Context;
use crate::drivers::alternate::{AlternateClient, AlternateRows, CommandTag, FieldDescription};
use crate::drivers::standard::{StandardClient, StandardRows};
use crate::error::{Result, SqlRunError};
use crate::traits::{ExecOutcome, RowScanner};
use crate::types::{scan_values, ScanDest, SqlValue};

/// A recorded native call for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// Whether the call went through a context-taking native method.
    pub with_context: bool,
}

/// Canned reply for one native call.
#[derive(Debug, Clone)]
pub struct InMemoryTestResponse {
    columns: Option<Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    rows_affected: u64,
    last_insert_id: Option<i64>,
    error: Option<String>,
    close_error: Option<String>,
}

impl InMemoryTestResponse {
    pub fn empty() -> Self {
        Self {
            columns: Some(Vec::new()),
            rows: Vec::new(),
            rows_affected: 0,
            last_insert_id: None,
            error: None,
            close_error: None,
        }
    }
}

impl Default for InMemoryTestResponse {
    fn default() -> Self {
        Self::empty()
    }
}

/// An in-memory client for testing, usable as either client family.
///
/// Allows configuring expected responses and verifying executed queries.
///
/// # Example
/// ```
/// use sqlrun::drivers::{wrap_alternate_client, InMemoryTestClient, InMemoryTestResponseBuilder};
///
/// let client = InMemoryTestClient::new().with_response(
///     InMemoryTestResponseBuilder::new()
///         .columns(&["id", "name"])
///         .row(vec![1.into(), "Alice".into()])
///         .build(),
/// );
/// let runner = wrap_alternate_client(client);
/// ```
pub struct InMemoryTestClient {
    responses: Mutex<VecDeque<InMemoryTestResponse>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    default_response: InMemoryTestResponse,
    latency: Option<Duration>,
}

impl InMemoryTestClient {
    /// Create a new in-memory test client with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            recorded_queries: Mutex::new(Vec::new()),
            default_response: InMemoryTestResponse::empty(),
            latency: None,
        }
    }

    /// Add a response to be returned by the next call.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: InMemoryTestResponse) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Add multiple responses to be returned by subsequent calls.
    pub fn with_responses(self, responses: impl IntoIterator<Item = InMemoryTestResponse>) -> Self {
        self.responses.lock().extend(responses);
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: InMemoryTestResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Make every call take `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get all recorded calls.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.recorded_queries.lock().clone()
    }

    /// Get the last recorded call, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.recorded_queries.lock().last().cloned()
    }

    pub fn clear_recorded_queries(&self) {
        self.recorded_queries.lock().clear();
    }

    /// Assert that the last call matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n calls reached the client.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.recorded_queries.lock().len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    async fn respond(
        &self,
        ctx: Option<&Context>,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<InMemoryTestResponse> {
        self.recorded_queries.lock().push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
            with_context: ctx.is_some(),
        });

        let response = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        let call = async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(message) = response.error.clone() {
                return Err(SqlRunError::driver(message));
            }
            Ok(response)
        };

        match ctx {
            Some(ctx) => ctx.run(call).await,
            None => call.await,
        }
    }

    async fn first_row(
        &self,
        ctx: Option<&Context>,
        sql: &str,
        params: &[SqlValue],
    ) -> InMemoryRow {
        let result = self
            .respond(ctx, sql, params)
            .await
            .map(|response| response.rows.into_iter().next());
        InMemoryRow { result }
    }
}

impl Default for InMemoryTestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StandardClient for InMemoryTestClient {
    type Rows = InMemoryRows;
    type Row = InMemoryRow;
    type Outcome = InMemoryResult;

    async fn exec(&self, query: &str, args: &[SqlValue]) -> Result<InMemoryResult> {
        self.respond(None, query, args).await.map(InMemoryResult::from)
    }

    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<InMemoryResult> {
        self.respond(Some(ctx), query, args)
            .await
            .map(InMemoryResult::from)
    }

    async fn query(&self, query: &str, args: &[SqlValue]) -> Result<InMemoryRows> {
        self.respond(None, query, args).await.map(InMemoryRows::from)
    }

    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<InMemoryRows> {
        self.respond(Some(ctx), query, args)
            .await
            .map(InMemoryRows::from)
    }

    async fn query_row(&self, query: &str, args: &[SqlValue]) -> InMemoryRow {
        self.first_row(None, query, args).await
    }

    async fn query_row_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> InMemoryRow {
        self.first_row(Some(ctx), query, args).await
    }
}

#[async_trait]
impl AlternateClient for InMemoryTestClient {
    type Rows = InMemoryRows;
    type Row = InMemoryRow;
    type CommandTag = InMemoryCommandTag;

    const NAME: &'static str = "in-memory test client";

    async fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<InMemoryCommandTag> {
        self.respond(Some(ctx), query, args)
            .await
            .map(|response| InMemoryCommandTag {
                rows_affected: response.rows_affected,
            })
    }

    async fn query(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Result<InMemoryRows> {
        self.respond(Some(ctx), query, args)
            .await
            .map(InMemoryRows::from)
    }

    async fn query_row(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> InMemoryRow {
        self.first_row(Some(ctx), query, args).await
    }
}

/// Native cursor of [`InMemoryTestClient`].
#[derive(Debug)]
pub struct InMemoryRows {
    columns: Option<Vec<String>>,
    fields: Option<Vec<FieldDescription>>,
    pending: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    close_error: Option<String>,
    err: Option<SqlRunError>,
    closed: bool,
}

impl From<InMemoryTestResponse> for InMemoryRows {
    fn from(response: InMemoryTestResponse) -> Self {
        let fields = response.columns.as_ref().map(|columns| {
            columns
                .iter()
                .map(|name| FieldDescription::new(name.clone()))
                .collect()
        });
        Self {
            columns: response.columns,
            fields,
            pending: response.rows.into(),
            current: None,
            close_error: response.close_error,
            err: None,
            closed: false,
        }
    }
}

impl InMemoryRows {
    fn advance_row(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.current = self.pending.pop_front();
        self.current.is_some()
    }

    fn scan_row(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        if self.closed {
            return Err(SqlRunError::RowsClosed);
        }
        let row = self.current.as_ref().ok_or(SqlRunError::NoCurrentRow)?;
        scan_values(row, dest)
    }

    fn close_rows(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        self.pending.clear();
        match self.close_error.take() {
            Some(message) => {
                self.err = Some(SqlRunError::driver(message.clone()));
                Err(SqlRunError::driver(message))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StandardRows for InMemoryRows {
    async fn next(&mut self) -> bool {
        self.advance_row()
    }

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        self.scan_row(dest)
    }

    fn columns(&self) -> Result<Vec<String>> {
        Ok(self.columns.clone().unwrap_or_default())
    }

    fn err(&self) -> Option<&SqlRunError> {
        self.err.as_ref()
    }

    fn close(&mut self) -> Result<()> {
        self.close_rows()
    }
}

#[async_trait]
impl AlternateRows for InMemoryRows {
    async fn next(&mut self) -> bool {
        self.advance_row()
    }

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        self.scan_row(dest)
    }

    fn field_descriptions(&self) -> Option<&[FieldDescription]> {
        self.fields.as_deref()
    }

    fn err(&self) -> Option<&SqlRunError> {
        self.err.as_ref()
    }

    fn close(&mut self) {
        // the alternate family has no close error; it stays visible via err()
        let _ = self.close_rows();
    }
}

/// Native single-row scanner of [`InMemoryTestClient`].
pub struct InMemoryRow {
    result: Result<Option<Vec<SqlValue>>>,
}

impl RowScanner for InMemoryRow {
    fn scan(self: Box<Self>, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match self.result {
            Ok(Some(values)) => scan_values(&values, dest),
            Ok(None) => Err(SqlRunError::NoRows),
            Err(err) => Err(err),
        }
    }
}

/// Native exec result of [`InMemoryTestClient`] as a standard client.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryResult {
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

impl From<InMemoryTestResponse> for InMemoryResult {
    fn from(response: InMemoryTestResponse) -> Self {
        Self {
            rows_affected: response.rows_affected,
            last_insert_id: response.last_insert_id,
        }
    }
}

impl ExecOutcome for InMemoryResult {
    fn rows_affected(&self) -> Result<u64> {
        Ok(self.rows_affected)
    }

    fn last_insert_id(&self) -> Result<i64> {
        self.last_insert_id
            .ok_or_else(|| SqlRunError::driver("no last insert id was configured"))
    }
}

/// Native command tag of [`InMemoryTestClient`] as an alternate client.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryCommandTag {
    rows_affected: u64,
}

impl CommandTag for InMemoryCommandTag {
    fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    response: InMemoryTestResponse,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            response: InMemoryTestResponse::empty(),
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.response.columns = Some(cols.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Report no field descriptions at all for the result.
    pub fn without_field_descriptions(mut self) -> Self {
        self.response.columns = None;
        self
    }

    /// Add a row of values, in column order.
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.response.rows.push(values);
        self
    }

    pub fn rows_affected(mut self, n: u64) -> Self {
        self.response.rows_affected = n;
        self
    }

    pub fn last_insert_id(mut self, id: i64) -> Self {
        self.response.last_insert_id = Some(id);
        self
    }

    /// Fail the call with a client error carrying `message`.
    pub fn fail(mut self, message: &str) -> Self {
        self.response.error = Some(message.to_string());
        self
    }

    /// Fail the cursor's close with a client error carrying `message`.
    pub fn close_error(mut self, message: &str) -> Self {
        self.response.close_error = Some(message.to_string());
        self
    }

    /// Build the InMemoryTestResponse.
    pub fn build(self) -> InMemoryTestResponse {
        self.response
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

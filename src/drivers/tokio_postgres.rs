use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type, WrongType};
use tokio_postgres::{Client, NoTls, Row as PgRow, RowStream};
use tracing::{error, warn};

use crate::context::Context;
use crate::drivers::alternate::{AlternateClient, AlternateRows, CommandTag, FieldDescription};
use crate::error::{Result, SqlRunError};
use crate::traits::RowScanner;
use crate::types::{scan_values, ScanDest, SqlValue};

/// Alternate-family client backed by tokio-postgres.
///
/// Every native call takes a [`Context`]; when the context finishes first the
/// local call is dropped and a cancel request is sent to the server.
///
/// PostgreSQL cancels whatever the session is executing when the request
/// arrives. Calls from concurrent callers share one session, so a cancelled
/// call can take down a neighbour's statement; give callers that cancel their
/// own client.
pub struct TokioPostgresClient {
    client: Client,
}

impl TokioPostgresClient {
    /// Connect to a PostgreSQL database.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self { client })
    }

    /// Use an already connected client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn cancellable<T, F>(&self, ctx: &Context, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let token = self.client.cancel_token();
        ctx.run_or_abort(call, move || {
            tokio::spawn(async move {
                if let Err(e) = token.cancel_query(NoTls).await {
                    warn!(error = %e, "failed to cancel PostgreSQL query");
                }
            });
        })
        .await
    }

    async fn open_rows(&self, query: &str, args: &[SqlValue]) -> Result<PostgresRows> {
        let statement = self.client.prepare(query).await?;
        let fields = statement
            .columns()
            .iter()
            .map(|c| FieldDescription::new(c.name()))
            .collect();

        let params = param_refs(args);
        let stream = self
            .client
            .query_raw(&statement, params.iter().copied())
            .await?;

        Ok(PostgresRows {
            fields: Some(fields),
            stream: Some(Box::pin(stream)),
            current: None,
            err: None,
            closed: false,
        })
    }
}

#[async_trait]
impl AlternateClient for TokioPostgresClient {
    type Rows = PostgresRows;
    type Row = PostgresRow;
    type CommandTag = PostgresCommandTag;

    const NAME: &'static str = "tokio-postgres";

    async fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[SqlValue],
    ) -> Result<PostgresCommandTag> {
        let params = param_refs(args);
        let rows_affected = self
            .cancellable(ctx, async {
                Ok(self.client.execute(query, &params).await?)
            })
            .await?;
        Ok(PostgresCommandTag { rows_affected })
    }

    async fn query(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> Result<PostgresRows> {
        self.cancellable(ctx, self.open_rows(query, args)).await
    }

    async fn query_row(&self, ctx: &Context, query: &str, args: &[SqlValue]) -> PostgresRow {
        let result = self
            .cancellable(ctx, async {
                let mut rows = self.open_rows(query, args).await?;
                if rows.next().await {
                    return Ok(rows.current.take());
                }
                match rows.err.take() {
                    Some(err) => Err(err),
                    None => Ok(None),
                }
            })
            .await;
        PostgresRow { result }
    }
}

/// Streaming cursor over a PostgreSQL result.
pub struct PostgresRows {
    fields: Option<Vec<FieldDescription>>,
    stream: Option<Pin<Box<RowStream>>>,
    current: Option<PgRow>,
    err: Option<SqlRunError>,
    closed: bool,
}

#[async_trait]
impl AlternateRows for PostgresRows {
    async fn next(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.next().await {
            Some(Ok(row)) => {
                self.current = Some(row);
                true
            }
            Some(Err(e)) => {
                self.err = Some(e.into());
                self.current = None;
                self.stream = None;
                false
            }
            None => {
                self.current = None;
                self.stream = None;
                false
            }
        }
    }

    fn scan(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        if self.closed {
            return Err(SqlRunError::RowsClosed);
        }
        let row = self.current.as_ref().ok_or(SqlRunError::NoCurrentRow)?;
        scan_values(&row_values(row)?, dest)
    }

    fn field_descriptions(&self) -> Option<&[FieldDescription]> {
        self.fields.as_deref()
    }

    fn err(&self) -> Option<&SqlRunError> {
        self.err.as_ref()
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.stream = None;
    }
}

/// Single-row result of a PostgreSQL query.
pub struct PostgresRow {
    result: Result<Option<PgRow>>,
}

impl RowScanner for PostgresRow {
    fn scan(self: Box<Self>, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match self.result {
            Ok(Some(row)) => scan_values(&row_values(&row)?, dest),
            Ok(None) => Err(SqlRunError::NoRows),
            Err(err) => Err(err),
        }
    }
}

/// Affected-row count reported by a PostgreSQL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostgresCommandTag {
    rows_affected: u64,
}

impl CommandTag for PostgresCommandTag {
    fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

fn param_refs(args: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn row_values(row: &PgRow) -> Result<Vec<SqlValue>> {
    (0..row.len()).map(|i| column_value(row, i)).collect()
}

/// Convert a row value at a given index to a SqlValue.
/// Types without a dedicated mapping are read as text.
fn column_value(row: &PgRow, index: usize) -> Result<SqlValue> {
    let value = match *row.columns()[index].type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(SqlValue::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| SqlValue::Int32(i32::from(v))),
        Type::INT4 => row.try_get::<_, Option<i32>>(index)?.map(SqlValue::Int32),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(SqlValue::Int64),
        Type::OID => row
            .try_get::<_, Option<u32>>(index)?
            .map(|v| SqlValue::Int64(i64::from(v))),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|v| SqlValue::Float64(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(SqlValue::Float64),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(SqlValue::Bytes),
        _ => row.try_get::<_, Option<String>>(index)?.map(SqlValue::Text),
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

type BoxError = Box<dyn std::error::Error + Sync + Send>;

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) if <bool as ToSql>::accepts(ty) => b.to_sql(ty, out),
            SqlValue::Bool(_) => Err(wrong_type::<bool>(ty)),
            SqlValue::Int32(i) => int_to_sql(i64::from(*i), ty, out),
            SqlValue::Int64(i) => int_to_sql(*i, ty, out),
            SqlValue::Float64(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                _ => Err(wrong_type::<f64>(ty)),
            },
            SqlValue::Text(s) if <&str as ToSql>::accepts(ty) => s.as_str().to_sql(ty, out),
            SqlValue::Text(_) => Err(wrong_type::<String>(ty)),
            SqlValue::Bytes(b) if <&[u8] as ToSql>::accepts(ty) => b.as_slice().to_sql(ty, out),
            SqlValue::Bytes(_) => Err(wrong_type::<Vec<u8>>(ty)),
        }
    }

    // NULL binds to a parameter of any type, so the per-variant check
    // happens in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn wrong_type<T>(ty: &Type) -> BoxError {
    Box::new(WrongType::new::<T>(ty.clone()))
}

/// Encode an integer at the width of the target column.
fn int_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
        _ => Err(wrong_type::<i64>(ty)),
    }
}

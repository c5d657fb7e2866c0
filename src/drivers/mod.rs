pub mod alternate;
mod in_memory_test;
mod sqlite;
pub mod standard;
mod tokio_postgres;

pub use self::alternate::{
    wrap_alternate_client, AlternateClient, AlternateRows, AlternateRowsWrapper, AlternateRunner,
    CommandTag, CommandTagOutcome, FieldDescription,
};
pub use self::in_memory_test::{
    InMemoryCommandTag, InMemoryResult, InMemoryRow, InMemoryRows, InMemoryTestClient,
    InMemoryTestResponse, InMemoryTestResponseBuilder, RecordedQuery,
};
pub use self::sqlite::{SqliteClient, SqliteResult, SqliteRow, SqliteRows};
pub use self::standard::{
    wrap_standard_client, StandardClient, StandardRows, StandardRowsWrapper, StandardRunner,
};
pub use self::tokio_postgres::{
    PostgresCommandTag, PostgresRow, PostgresRows, TokioPostgresClient,
};

mod results;
mod runner;
mod statement;

pub use results::{ExecOutcome, RowScanner, Rows};
pub use runner::{
    Execer, ExecerContext, QueryRower, QueryRowerContext, Queryer, QueryerContext, Runner,
};
pub use statement::ToStatement;
